//! Sea-ORM entities backing the Postgres repositories.

pub mod notification;
pub mod preference;
pub mod template;
