//! Shared configuration primitives.
//!
//! Every service loads its configuration from environment variables through
//! the [`FromEnv`] trait. Config structs live next to the code they configure
//! (e.g. provider configs in `domain_notifications::providers`); this crate
//! only provides the common building blocks plus tracing initialization.

pub mod database;
pub mod tracing;

use std::env;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },
}

/// Application environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Read `APP_ENV`; anything other than "production" means development.
    pub fn from_env() -> Self {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        if app_env.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Trait for configuration that can be loaded from environment variables
pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

/// Load an environment variable, falling back to a default.
pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Load a required environment variable or return an error.
pub fn env_required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Parse an environment variable into `T`, falling back to a default when
/// the variable is unset. A set-but-unparseable value is an error rather
/// than a silent fallback.
pub fn env_parse_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::ParseError {
            key: key.to_string(),
            details: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Read a boolean flag ("true"/"1" are truthy), defaulting when unset.
pub fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => raw == "true" || raw == "1",
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_defaults_to_development() {
        temp_env::with_var_unset("APP_ENV", || {
            let env = Environment::from_env();
            assert_eq!(env, Environment::Development);
            assert!(env.is_development());
            assert!(!env.is_production());
        });
    }

    #[test]
    fn test_environment_production() {
        temp_env::with_var("APP_ENV", Some("Production"), || {
            assert!(Environment::from_env().is_production());
        });
    }

    #[test]
    fn test_env_or_default() {
        temp_env::with_var_unset("SOME_UNSET_KEY", || {
            assert_eq!(env_or_default("SOME_UNSET_KEY", "fallback"), "fallback");
        });
    }

    #[test]
    fn test_env_required_missing() {
        temp_env::with_var_unset("SOME_REQUIRED_KEY", || {
            let err = env_required("SOME_REQUIRED_KEY").unwrap_err();
            assert!(err.to_string().contains("SOME_REQUIRED_KEY"));
            assert!(err.to_string().contains("required"));
        });
    }

    #[test]
    fn test_env_parse_or() {
        temp_env::with_var("SOME_NUMERIC_KEY", Some("42"), || {
            assert_eq!(env_parse_or("SOME_NUMERIC_KEY", 7u64).unwrap(), 42);
        });
        temp_env::with_var_unset("SOME_NUMERIC_KEY", || {
            assert_eq!(env_parse_or("SOME_NUMERIC_KEY", 7u64).unwrap(), 7);
        });
        temp_env::with_var("SOME_NUMERIC_KEY", Some("not-a-number"), || {
            assert!(env_parse_or("SOME_NUMERIC_KEY", 7u64).is_err());
        });
    }

    #[test]
    fn test_env_flag() {
        temp_env::with_var("SOME_FLAG", Some("1"), || {
            assert!(env_flag("SOME_FLAG", false));
        });
        temp_env::with_var("SOME_FLAG", Some("no"), || {
            assert!(!env_flag("SOME_FLAG", true));
        });
        temp_env::with_var_unset("SOME_FLAG", || {
            assert!(env_flag("SOME_FLAG", true));
        });
    }
}
