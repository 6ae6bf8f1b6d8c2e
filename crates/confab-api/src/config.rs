//! # Runtime Configuration
//!
//! Configuration is assembled once in `main` from the process environment
//! and injected into the components that need it. Nothing in this crate
//! reads ambient global state after startup.

/// Process environment mode controlling exception detail exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvMode {
    /// Local development: opaque failure details are surfaced to clients.
    Development,
    /// Every other environment: opaque failure details are redacted.
    Production,
}

impl EnvMode {
    /// Parse from the `ENVIRONMENT` variable value. Only the exact value
    /// `"development"` selects development mode; anything else, including
    /// an unset variable, is production.
    pub fn from_environment(value: Option<&str>) -> Self {
        match value {
            Some("development") => Self::Development,
            _ => Self::Production,
        }
    }

    /// Whether opaque failure details may appear in HTTP responses.
    pub fn expose_details(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// TCP port the server binds to.
    pub port: u16,
    /// Environment mode (development vs everything else).
    pub env_mode: EnvMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            env_mode: EnvMode::Production,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_is_opt_in() {
        assert_eq!(
            EnvMode::from_environment(Some("development")),
            EnvMode::Development
        );
    }

    #[test]
    fn anything_else_is_production() {
        assert_eq!(EnvMode::from_environment(None), EnvMode::Production);
        assert_eq!(
            EnvMode::from_environment(Some("staging")),
            EnvMode::Production
        );
        assert_eq!(
            EnvMode::from_environment(Some("Development")),
            EnvMode::Production
        );
        assert_eq!(EnvMode::from_environment(Some("")), EnvMode::Production);
    }

    #[test]
    fn only_development_exposes_details() {
        assert!(EnvMode::Development.expose_details());
        assert!(!EnvMode::Production.expose_details());
    }
}
