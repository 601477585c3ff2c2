//! Centralized configuration for repo-demo.
//!
//! All environment variables are read and validated at startup so a typo
//! fails the run before anything is seeded.

use std::env;

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Configuration error for {field}: {message}")]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

/// Demo configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Log format (default: pretty)
    pub log_format: LogFormat,
    /// Number of links seeded before the command runs (default: 25)
    pub seed_count: usize,
    /// Page size for `list` (default: 10, at least 1)
    pub page_size: usize,
    /// Minimum width of generated slugs (default: 4)
    pub id_width: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_format =
            LogFormat::from_str(&get("LOG_FORMAT").unwrap_or_else(|| "pretty".into()));
        let seed_count = parse_number(&get, "DEMO_SEED_COUNT", 25)?;
        let page_size = parse_number(&get, "DEMO_PAGE_SIZE", 10)?;
        if page_size == 0 {
            return Err(ConfigError {
                field: "DEMO_PAGE_SIZE",
                message: "must be at least 1".into(),
            });
        }
        let id_width = parse_number(&get, "DEMO_ID_WIDTH", 4)?;

        Ok(Self {
            log_format,
            seed_count,
            page_size,
            id_width,
        })
    }
}

fn parse_number<F>(get: &F, field: &'static str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match get(field) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| ConfigError {
            field,
            message: format!("Invalid number '{}': {}", raw, e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn log_format_parsing() {
        assert_eq!(LogFormat::from_str("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_str("anything"), LogFormat::Pretty);
    }

    #[test]
    fn defaults_apply() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert_eq!(cfg.seed_count, 25);
        assert_eq!(cfg.page_size, 10);
        assert_eq!(cfg.id_width, 4);
    }

    #[test]
    fn overrides_apply() {
        let cfg = load(&[("DEMO_SEED_COUNT", " 3 "), ("LOG_FORMAT", "json")]).unwrap();
        assert_eq!(cfg.seed_count, 3);
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn rejects_bad_values() {
        let err = load(&[("DEMO_PAGE_SIZE", "0")]).unwrap_err();
        assert_eq!(err.field, "DEMO_PAGE_SIZE");
        let err = load(&[("DEMO_SEED_COUNT", "many")]).unwrap_err();
        assert_eq!(err.field, "DEMO_SEED_COUNT");
        assert!(err.to_string().contains("many"));
    }
}
