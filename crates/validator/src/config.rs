//! Validator configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable enabling verbose mode.
pub const VERBOSE_ENV: &str = "INFRACHECK_VERBOSE";
/// Environment variable turning optional-field skips into failures.
pub const FAIL_ON_SKIPPED_ENV: &str = "INFRACHECK_FAIL_ON_SKIPPED";

/// Errors loading a [`ValidatorConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {name}: {value:?} (expected true/false)")]
    InvalidEnv { name: &'static str, value: String },
}

/// Settings shared by every validation a [`Validator`](crate::Validator) runs.
///
/// ```toml
/// verbose = true
/// fail_on_skipped = false
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Emit the full raw description to the test log.
    pub verbose: bool,
    /// Fail validations that skipped an absent optional field.
    pub fail_on_skipped: bool,
}

impl ValidatorConfig {
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub fn with_fail_on_skipped(mut self, fail_on_skipped: bool) -> Self {
        self.fail_on_skipped = fail_on_skipped;
        self
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Apply `INFRACHECK_*` environment overrides on top of `self`.
    pub fn from_env(self) -> Result<Self, ConfigError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides read through `lookup`; unset variables leave the
    /// current value alone.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(VERBOSE_ENV) {
            self.verbose = parse_bool(VERBOSE_ENV, &value)?;
        }
        if let Some(value) = lookup(FAIL_ON_SKIPPED_ENV) {
            self.fail_on_skipped = parse_bool(FAIL_ON_SKIPPED_ENV, &value)?;
        }
        Ok(self)
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            name,
            value: value.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_are_quiet_and_lenient() {
        let config = ValidatorConfig::default();
        assert!(!config.verbose);
        assert!(!config.fail_on_skipped);
    }

    #[test]
    fn parses_toml() {
        let config = ValidatorConfig::from_toml_str("verbose = true").unwrap();
        assert!(config.verbose);
        assert!(!config.fail_on_skipped);
        assert!(ValidatorConfig::from_toml_str("verbose = \"loud\"").is_err());
    }

    #[test]
    fn loads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "fail_on_skipped = true").unwrap();
        let config = ValidatorConfig::from_file(file.path()).unwrap();
        assert!(config.fail_on_skipped);
    }

    #[test]
    fn missing_file_names_path() {
        let err = ValidatorConfig::from_file("/nonexistent/infracheck.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/infracheck.toml"));
    }

    #[test]
    fn env_overrides_file_values() {
        let config = ValidatorConfig::default()
            .with_verbose(true)
            .with_overrides(env(&[(VERBOSE_ENV, "0"), (FAIL_ON_SKIPPED_ENV, "yes")]))
            .unwrap();
        assert!(!config.verbose);
        assert!(config.fail_on_skipped);
    }

    #[test]
    fn unset_env_keeps_values() {
        let config = ValidatorConfig::default()
            .with_fail_on_skipped(true)
            .with_overrides(env(&[]))
            .unwrap();
        assert!(config.fail_on_skipped);
    }

    #[test]
    fn rejects_garbage_env_value() {
        let err = ValidatorConfig::default()
            .with_overrides(env(&[(VERBOSE_ENV, "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name: VERBOSE_ENV, .. }));
    }
}
