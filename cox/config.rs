use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read kernel configuration '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse kernel configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Knobs controlling how strictly inputs are checked and how much the kernel reports.
///
/// Every field has a default, so a configuration file only needs the keys it changes:
///
/// ```toml
/// validate_ties = false
/// log_summaries = true
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KernelConfig {
    /// Require every tie group in `rankmin`/`rankmax` to be contiguous and consistent.
    /// Bounds and the permutation are checked regardless.
    pub validate_ties: bool,
    /// Reject non-finite linear predictors and overflowing risk-set sums.
    pub reject_non_finite: bool,
    /// Forward an accumulation summary to the observer after each update.
    pub log_summaries: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            validate_ties: true,
            reject_non_finite: true,
            log_summaries: false,
        }
    }
}

impl KernelConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        log::debug!("Loaded kernel configuration from {}: {:?}", path.display(), config);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_yields_defaults() {
        let config = KernelConfig::from_toml_str("").unwrap();
        assert_eq!(config, KernelConfig::default());
    }

    #[test]
    fn partial_document_overrides_only_named_keys() {
        let config = KernelConfig::from_toml_str("log_summaries = true").unwrap();
        assert!(config.log_summaries);
        assert!(config.validate_ties);
        assert!(config.reject_non_finite);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = KernelConfig::from_toml_str("validate_everything = true").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "validate_ties = false").unwrap();
        writeln!(file, "reject_non_finite = false").unwrap();
        let config = KernelConfig::from_path(file.path()).unwrap();
        assert!(!config.validate_ties);
        assert!(!config.reject_non_finite);
        assert!(!config.log_summaries);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("kernel.toml");
        let err = KernelConfig::from_path(&missing).unwrap_err();
        assert!(err.to_string().contains("kernel.toml"));
    }
}
