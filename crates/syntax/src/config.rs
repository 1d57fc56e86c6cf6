//! Engine configuration file.
//!
//! ```toml
//! [tokenizer]
//! max_match_attempts = 2000
//! overflow_chunk_len = 500
//!
//! [scheduler]
//! debounce_ms = 700
//! resume_delay_ms = 20
//! chunk_rows = 5
//! chunk_budget_ms = 20
//! ```
//!
//! Every key is optional.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tidemark_lexer::TokenizerConfig;

use crate::policy::SchedulerPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("I/O error reading {path}: {error}")]
	Io { path: PathBuf, error: std::io::Error },

	#[error("invalid [{section}] setting: {reason}")]
	Invalid { section: &'static str, reason: &'static str },
}

/// Tokenizer limits and scheduler policy loaded together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
	pub tokenizer: TokenizerConfig,
	pub scheduler: SchedulerPolicy,
}

impl EngineConfig {
	/// Parses and validates a TOML configuration.
	pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(source)?;
		config.validate()?;
		Ok(config)
	}

	pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
		let source = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml(&source)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		self.tokenizer
			.validate()
			.map_err(|reason| ConfigError::Invalid { section: "tokenizer", reason })?;
		self.scheduler
			.validate()
			.map_err(|reason| ConfigError::Invalid { section: "scheduler", reason })
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn test_empty_config_is_default() {
		assert_eq!(EngineConfig::from_toml("").unwrap(), EngineConfig::default());
	}

	#[test]
	fn test_partial_tables_keep_defaults() {
		let config = EngineConfig::from_toml(
			r#"
			[tokenizer]
			max_match_attempts = 50

			[scheduler]
			debounce_ms = 0
			chunk_budget_ms = 5
			"#,
		)
		.unwrap();
		assert_eq!(config.tokenizer.max_match_attempts, 50);
		assert_eq!(config.tokenizer.overflow_chunk_len, 500);
		assert_eq!(config.scheduler.debounce, Duration::ZERO);
		assert_eq!(config.scheduler.chunk_budget, Duration::from_millis(5));
		assert_eq!(config.scheduler.resume_delay, Duration::from_millis(20));
		assert_eq!(config.scheduler.chunk_rows, 5);
	}

	#[test]
	fn test_zero_values_are_rejected() {
		assert!(matches!(
			EngineConfig::from_toml("[scheduler]\nchunk_rows = 0"),
			Err(ConfigError::Invalid { section: "scheduler", .. })
		));
		assert!(matches!(
			EngineConfig::from_toml("[tokenizer]\nmax_match_attempts = 0"),
			Err(ConfigError::Invalid { section: "tokenizer", .. })
		));
	}

	#[test]
	fn test_unknown_keys_are_rejected() {
		assert!(matches!(
			EngineConfig::from_toml("[scheduler]\ndebounce = 10"),
			Err(ConfigError::Toml(_))
		));
	}

	#[test]
	fn test_from_path_reports_missing_file() {
		let err = EngineConfig::from_path(Path::new("/nonexistent/tidemark.toml")).unwrap_err();
		assert!(matches!(err, ConfigError::Io { .. }));
	}
}
