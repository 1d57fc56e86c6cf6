use serde::Deserialize;

/// Default ceiling on match attempts per line.
pub const DEFAULT_MAX_MATCH_ATTEMPTS: usize = 2000;

/// Default size of the chunks emitted past the ceiling.
pub const DEFAULT_OVERFLOW_CHUNK_LEN: usize = 500;

/// Tokenizer limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TokenizerConfig {
	/// Match attempts allowed on one line before the rest is emitted as overflow.
	pub max_match_attempts: usize,
	/// Byte length of each overflow chunk, rounded down to a char boundary.
	pub overflow_chunk_len: usize,
}

impl Default for TokenizerConfig {
	fn default() -> Self {
		Self {
			max_match_attempts: DEFAULT_MAX_MATCH_ATTEMPTS,
			overflow_chunk_len: DEFAULT_OVERFLOW_CHUNK_LEN,
		}
	}
}

impl TokenizerConfig {
	/// Returns a description of the first invalid field, if any.
	pub fn validate(&self) -> Result<(), &'static str> {
		if self.max_match_attempts == 0 {
			return Err("max_match_attempts must be at least 1");
		}
		if self.overflow_chunk_len == 0 {
			return Err("overflow_chunk_len must be at least 1");
		}
		Ok(())
	}
}
