use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Timing and chunking of background passes.
///
/// Deserialized from millisecond fields (`debounce_ms`, `resume_delay_ms`,
/// `chunk_budget_ms`) plus `chunk_rows`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerPolicy {
	/// Quiet period after `start`/`schedule_start` before a pass begins.
	#[serde(rename = "debounce_ms", deserialize_with = "millis")]
	pub debounce: Duration,
	/// Delay before continuing a pass that ran out of budget.
	#[serde(rename = "resume_delay_ms", deserialize_with = "millis")]
	pub resume_delay: Duration,
	/// The budget is only checked after every `chunk_rows` rows.
	pub chunk_rows: usize,
	/// Wall time a pass may use before yielding.
	#[serde(rename = "chunk_budget_ms", deserialize_with = "millis")]
	pub chunk_budget: Duration,
}

impl Default for SchedulerPolicy {
	fn default() -> Self {
		Self {
			debounce: Duration::from_millis(700),
			resume_delay: Duration::from_millis(20),
			chunk_rows: 5,
			chunk_budget: Duration::from_millis(20),
		}
	}
}

impl SchedulerPolicy {
	/// Policy with no debounce, for hosts and tests that drive passes explicitly.
	pub fn immediate() -> Self {
		Self {
			debounce: Duration::ZERO,
			resume_delay: Duration::ZERO,
			..Self::default()
		}
	}

	/// Returns a description of the first invalid field, if any.
	pub fn validate(&self) -> Result<(), &'static str> {
		if self.chunk_rows == 0 {
			return Err("chunk_rows must be at least 1");
		}
		Ok(())
	}
}

fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
	u64::deserialize(deserializer).map(Duration::from_millis)
}
