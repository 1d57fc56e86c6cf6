use std::time::Instant;

/// Time source for debounce deadlines and chunk budgets.
pub trait Clock {
	fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> Instant {
		Instant::now()
	}
}

/// Tokio's clock, which follows `tokio::time::pause` and auto-advance.
///
/// Use this with [`Driver`](crate::Driver) so deadlines and timers agree.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

impl Clock for TokioClock {
	fn now(&self) -> Instant {
		tokio::time::Instant::now().into_std()
	}
}
