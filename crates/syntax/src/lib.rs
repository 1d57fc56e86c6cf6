// Hosts embed the scheduler in terminal UIs; progress goes through tracing.
#![deny(clippy::print_stderr)]
#![cfg_attr(test, allow(unused_crate_dependencies))]

//! Incremental tokenization of a line-oriented document.
//!
//! [`BackgroundTokenizer`] owns a per-row cache of tokens and end states for
//! one [`Document`]. Rows are tokenized on demand by [`BackgroundTokenizer::tokens`]
//! and repaired in bounded chunks by a background pass that walks forward
//! from the watermark, the lowest row not known to be current. A row's
//! successor is only re-tokenized when the row's end state changed, so an
//! edit costs as many rows as its effect on lexer state reaches.
//!
//! The scheduler is a plain state machine driven by [`BackgroundTokenizer::poll`];
//! [`Driver`] runs it on a single-threaded tokio runtime.

mod cache;
mod clock;
mod config;
mod document;
mod driver;
mod policy;
mod scheduler;

pub use cache::RowCache;
pub use clock::{Clock, SystemClock, TokioClock};
pub use config::{ConfigError, EngineConfig};
pub use document::{Action, Delta, DeltaError, Document, LineBuffer, Position};
pub use driver::Driver;
pub use policy::SchedulerPolicy;
pub use scheduler::{BackgroundTokenizer, Listeners, Phase, PollOutcome, RowSpan, ScheduleKind};
