use std::cell::RefCell;
use std::rc::Rc;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::clock::TokioClock;
use crate::document::Document;
use crate::scheduler::BackgroundTokenizer;

/// Runs a shared [`BackgroundTokenizer`] on the current single-threaded runtime.
///
/// The driver sleeps until the scheduler's next deadline and polls it. Hosts
/// mutate the scheduler through the same `Rc<RefCell<_>>` between awaits and
/// call [`wake`](Self::wake) after arming a pass so the new deadline is
/// picked up. Listeners are called after the scheduler is released, so they
/// may borrow it to read tokens.
pub struct Driver<D> {
	scheduler: Rc<RefCell<BackgroundTokenizer<D, TokioClock>>>,
	wake: Notify,
	cancel: CancellationToken,
}

impl<D: Document> Driver<D> {
	pub fn new(scheduler: Rc<RefCell<BackgroundTokenizer<D, TokioClock>>>) -> Self {
		Self {
			scheduler,
			wake: Notify::new(),
			cancel: CancellationToken::new(),
		}
	}

	pub fn scheduler(&self) -> &Rc<RefCell<BackgroundTokenizer<D, TokioClock>>> {
		&self.scheduler
	}

	/// Re-reads the scheduler's deadline. A wake before [`run`](Self::run) is kept.
	pub fn wake(&self) {
		self.wake.notify_one();
	}

	/// Token that ends [`run`](Self::run) when cancelled.
	pub fn cancellation_token(&self) -> CancellationToken {
		self.cancel.clone()
	}

	pub fn shutdown(&self) {
		self.cancel.cancel();
	}

	/// Drives the scheduler until shut down.
	pub async fn run(&self) {
		loop {
			let deadline = self.scheduler.borrow().next_deadline();
			match deadline {
				Some(due) => {
					tokio::select! {
						_ = self.cancel.cancelled() => break,
						_ = self.wake.notified() => continue,
						_ = tokio::time::sleep_until(due.into()) => {
							let (outcome, listeners) = {
								let mut scheduler = self.scheduler.borrow_mut();
								(scheduler.poll_deferred(), scheduler.listeners())
							};
							tracing::trace!(target: "tidemark::syntax", ?outcome, "driver poll");
							if let Some(span) = outcome.update {
								listeners.dispatch(span);
							}
						}
					}
				}
				None => {
					tokio::select! {
						_ = self.cancel.cancelled() => break,
						_ = self.wake.notified() => continue,
					}
				}
			}
		}
		tracing::debug!(target: "tidemark::syntax", "driver stopped");
	}
}
