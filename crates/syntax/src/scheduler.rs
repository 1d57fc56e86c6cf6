//! Incremental scheduler.
//!
//! Lifecycle: `Idle -> Scheduled -> Running -> Idle`. [`BackgroundTokenizer::start`]
//! and [`BackgroundTokenizer::schedule_start`] arm a debounce deadline, and
//! [`BackgroundTokenizer::poll`] runs one chunk of the background pass once
//! the deadline has passed. A chunk that exhausts its budget re-arms itself
//! with a short resume delay. Edits and [`BackgroundTokenizer::stop`] return
//! to `Idle` from any phase.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use tidemark_lexer::{LexerState, Token, Tokenizer};

use crate::cache::RowCache;
use crate::clock::{Clock, SystemClock};
use crate::document::{Action, Delta, Document};
use crate::policy::SchedulerPolicy;

/// Inclusive range of rows recomputed by one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSpan {
	pub first: usize,
	pub last: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleKind {
	/// Waiting out the quiet period after a start request.
	Debounce,
	/// Continuing a pass that yielded at a chunk boundary.
	Resume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
	#[default]
	Idle,
	Scheduled {
		due: Instant,
		kind: ScheduleKind,
	},
	Running,
}

/// Result of [`BackgroundTokenizer::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollOutcome {
	/// A chunk of the background pass ran.
	pub ran: bool,
	/// Rows the chunk recomputed, if any.
	pub update: Option<RowSpan>,
}

type Listener = Box<dyn FnMut(RowSpan)>;

#[derive(Default)]
struct ListenerSlots {
	active: Vec<Listener>,
	closed: bool,
}

/// Shared handle to a scheduler's update listeners.
///
/// Dispatching through the handle needs no access to the scheduler, so a
/// listener may read tokens back through a shared `Rc<RefCell<_>>` holding it.
#[derive(Clone, Default)]
pub struct Listeners(Rc<RefCell<ListenerSlots>>);

impl Listeners {
	fn push(&self, listener: Listener) {
		let mut slots = self.0.borrow_mut();
		if !slots.closed {
			slots.active.push(listener);
		}
	}

	fn close(&self) {
		let mut slots = self.0.borrow_mut();
		slots.closed = true;
		slots.active.clear();
	}

	/// Calls every listener with `span`.
	///
	/// Listeners subscribed during dispatch are first called on the next span.
	pub fn dispatch(&self, span: RowSpan) {
		let mut running = std::mem::take(&mut self.0.borrow_mut().active);
		for listener in &mut running {
			listener(span);
		}
		let mut slots = self.0.borrow_mut();
		if !slots.closed {
			running.append(&mut slots.active);
			slots.active = running;
		}
	}

	pub fn len(&self) -> usize {
		self.0.borrow().active.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl std::fmt::Debug for Listeners {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Listeners").field("len", &self.len()).finish()
	}
}

/// Per-document token cache with a cooperative background pass.
///
/// Rows below the watermark are known to be current. On-demand reads
/// tokenize single rows without waiting for the pass; the pass walks from
/// the watermark toward the end of the document, re-tokenizing a row's
/// successor only while end states keep changing.
pub struct BackgroundTokenizer<D, C = SystemClock> {
	tokenizer: Arc<Tokenizer>,
	doc: D,
	cache: RowCache,
	watermark: usize,
	phase: Phase,
	policy: SchedulerPolicy,
	clock: C,
	listeners: Listeners,
	terminated: bool,
}

impl<D: Document> BackgroundTokenizer<D> {
	pub fn new(tokenizer: Arc<Tokenizer>, doc: D, policy: SchedulerPolicy) -> Self {
		Self::with_clock(tokenizer, doc, policy, SystemClock)
	}
}

impl<D: Document, C: Clock> BackgroundTokenizer<D, C> {
	/// Creates an idle scheduler; nothing is tokenized until a read or [`start`](Self::start).
	pub fn with_clock(tokenizer: Arc<Tokenizer>, doc: D, policy: SchedulerPolicy, clock: C) -> Self {
		Self {
			tokenizer,
			doc,
			cache: RowCache::new(),
			watermark: 0,
			phase: Phase::Idle,
			policy,
			clock,
			listeners: Listeners::default(),
			terminated: false,
		}
	}

	pub fn document(&self) -> &D {
		&self.doc
	}

	/// Mutable access to the document. Report every edit through
	/// [`on_document_change`](Self::on_document_change).
	pub fn document_mut(&mut self) -> &mut D {
		&mut self.doc
	}

	pub fn tokenizer(&self) -> &Arc<Tokenizer> {
		&self.tokenizer
	}

	pub fn policy(&self) -> &SchedulerPolicy {
		&self.policy
	}

	/// Lowest row not confirmed current.
	pub fn watermark(&self) -> usize {
		self.watermark
	}

	pub fn phase(&self) -> Phase {
		self.phase
	}

	pub fn cache(&self) -> &RowCache {
		&self.cache
	}

	pub fn is_terminated(&self) -> bool {
		self.terminated
	}

	/// When the next chunk is due, if one is scheduled.
	pub fn next_deadline(&self) -> Option<Instant> {
		match self.phase {
			Phase::Scheduled { due, .. } => Some(due),
			Phase::Idle | Phase::Running => None,
		}
	}

	/// Registers a listener for recomputed row spans.
	///
	/// [`poll`](Self::poll) calls listeners while the scheduler is borrowed;
	/// hosts sharing the scheduler use [`poll_deferred`](Self::poll_deferred)
	/// and dispatch through [`listeners`](Self::listeners) after releasing it.
	pub fn subscribe(&mut self, listener: impl FnMut(RowSpan) + 'static) {
		if self.terminated {
			return;
		}
		self.listeners.push(Box::new(listener));
	}

	pub fn listeners(&self) -> Listeners {
		self.listeners.clone()
	}

	/// Tokens for `row`, tokenizing it synchronously when not cached.
	///
	/// Never advances the watermark: the background pass still re-validates
	/// the row and reports it. Returns an empty slice past the end of the document.
	pub fn tokens(&mut self, row: usize) -> &[Token] {
		if self.terminated || row >= self.doc.len() {
			return &[];
		}
		if !self.cache.has_tokens(row) {
			self.tokenize_row(row, false);
		}
		self.cache.tokens(row).unwrap_or_default()
	}

	/// End state of `row`, or the initial state when unknown.
	///
	/// Reading the row at the watermark tokenizes it first.
	pub fn state(&mut self, row: usize) -> LexerState {
		if self.terminated {
			return LexerState::default();
		}
		if row == self.watermark && row < self.doc.len() {
			self.tokenize_row(row, true);
		}
		self.cache.state(row).cloned().unwrap_or_default()
	}

	/// Swaps the grammar and restarts from row 0.
	pub fn set_tokenizer(&mut self, tokenizer: Arc<Tokenizer>) {
		if self.terminated {
			return;
		}
		self.tokenizer = tokenizer;
		self.reset();
	}

	/// Swaps the document, returning the old one, and restarts from row 0.
	pub fn set_document(&mut self, doc: D) -> D {
		let old = std::mem::replace(&mut self.doc, doc);
		if !self.terminated {
			self.reset();
		}
		old
	}

	/// Discards rows from `row` (or the watermark, if lower) and schedules a fresh pass.
	pub fn start(&mut self, row: usize) {
		if self.terminated {
			return;
		}
		self.watermark = row.min(self.watermark).min(self.doc.len());
		self.cache.truncate_from(self.watermark);
		self.stop();
		self.schedule(ScheduleKind::Debounce);
	}

	/// Schedules a pass unless one is already pending.
	pub fn schedule_start(&mut self) {
		if self.terminated || self.phase != Phase::Idle {
			return;
		}
		self.schedule(ScheduleKind::Debounce);
	}

	/// Adjusts the cache for an applied edit and cancels pending work.
	///
	/// The caller re-arms the pass with [`schedule_start`](Self::schedule_start)
	/// or [`start`](Self::start).
	pub fn on_document_change(&mut self, delta: &Delta) {
		if self.terminated {
			return;
		}
		let start = delta.start.row;
		if delta.end.row < start || start > self.doc.len() {
			tracing::debug!(target: "tidemark::syntax", ?delta, len = self.doc.len(), "ignoring edit outside the document");
			return;
		}
		let rows = delta.row_span();
		match (rows, delta.action) {
			(0, _) => self.cache.invalidate_tokens(start),
			(_, Action::Remove) => self.cache.splice_removed(start, rows),
			(_, Action::Insert) => self.cache.splice_inserted(start, rows),
		}
		self.watermark = start.min(self.watermark).min(self.doc.len());
		self.stop();
	}

	/// Cancels pending or running work; the cache is kept.
	pub fn stop(&mut self) {
		self.phase = Phase::Idle;
	}

	/// Stops all work, drops the cache and listeners. The instance stays inert afterwards.
	pub fn cleanup(&mut self) {
		self.stop();
		self.cache.clear();
		self.listeners.close();
		self.watermark = 0;
		self.terminated = true;
	}

	/// Runs one chunk of the background pass if it is due, then notifies listeners.
	pub fn poll(&mut self) -> PollOutcome {
		let outcome = self.poll_deferred();
		if let Some(span) = outcome.update {
			self.listeners.dispatch(span);
		}
		outcome
	}

	/// Like [`poll`](Self::poll), but leaves notifying listeners to the caller.
	pub fn poll_deferred(&mut self) -> PollOutcome {
		let Phase::Scheduled { due, .. } = self.phase else {
			return PollOutcome::default();
		};
		let now = self.clock.now();
		if now < due {
			return PollOutcome::default();
		}
		let update = self.run_chunk(now);
		PollOutcome { ran: true, update }
	}

	/// Runs scheduled chunks back to back, ignoring deadlines, until idle.
	pub fn run_until_idle(&mut self) -> Vec<RowSpan> {
		let mut spans = Vec::new();
		while matches!(self.phase, Phase::Scheduled { .. }) {
			let now = self.clock.now();
			if let Some(span) = self.run_chunk(now) {
				self.listeners.dispatch(span);
				spans.push(span);
			}
		}
		spans
	}

	fn schedule(&mut self, kind: ScheduleKind) {
		let delay = match kind {
			ScheduleKind::Debounce => self.policy.debounce,
			ScheduleKind::Resume => self.policy.resume_delay,
		};
		self.phase = Phase::Scheduled {
			due: self.clock.now() + delay,
			kind,
		};
	}

	fn reset(&mut self) {
		self.cache.clear();
		self.watermark = 0;
		self.start(0);
	}

	fn run_chunk(&mut self, started: Instant) -> Option<RowSpan> {
		self.phase = Phase::Running;
		let len = self.doc.len();
		// The watermark row itself is always recomputed; an on-demand read may have cached it.
		let mut row = self.watermark;

		let mut span: Option<RowSpan> = None;
		let mut processed = 0usize;
		while row < len {
			self.tokenize_row(row, true);
			span = Some(match span {
				Some(s) => RowSpan { first: s.first, last: row },
				None => RowSpan { first: row, last: row },
			});
			row += 1;
			while row < len && self.cache.has_tokens(row) {
				row += 1;
			}
			processed += 1;
			if processed % self.policy.chunk_rows.max(1) == 0 {
				let now = self.clock.now();
				if now.saturating_duration_since(started) > self.policy.chunk_budget {
					self.schedule(ScheduleKind::Resume);
					break;
				}
			}
		}
		self.watermark = row.min(len);
		if self.phase == Phase::Running {
			self.phase = Phase::Idle;
		}

		tracing::trace!(
			target: "tidemark::syntax",
			processed,
			watermark = self.watermark,
			resumed = matches!(self.phase, Phase::Scheduled { .. }),
			"background chunk"
		);
		span
	}

	/// Tokenizes `row` from the cached end state of the row above.
	///
	/// A changed end state always pulls the watermark back; only `advance`
	/// lets a confirmed row at the watermark move it forward.
	fn tokenize_row(&mut self, row: usize, advance: bool) {
		let start = row.checked_sub(1).and_then(|above| self.cache.state(above)).cloned().unwrap_or_default();
		let out = self.tokenizer.tokenize_line(&self.doc.line(row), &start);
		if self.cache.state(row) != Some(&out.state) {
			self.cache.set_state(row, out.state);
			self.cache.invalidate_tokens(row + 1);
			if self.watermark > row + 1 {
				self.watermark = row + 1;
			}
		} else if advance && self.watermark == row {
			self.watermark = row + 1;
		}
		self.cache.set_tokens(row, out.tokens);
	}
}

impl<D, C> std::fmt::Debug for BackgroundTokenizer<D, C> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BackgroundTokenizer")
			.field("watermark", &self.watermark)
			.field("phase", &self.phase)
			.field("policy", &self.policy)
			.field("listeners", &self.listeners.len())
			.field("terminated", &self.terminated)
			.finish_non_exhaustive()
	}
}
