use tidemark_lexer::{LexerState, Token};

/// Sparse per-row tokens and end states. An absent entry is stale.
///
/// Both vectors index by row and may be shorter than the document; rows past
/// their end read as absent.
#[derive(Debug, Clone, Default)]
pub struct RowCache {
	tokens: Vec<Option<Vec<Token>>>,
	states: Vec<Option<LexerState>>,
}

impl RowCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn tokens(&self, row: usize) -> Option<&[Token]> {
		self.tokens.get(row)?.as_deref()
	}

	pub fn state(&self, row: usize) -> Option<&LexerState> {
		self.states.get(row)?.as_ref()
	}

	pub fn has_tokens(&self, row: usize) -> bool {
		self.tokens.get(row).is_some_and(Option::is_some)
	}

	pub fn set_tokens(&mut self, row: usize, tokens: Vec<Token>) {
		*slot(&mut self.tokens, row) = Some(tokens);
	}

	pub fn set_state(&mut self, row: usize, state: LexerState) {
		*slot(&mut self.states, row) = Some(state);
	}

	/// Marks the tokens of `row` stale, keeping its end state for diffing.
	pub fn invalidate_tokens(&mut self, row: usize) {
		if let Some(entry) = self.tokens.get_mut(row) {
			*entry = None;
		}
	}

	/// Drops everything at and after `row`.
	pub fn truncate_from(&mut self, row: usize) {
		self.tokens.truncate(row);
		self.states.truncate(row);
	}

	/// Collapses the `removed + 1` rows starting at `row` into one stale row.
	pub fn splice_removed(&mut self, row: usize, removed: usize) {
		splice(&mut self.tokens, row, removed + 1, 1);
		splice(&mut self.states, row, removed + 1, 1);
	}

	/// Replaces `row` with `inserted + 1` stale rows.
	pub fn splice_inserted(&mut self, row: usize, inserted: usize) {
		splice(&mut self.tokens, row, 1, inserted + 1);
		splice(&mut self.states, row, 1, inserted + 1);
	}

	pub fn clear(&mut self) {
		self.tokens.clear();
		self.states.clear();
	}

	/// Rows whose tokens are present, in order.
	pub fn cached_rows(&self) -> impl Iterator<Item = usize> + '_ {
		self.tokens.iter().enumerate().filter_map(|(row, t)| t.as_ref().map(|_| row))
	}
}

fn slot<T>(entries: &mut Vec<Option<T>>, row: usize) -> &mut Option<T> {
	if entries.len() <= row {
		entries.resize_with(row + 1, || None);
	}
	&mut entries[row]
}

/// Replaces `remove` entries at `row` with `insert` stale ones.
///
/// Entries past the end are already stale, so the splice is clipped to the
/// stored prefix.
fn splice<T>(entries: &mut Vec<Option<T>>, row: usize, remove: usize, insert: usize) {
	if row >= entries.len() {
		return;
	}
	let end = (row + remove).min(entries.len());
	entries.splice(row..end, std::iter::repeat_with(|| None).take(insert));
}
