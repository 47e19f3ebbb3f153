use std::collections::HashMap;

use tracing::debug;

use super::state::State;
use super::tokenizer::{SENTENCE_START, Token};
use crate::error::{MarkovError, Result};

/// Context → continuations table derived from a token sequence.
///
/// The `ChainTable` stores one [`State`] per context key of length `order`
/// and remembers which keys open a sentence (start contexts).
///
/// # Responsibilities
/// - Slide a window of `order + 1` tokens over a sequence
/// - Record every continuation of every context, in order
/// - Expose the start contexts used as generation entry points
///
/// # Invariants
/// - `order` is always >= 1
/// - Every key has exactly `order` tokens and at least one continuation
/// - Keys and start contexts keep their first-seen order
/// - Every start context is a key whose first token is `SENTENCE_START`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainTable {
	/// Number of tokens in a context key.
	order: usize,

	/// States in first-seen order.
	states: Vec<State>,

	/// Position of each key in `states`.
	index: HashMap<Vec<Token>, usize>,

	/// Positions in `states` of the keys starting with `SENTENCE_START`.
	start_contexts: Vec<usize>,
}

impl ChainTable {
	/// Builds a table from a complete token sequence.
	///
	/// Sequences shorter than `order + 1` produce an empty table.
	///
	/// # Errors
	/// Returns `MarkovError::InvalidOrder` if `order < 1`.
	pub fn build(tokens: &[Token], order: usize) -> Result<Self> {
		if order < 1 {
			return Err(MarkovError::InvalidOrder(order));
		}

		let mut table = Self {
			order,
			states: Vec::new(),
			index: HashMap::new(),
			start_contexts: Vec::new(),
		};

		for window in tokens.windows(order + 1) {
			let (key, next) = window.split_at(order);
			table.add_transition(key, &next[0]);
		}

		debug!(
			order,
			tokens = tokens.len(),
			keys = table.states.len(),
			starts = table.start_contexts.len(),
			"chain table rebuilt"
		);
		Ok(table)
	}

	/// Appends `next` to the continuations of `key`, creating the state if needed.
	fn add_transition(&mut self, key: &[Token], next: &str) {
		let position = match self.index.get(key) {
			Some(position) => *position,
			None => {
				let position = self.states.len();
				self.states.push(State::new(key));
				self.index.insert(key.to_vec(), position);
				if key[0] == SENTENCE_START {
					self.start_contexts.push(position);
				}
				position
			}
		};
		self.states[position].add_continuation(next);
	}

	/// Returns the chain order (key length).
	pub fn order(&self) -> usize {
		self.order
	}

	/// Looks up the state of a context key.
	pub fn get(&self, key: &[Token]) -> Option<&State> {
		self.index.get(key).map(|position| &self.states[*position])
	}

	/// Returns the continuations observed after `key`, if any.
	pub fn continuations(&self, key: &[Token]) -> Option<&[Token]> {
		self.get(key).map(State::continuations)
	}

	/// Returns the states whose key starts a sentence, in first-seen order.
	pub fn start_contexts(&self) -> Vec<&State> {
		self.start_contexts.iter().map(|position| &self.states[*position]).collect()
	}

	/// Number of start contexts.
	pub fn start_count(&self) -> usize {
		self.start_contexts.len()
	}

	/// Iterates over the keys in first-seen order.
	pub fn keys(&self) -> impl Iterator<Item = &[Token]> {
		self.states.iter().map(State::key)
	}

	/// Iterates over the states in first-seen order.
	pub fn states(&self) -> impl Iterator<Item = &State> {
		self.states.iter()
	}

	/// Number of distinct context keys.
	pub fn len(&self) -> usize {
		self.states.len()
	}

	pub fn is_empty(&self) -> bool {
		self.states.is_empty()
	}
}
