use serde::Deserialize;

use super::tokenizer::{SENTENCE_END, Token, word_tokens};

/// Upper bound on generated tokens when no other condition stops generation.
///
/// A chain trained on several sentences usually loops back on itself through
/// the sentence sentinels, so an unbounded sentence budget alone may never end.
pub const DEFAULT_MAX_TOKENS: usize = 4096;

/// Parameters for one generation call.
///
/// # Responsibilities
/// - Carry the seed words used to bias start and continuation selection
/// - Carry the optional sentence budget
/// - Bound the output length
///
/// # Invariants
/// - A sentence count of zero means unbounded
/// - The effective `max_tokens` is always >= 1
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
	/// Words to steer generation toward. Each is split into word tokens.
	pub seed_words: Vec<String>,

	/// Number of sentences after which generation stops.
	sentence_count: Option<usize>,

	/// Hard limit on the number of tokens produced.
	max_tokens: usize,
}

impl Default for GenerationOptions {
	fn default() -> Self {
		Self {
			seed_words: Vec::new(),
			sentence_count: None,
			max_tokens: DEFAULT_MAX_TOKENS,
		}
	}
}

impl GenerationOptions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the seed words.
	pub fn with_seed_words<I, S>(mut self, words: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.seed_words = words.into_iter().map(Into::into).collect();
		self
	}

	/// Stops generation after `count` sentences. `0` means unbounded.
	pub fn with_sentence_count(mut self, count: usize) -> Self {
		self.set_sentence_count(Some(count));
		self
	}

	/// Caps the number of generated tokens (at least 1).
	pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
		self.max_tokens = max_tokens.max(1);
		self
	}

	/// Sets or clears the sentence budget. `Some(0)` clears it.
	pub fn set_sentence_count(&mut self, count: Option<usize>) {
		self.sentence_count = count.filter(|count| *count > 0);
	}

	pub fn sentence_count(&self) -> Option<usize> {
		// Deserialized options may carry an explicit zero.
		self.sentence_count.filter(|count| *count > 0)
	}

	pub fn max_tokens(&self) -> usize {
		self.max_tokens.max(1)
	}
}

/// Per-call state threaded through the generation steps.
///
/// Built once from [`GenerationOptions`]: the seed words are split into
/// tokens up front and the output grows as tokens are emitted.
#[derive(Debug)]
pub(crate) struct GenerationContext {
	/// Lowercase word tokens of every seed word, duplicates kept.
	pub(crate) seed_tokens: Vec<Token>,

	/// Sentences to produce before stopping, if bounded.
	pub(crate) sentence_budget: Option<usize>,

	/// Tokens emitted so far, sentinels included.
	pub(crate) running_output: Vec<Token>,

	sentences_done: usize,
	max_tokens: usize,
}

impl GenerationContext {
	pub(crate) fn new(options: &GenerationOptions) -> Self {
		Self {
			seed_tokens: options.seed_words.iter().flat_map(|word| word_tokens(word)).collect(),
			sentence_budget: options.sentence_count(),
			running_output: Vec::new(),
			sentences_done: 0,
			max_tokens: options.max_tokens(),
		}
	}

	/// Accounts for a chosen continuation.
	///
	/// Returns `true` if `next` closes a sentence and the budget is now spent.
	pub(crate) fn budget_reached_by(&mut self, next: &str) -> bool {
		if next != SENTENCE_END {
			return false;
		}
		self.sentences_done += 1;
		self.sentence_budget.is_some_and(|budget| self.sentences_done >= budget)
	}

	/// True once the output reached the token cap.
	pub(crate) fn is_full(&self) -> bool {
		self.running_output.len() >= self.max_tokens
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_zero_sentence_count_is_unbounded() {
		let options = GenerationOptions::new().with_sentence_count(0);
		assert_eq!(options.sentence_count(), None);

		let options = GenerationOptions::new().with_sentence_count(3);
		assert_eq!(options.sentence_count(), Some(3));
	}

	#[test]
	fn test_max_tokens_never_zero() {
		assert_eq!(GenerationOptions::new().max_tokens(), DEFAULT_MAX_TOKENS);
		assert_eq!(GenerationOptions::new().with_max_tokens(0).max_tokens(), 1);
	}

	#[test]
	fn test_context_splits_seed_words() {
		let options = GenerationOptions::new().with_seed_words(["Hello, World", "  cat! "]);
		let context = GenerationContext::new(&options);
		assert_eq!(context.seed_tokens, vec!["hello", "world", "cat"]);
		assert!(context.running_output.is_empty());
	}

	#[test]
	fn test_budget_counts_sentence_ends_only() {
		let mut context = GenerationContext::new(&GenerationOptions::new().with_sentence_count(2));
		assert!(!context.budget_reached_by("word"));
		assert!(!context.budget_reached_by("^"));
		assert!(!context.budget_reached_by(SENTENCE_END));
		assert!(context.budget_reached_by(SENTENCE_END));

		let mut unbounded = GenerationContext::new(&GenerationOptions::new());
		for _ in 0..10 {
			assert!(!unbounded.budget_reached_by(SENTENCE_END));
		}
	}

	#[test]
	fn test_options_deserialize_with_defaults() {
		let options: GenerationOptions = toml::from_str("seed_words = [\"cat\"]\nsentence_count = 2").unwrap();
		assert_eq!(options.seed_words, vec!["cat"]);
		assert_eq!(options.sentence_count(), Some(2));
		assert_eq!(options.max_tokens(), DEFAULT_MAX_TOKENS);
	}
}
