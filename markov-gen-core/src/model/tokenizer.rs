use std::sync::LazyLock;

use regex::Regex;

use crate::error::{MarkovError, Result};

/// A single unit of tokenized text: a word, a punctuation run or a sentinel.
pub type Token = String;

/// Sentinel emitted before the first token of every sentence.
pub const SENTENCE_START: &str = "^";

/// Sentinel emitted after every sentence-terminating punctuation run.
pub const SENTENCE_END: &str = "$";

static WORD_OR_MARKS: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\w+|[.!?…,;:]+").expect("word/mark pattern is valid"));

static ONLY_WORDS: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\w+").expect("word pattern is valid"));

static END_MARKS: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"[.!?…]+").expect("terminal mark pattern is valid"));

/// Splits raw text into a sentinel-bounded token sequence.
///
/// The text is trimmed and lowercased, then scanned left to right for
/// maximal runs of word characters or sentence punctuation
/// (`. ! ? … , ; :`). Everything else is dropped.
///
/// - `SENTENCE_START` precedes the first token of each sentence
/// - `SENTENCE_END` follows any run containing `. ! ? …`
/// - A trailing `SENTENCE_END` closes input that does not end a sentence
///
/// Input without any match produces an empty sequence.
///
/// ```
/// use markov_gen_core::model::tokenizer::tokenize;
///
/// let tokens = tokenize("Hello, world! How are you?");
/// assert_eq!(
/// 	tokens,
/// 	["^", "hello", ",", "world", "!", "$", "^", "how", "are", "you", "?", "$"]
/// );
/// ```
pub fn tokenize(text: &str) -> Vec<Token> {
	let text = text.trim().to_lowercase();
	let mut tokens = Vec::new();
	let mut need_start = true;

	for found in WORD_OR_MARKS.find_iter(&text) {
		let token = found.as_str();
		if need_start {
			need_start = false;
			tokens.push(SENTENCE_START.to_owned());
		}
		tokens.push(token.to_owned());
		if END_MARKS.is_match(token) {
			need_start = true;
			tokens.push(SENTENCE_END.to_owned());
		}
	}

	if tokens.last().is_some_and(|last| last != SENTENCE_END) {
		tokens.push(SENTENCE_END.to_owned());
	}

	tokens
}

/// Tokenizes raw bytes, which must be UTF-8 text.
///
/// # Errors
/// Returns `MarkovError::InvalidInput` if the bytes are not valid UTF-8.
pub fn tokenize_bytes(bytes: &[u8]) -> Result<Vec<Token>> {
	let text = std::str::from_utf8(bytes).map_err(|e| MarkovError::InvalidInput(e.to_string()))?;
	Ok(tokenize(text))
}

/// Splits a seed word into its lowercase word tokens (punctuation dropped).
pub fn word_tokens(seed: &str) -> Vec<Token> {
	ONLY_WORDS
		.find_iter(&seed.trim().to_lowercase())
		.map(|found| found.as_str().to_owned())
		.collect()
}

/// True for `SENTENCE_START` and `SENTENCE_END`.
pub fn is_sentinel(token: &str) -> bool {
	token == SENTENCE_START || token == SENTENCE_END
}

/// True if the token contains at least one word character.
pub fn is_word(token: &str) -> bool {
	!is_sentinel(token) && ONLY_WORDS.is_match(token)
}
