use std::collections::VecDeque;

use rand::Rng;
use tracing::trace;

use super::chain_table::ChainTable;
use super::generation_options::{GenerationContext, GenerationOptions};
use super::state::{State, biased_choice};
use super::tokenizer::{Token, is_sentinel, is_word};
use crate::error::{MarkovError, Result};

/// Steps of a generation run.
///
/// `SelectStart → Emit → LookupContext → {SelectContinuation → Emit → LookupContext} → Terminal`
enum Step<'t> {
	SelectStart,
	Emit(&'t [Token]),
	LookupContext,
	SelectContinuation(&'t State),
	Terminal,
}

/// Generates text by walking the chain table.
///
/// # Parameters
/// - `table`: the chain table to sample from.
/// - `options`: seed words, sentence budget and token cap.
/// - `rng`: source of randomness.
///
/// # Behavior
/// - Picks a start context, biased toward contexts containing seed words.
/// - Repeatedly looks up the last `order` tokens and draws a continuation,
///   biased toward continuations equal to a seed word.
/// - Stops when the context has no continuation, when a sentence end
///   exhausts the sentence budget, or when the token cap is reached.
///
/// # Errors
/// Returns `MarkovError::EmptyModel` if the table has no start context.
pub fn generate<R: Rng>(table: &ChainTable, options: &GenerationOptions, rng: &mut R) -> Result<String> {
	let order = table.order();
	let mut context = GenerationContext::new(options);
	let mut trailing: VecDeque<Token> = VecDeque::with_capacity(order + 1);
	let mut step = Step::SelectStart;

	loop {
		step = match step {
			Step::SelectStart => Step::Emit(select_start(table, &context.seed_tokens, rng)?.key()),
			Step::Emit(tokens) => {
				for token in tokens {
					context.running_output.push(token.clone());
					trailing.push_back(token.clone());
					if trailing.len() > order {
						trailing.pop_front();
					}
				}
				if context.is_full() {
					Step::Terminal
				} else {
					Step::LookupContext
				}
			}
			Step::LookupContext => match table.get(trailing.make_contiguous()) {
				Some(state) => Step::SelectContinuation(state),
				None => Step::Terminal,
			},
			Step::SelectContinuation(state) => match state.predict(&context.seed_tokens, rng) {
				Some(next) if context.budget_reached_by(next) => Step::Terminal,
				Some(next) => Step::Emit(std::slice::from_ref(next)),
				None => Step::Terminal,
			},
			Step::Terminal => break,
		};
	}

	trace!(tokens = context.running_output.len(), "generation finished");
	Ok(render(&context.running_output))
}

/// Chooses the start context.
///
/// Contexts containing seed tokens are favored; without any match the
/// choice is uniform over all start contexts.
fn select_start<'t, R: Rng>(table: &'t ChainTable, seed_tokens: &[Token], rng: &mut R) -> Result<&'t State> {
	let starts = table.start_contexts();
	biased_choice(&starts, seed_tokens, |state, seed| state.contains(seed), rng)
		.copied()
		.ok_or(MarkovError::EmptyModel)
}

/// Renders a token sequence as text.
///
/// - Sentinels are dropped; each one asks for the next word to be capitalized
/// - Word tokens are preceded by a space, punctuation is glued to the left
/// - The result is trimmed
pub fn render(tokens: &[Token]) -> String {
	let mut out = String::new();
	let mut need_capitalize = true;

	for token in tokens {
		if is_sentinel(token) {
			need_capitalize = true;
			continue;
		}
		if is_word(token) && !out.is_empty() {
			out.push(' ');
		}
		if need_capitalize && token.chars().any(char::is_alphabetic) {
			need_capitalize = false;
			out.push_str(&capitalize(token));
		} else {
			out.push_str(token);
		}
	}

	out.trim().to_owned()
}

/// Upper-cases the first alphabetic character of `token`.
fn capitalize(token: &str) -> String {
	let mut out = String::with_capacity(token.len());
	let mut done = false;
	for c in token.chars() {
		if !done && c.is_alphabetic() {
			done = true;
			out.extend(c.to_uppercase());
		} else {
			out.push(c);
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::tokenizer::tokenize;
	use rand::SeedableRng;
	use rand::rngs::StdRng;

	fn table(text: &str, order: usize) -> ChainTable {
		ChainTable::build(&tokenize(text), order).unwrap()
	}

	fn strings(tokens: &[&str]) -> Vec<Token> {
		tokens.iter().map(|t| t.to_string()).collect()
	}

	fn first_alphabetic_is_upper(text: &str) -> bool {
		text.chars().find(|c| c.is_alphabetic()).is_none_or(char::is_uppercase)
	}

	#[test]
	fn test_empty_table_is_empty_model() {
		let empty = ChainTable::build(&[], 2).unwrap();
		let mut rng = StdRng::seed_from_u64(0);
		assert!(matches!(
			generate(&empty, &GenerationOptions::new(), &mut rng),
			Err(MarkovError::EmptyModel)
		));
	}

	#[test]
	fn test_single_sentence_is_reproduced() {
		let chain = table("The cat sat on the mat.", 1);
		let mut rng = StdRng::seed_from_u64(5);
		// "the" is followed by "cat" or "mat", every path ends with "mat."
		for _ in 0..20 {
			let text = generate(&chain, &GenerationOptions::new(), &mut rng).unwrap();
			assert!(text.starts_with("The "), "{text}");
			assert!(text.ends_with(" mat."), "{text}");
		}
	}

	#[test]
	fn test_sentence_budget_stops_generation() {
		let chain = table("A b. C d.", 1);
		let mut rng = StdRng::seed_from_u64(9);

		for _ in 0..20 {
			let one = generate(&chain, &GenerationOptions::new().with_sentence_count(1), &mut rng).unwrap();
			assert!(one == "A b." || one == "C d.", "{one}");

			let three = generate(&chain, &GenerationOptions::new().with_sentence_count(3), &mut rng).unwrap();
			assert_eq!(three.matches('.').count(), 3, "{three}");
		}
	}

	#[test]
	fn test_unbounded_cycle_stops_at_token_cap() {
		// "$" -> "^" makes the chain cyclic.
		let chain = table("A b. C d.", 1);
		let mut rng = StdRng::seed_from_u64(1);
		let text = generate(&chain, &GenerationOptions::new().with_max_tokens(50), &mut rng).unwrap();
		assert!(text.matches('.').count() >= 5, "{text}");
		assert!(text.split_whitespace().count() <= 50);
	}

	#[test]
	fn test_seed_word_selects_matching_start() {
		let chain = table("Dog ran. Cat sat. Bird flew.", 2);
		let mut rng = StdRng::seed_from_u64(2);
		let options = GenerationOptions::new().with_seed_words(["DOG"]).with_sentence_count(1);
		for _ in 0..30 {
			assert_eq!(generate(&chain, &options, &mut rng).unwrap(), "Dog ran.");
		}
	}

	#[test]
	fn test_seed_word_biases_continuation() {
		let chain = table("I like cats. I like dogs.", 1);
		let mut rng = StdRng::seed_from_u64(4);
		let options = GenerationOptions::new().with_seed_words(["dogs"]).with_sentence_count(1);
		for _ in 0..30 {
			assert_eq!(generate(&chain, &options, &mut rng).unwrap(), "I like dogs.");
		}
	}

	#[test]
	fn test_unknown_seed_falls_back_to_uniform() {
		let chain = table("Dog ran. Cat sat.", 2);
		let mut rng = StdRng::seed_from_u64(6);
		let options = GenerationOptions::new().with_seed_words(["unicorn"]).with_sentence_count(1);
		let mut seen = std::collections::HashSet::new();
		for _ in 0..100 {
			seen.insert(generate(&chain, &options, &mut rng).unwrap());
		}
		assert_eq!(seen.len(), 2);
	}

	#[test]
	fn test_output_hides_sentinels_and_is_capitalized() {
		let chain = table("hello there, friend! how are you? fine... thanks: really.", 2);
		let mut rng = StdRng::seed_from_u64(12);
		for _ in 0..50 {
			let options = GenerationOptions::new().with_sentence_count(3);
			let text = generate(&chain, &options, &mut rng).unwrap();
			assert!(!text.contains('^') && !text.contains('$'), "{text}");
			assert!(first_alphabetic_is_upper(&text), "{text}");
			assert_eq!(text, text.trim());
		}
	}

	#[test]
	fn test_render_spacing_and_capitalization() {
		let tokens = strings(&["^", "hello", ",", "world", "!", "$", "^", "how", "are", "you", "?", "$"]);
		assert_eq!(render(&tokens), "Hello, world! How are you?");

		let tokens = strings(&["^", ",", "hello", "$", "^", "42", "cats", "..."]);
		assert_eq!(render(&tokens), ", Hello 42 Cats...");

		assert_eq!(render(&strings(&["^", "$"])), "");
		assert_eq!(render(&[]), "");
	}

	#[test]
	fn test_capitalize_first_alphabetic() {
		assert_eq!(capitalize("élan"), "Élan");
		assert_eq!(capitalize("3d"), "3D");
		assert_eq!(capitalize("..."), "...");
	}
}
