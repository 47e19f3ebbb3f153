use rand::Rng;
use rand::seq::IndexedRandom;

use super::tokenizer::Token;

/// Multiplier applied to a candidate's weight for every seed token it matches.
///
/// Matches compound: a candidate matching three seed tokens weighs `8^3`.
pub const SEED_BOOST: u64 = 8;

/// Represents a state in the chain table.
///
/// A `State` corresponds to one context key (`chain_order` consecutive tokens)
/// and stores every token observed right after that context.
///
/// Conceptually, this is a node in a Markov chain. Outgoing edges are not
/// counted: each observation is kept, in order, so that a uniform draw over
/// the list is a draw weighted by frequency.
///
/// ## Invariants
/// - All continuations belong to the same `key`
/// - A state stored in a table has at least one continuation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct State {
	/// Context key of the state.
	key: Vec<Token>,
	/// Observed continuations, in insertion order, duplicates preserved.
	/// Example: ["b", "c", "b"]
	continuations: Vec<Token>,
}

impl State {
	/// Creates a new empty state for the given context key.
	pub(crate) fn new(key: &[Token]) -> Self {
		Self {
			key: key.to_vec(),
			continuations: Vec::new(),
		}
	}

	/// Records one occurrence of `next` following this context.
	pub(crate) fn add_continuation(&mut self, next: &str) {
		self.continuations.push(next.to_owned());
	}

	pub fn key(&self) -> &[Token] {
		&self.key
	}

	pub fn continuations(&self) -> &[Token] {
		&self.continuations
	}

	/// True if any token of the key equals `token`.
	pub fn contains(&self, token: &str) -> bool {
		self.key.iter().any(|t| t == token)
	}

	/// Picks the next token, biased toward the given seed tokens.
	///
	/// See [`biased_choice`] for the weighting rules.
	///
	/// Returns `None` if the state has no continuations.
	pub fn predict<R: Rng>(&self, seed_tokens: &[Token], rng: &mut R) -> Option<&Token> {
		biased_choice(&self.continuations, seed_tokens, |candidate, seed| candidate == seed, rng)
	}
}

/// Computes the weight of one candidate against the seed tokens.
///
/// The weight starts at 1 and is multiplied by [`SEED_BOOST`] for every seed
/// token the candidate matches. Saturates instead of overflowing.
pub(crate) fn seed_weight<F>(seed_tokens: &[Token], matches: F) -> u64
where
	F: Fn(&str) -> bool,
{
	seed_tokens
		.iter()
		.filter(|seed| matches(seed.as_str()))
		.fold(1u64, |weight, _| weight.saturating_mul(SEED_BOOST))
}

/// Selects one candidate using seed-word weighting.
///
/// - Without seed tokens, the choice is uniform.
/// - Otherwise, candidates that match no seed token are dropped and the rest
///   are drawn proportionally to their weight.
/// - If no candidate matches, the choice falls back to uniform over all of them.
///
/// This method performs:
/// - an O(n * s) weight computation
/// - a cumulative subtraction to select a bucket
///
/// Returns `None` only if `candidates` is empty.
pub(crate) fn biased_choice<'a, T, F, R>(
	candidates: &'a [T],
	seed_tokens: &[Token],
	matches: F,
	rng: &mut R,
) -> Option<&'a T>
where
	F: Fn(&T, &str) -> bool,
	R: Rng,
{
	if seed_tokens.is_empty() {
		return candidates.choose(rng);
	}

	let weighted: Vec<(&T, u64)> = candidates
		.iter()
		.filter_map(|candidate| {
			let weight = seed_weight(seed_tokens, |seed| matches(candidate, seed));
			(weight > 1).then_some((candidate, weight))
		})
		.collect();

	if weighted.is_empty() {
		return candidates.choose(rng);
	}

	let total = weighted.iter().fold(0u64, |acc, (_, weight)| acc.saturating_add(*weight));
	let mut r = rng.random_range(0..total);

	for (candidate, weight) in &weighted {
		if r < *weight {
			return Some(*candidate);
		}
		r -= weight;
	}

	// Only reachable when the total saturated.
	weighted.last().map(|(candidate, _)| *candidate)
}
