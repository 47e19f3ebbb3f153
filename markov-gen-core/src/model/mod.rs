//! Top-level module for the chain model.
//!
//! This module provides a word-level Markov chain, including:
//! - Tokenization of raw text (`tokenizer`)
//! - The context → continuations table (`ChainTable`)
//! - One table entry and its weighted selection (`State`)
//! - Generation parameters (`GenerationOptions`)
//! - The generation state machine (`generator`)
//! - The model tying them together (`MarkovModel`)

/// Splits text into word, punctuation and sentinel tokens.
pub mod tokenizer;

/// Context → continuations table, rebuilt as a whole from a token sequence.
pub mod chain_table;

/// One context key and its observed continuations.
///
/// Performs seed-weighted random selection.
pub mod state;

/// Generation parameters and the per-call generation context.
pub mod generation_options;

/// Start selection, continuation selection, termination and rendering.
pub mod generator;

/// Model owning the chain order, the token sequence and the derived table.
///
/// Handles training from text, bytes and files, and snapshot load/save.
pub mod markov_model;
