//! Markov-chain text generation library.
//!
//! This crate provides a word-level Markov chain text generator including:
//! - Word/punctuation tokenization with sentence sentinels
//! - Chain table construction for any chain order
//! - Generation biased toward seed words, with sentence budgets
//! - Durable, atomically written snapshots of the learned token sequence
//! - A pluggable text provider interface and its vocabulary cache
//!
//! Only the token sequence is ever persisted. The chain table is always
//! rebuilt from it, so snapshots do not depend on the chain order.

/// Core chain model and generation logic.
///
/// Tokenizer, chain table, generator and the model owning them.
pub mod model;

/// Named snapshots of token sequences and the vocabulary cache.
pub mod store;

/// External sources of training text.
pub mod provider;

/// Construction-time configuration (TOML).
pub mod config;

/// Error type shared by the whole crate.
pub mod error;

/// I/O utilities (line reading, path helpers).
///
/// Not exposed
pub(crate) mod io;

pub use error::{MarkovError, Result};
pub use model::generation_options::GenerationOptions;
pub use model::markov_model::{MarkovModel, TrainingSource};
pub use store::{ModelStore, VocabularyRequest};
