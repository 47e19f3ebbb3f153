use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the chain-model engine.
///
/// Every error is reported synchronously by the call that detects it.
/// Nothing is retried internally.
#[derive(Error, Debug)]
pub enum MarkovError {
	/// Chain order must be at least 1.
	#[error("A chain cannot be of order {0}, it must be >= 1")]
	InvalidOrder(usize),

	/// Training input is not text.
	#[error("Training input is not valid text: {0}")]
	InvalidInput(String),

	/// Generation attempted without learned data or start contexts.
	#[error("The model is empty, nothing to start generating from")]
	EmptyModel,

	/// A snapshot was requested that does not exist in the store.
	#[error("Snapshot not found: {0}")]
	NotFound(String),

	/// Training file is missing or unreadable.
	#[error("Invalid training file {}: {reason}", path.display())]
	InvalidFile { path: PathBuf, reason: String },

	/// The external text provider failed.
	#[error("Text provider error: {0}")]
	Provider(String),

	/// Configuration could not be read or is inconsistent.
	#[error("Invalid configuration: {0}")]
	Config(String),

	#[error("Snapshot (de)serialization failed: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, MarkovError>;
