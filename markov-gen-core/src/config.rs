use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MarkovError, Result};
use crate::model::markov_model::TrainingSource;

/// Default number of tokens in a context key.
pub const DEFAULT_CHAIN_ORDER: usize = 2;

/// Default directory holding the snapshots.
pub const DEFAULT_STORE_DIR: &str = "./data";

/// Construction-time configuration of a model and its store.
///
/// # Example
/// ```
/// use markov_gen_core::config::ModelConfig;
///
/// let config = ModelConfig::from_toml_str(r#"
/// 	chain_order = 3
/// 	store_dir = "/tmp/markov"
///
/// 	[[initial_sources]]
/// 	file = "corpus.txt"
///
/// 	[[initial_sources]]
/// 	text = "Hello there."
/// "#).unwrap();
///
/// assert_eq!(config.chain_order, 3);
/// assert_eq!(config.initial_sources.len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
	/// Context length, must be >= 1.
	pub chain_order: usize,

	/// Base directory of the snapshot store.
	pub store_dir: PathBuf,

	/// Training data read at construction, in order.
	pub initial_sources: Vec<TrainingSource>,
}

impl Default for ModelConfig {
	fn default() -> Self {
		Self {
			chain_order: DEFAULT_CHAIN_ORDER,
			store_dir: PathBuf::from(DEFAULT_STORE_DIR),
			initial_sources: Vec::new(),
		}
	}
}

impl ModelConfig {
	/// Parses and validates a TOML document. Missing keys take their default.
	pub fn from_toml_str(document: &str) -> Result<Self> {
		let config: Self = toml::from_str(document).map_err(|e| MarkovError::Config(e.to_string()))?;
		config.validate()?;
		Ok(config)
	}

	/// Reads, parses and validates a TOML file.
	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
		let path = path.as_ref();
		let document = fs::read_to_string(path)
			.map_err(|e| MarkovError::Config(format!("cannot read {}: {e}", path.display())))?;
		Self::from_toml_str(&document)
	}

	/// # Errors
	/// Returns `MarkovError::InvalidOrder` if `chain_order < 1`.
	pub fn validate(&self) -> Result<()> {
		if self.chain_order < 1 {
			return Err(MarkovError::InvalidOrder(self.chain_order));
		}
		Ok(())
	}
}
