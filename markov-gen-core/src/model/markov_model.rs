use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::chain_table::ChainTable;
use super::generation_options::GenerationOptions;
use super::generator;
use super::tokenizer::{Token, tokenize, tokenize_bytes};
use crate::config::ModelConfig;
use crate::error::{MarkovError, Result};
use crate::io::read_file;
use crate::provider::TextProvider;
use crate::store::{ModelStore, VocabularyRequest};

/// Lines handled by one tokenizer thread, at minimum.
const MIN_LINES_PER_CHUNK: usize = 256;

/// A piece of training data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingSource {
	/// Raw text.
	Text(String),
	/// Path to a newline-delimited text file.
	File(PathBuf),
}

/// A Markov chain model over word and punctuation tokens.
///
/// This struct manages:
/// - `chain_order`: the context length, fixed at construction.
/// - `tokens`: the whole training corpus, concatenated across training calls.
/// - `table`: the chain table derived from `tokens`.
///
/// # Invariants
/// - `table` is always built from the current `tokens` with `chain_order`
/// - A failed training call leaves `tokens` and `table` untouched
///
/// The model is not meant to be trained and sampled concurrently: share it
/// behind a lock (the HTTP server wraps it in a `Mutex`).
#[derive(Clone, Debug)]
pub struct MarkovModel {
	chain_order: usize,
	tokens: Vec<Token>,
	table: ChainTable,
}

impl MarkovModel {
	/// Creates an empty model.
	///
	/// # Errors
	/// Returns `MarkovError::InvalidOrder` if `chain_order < 1`.
	pub fn new(chain_order: usize) -> Result<Self> {
		Ok(Self {
			chain_order,
			tokens: Vec::new(),
			table: ChainTable::build(&[], chain_order)?,
		})
	}

	/// Creates a model and trains it on the configured initial sources.
	///
	/// - Text sources are always used.
	/// - File sources that are not files are skipped with a warning.
	/// - A file listed twice (same canonical path) is used once.
	///
	/// # Errors
	/// - `MarkovError::InvalidOrder` if the configured order is < 1.
	/// - Any error raised while reading an existing training file.
	pub fn from_config(config: &ModelConfig) -> Result<Self> {
		let mut model = Self::new(config.chain_order)?;
		let mut seen_files = HashSet::new();

		for source in &config.initial_sources {
			match source {
				TrainingSource::Text(text) => {
					model.update_from_text(text);
				}
				TrainingSource::File(path) => {
					let Ok(canonical) = fs::canonicalize(path) else {
						warn!(path = %path.display(), "skipping missing training file");
						continue;
					};
					if !canonical.is_file() {
						warn!(path = %path.display(), "skipping training path, not a file");
						continue;
					}
					if seen_files.insert(canonical.clone()) {
						model.update_from_file(&canonical)?;
					}
				}
			}
		}

		Ok(model)
	}

	pub fn chain_order(&self) -> usize {
		self.chain_order
	}

	/// The full training token sequence.
	pub fn tokens(&self) -> &[Token] {
		&self.tokens
	}

	/// The chain table derived from the current tokens.
	pub fn table(&self) -> &ChainTable {
		&self.table
	}

	/// True once the model has at least one start context.
	pub fn is_trained(&self) -> bool {
		self.table.start_count() > 0
	}

	/// Trains the model on one source.
	///
	/// Returns the number of tokens added.
	pub fn update(&mut self, source: &TrainingSource) -> Result<usize> {
		match source {
			TrainingSource::Text(text) => Ok(self.update_from_text(text)),
			TrainingSource::File(path) => self.update_from_file(path),
		}
	}

	/// Trains the model on raw text. Returns the number of tokens added.
	pub fn update_from_text(&mut self, text: &str) -> usize {
		let tokens = tokenize(text);
		// The order was validated at construction, the rebuild cannot fail.
		self.extend(tokens).unwrap_or(0)
	}

	/// Trains the model on raw bytes.
	///
	/// # Errors
	/// Returns `MarkovError::InvalidInput` if the bytes are not UTF-8 text.
	/// The model is left unchanged in that case.
	pub fn update_from_bytes(&mut self, bytes: &[u8]) -> Result<usize> {
		let tokens = tokenize_bytes(bytes)?;
		self.extend(tokens)
	}

	/// Trains the model on a newline-delimited text file.
	///
	/// Each non-blank line is tokenized on its own; lines that are not valid
	/// UTF-8 are skipped. Large files are tokenized on several threads and
	/// reassembled in line order.
	///
	/// # Errors
	/// Returns `MarkovError::InvalidFile` if the path is not a readable file.
	/// The model is left unchanged in that case.
	pub fn update_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
		let path = path.as_ref();
		let invalid = |reason: String| MarkovError::InvalidFile {
			path: path.to_path_buf(),
			reason,
		};

		if !path.is_file() {
			return Err(invalid("not an existing file".to_owned()));
		}
		let lines = read_file(path).map_err(|e| invalid(e.to_string()))?;
		let tokens = tokenize_lines(lines).map_err(invalid)?;

		let added = self.extend(tokens)?;
		info!(path = %path.display(), added, "trained from file");
		Ok(added)
	}

	/// Replaces the whole token sequence and rebuilds the table.
	pub fn replace_tokens(&mut self, tokens: Vec<Token>) -> Result<()> {
		let table = ChainTable::build(&tokens, self.chain_order)?;
		self.tokens = tokens;
		self.table = table;
		Ok(())
	}

	/// Appends tokens and rebuilds the table, all or nothing.
	fn extend(&mut self, tokens: Vec<Token>) -> Result<usize> {
		let added = tokens.len();
		if added == 0 {
			return Ok(0);
		}

		let previous_len = self.tokens.len();
		self.tokens.extend(tokens);
		match ChainTable::build(&self.tokens, self.chain_order) {
			Ok(table) => {
				self.table = table;
				debug!(added, total = self.tokens.len(), "model updated");
				Ok(added)
			}
			Err(e) => {
				self.tokens.truncate(previous_len);
				Err(e)
			}
		}
	}

	/// Generates text with the thread-local random generator.
	///
	/// # Errors
	/// Returns `MarkovError::EmptyModel` if the model was never trained.
	pub fn generate(&self, options: &GenerationOptions) -> Result<String> {
		self.generate_with_rng(options, &mut rand::rng())
	}

	/// Generates text with the given random generator.
	pub fn generate_with_rng<R: rand::Rng>(&self, options: &GenerationOptions, rng: &mut R) -> Result<String> {
		if self.tokens.is_empty() {
			return Err(MarkovError::EmptyModel);
		}
		generator::generate(&self.table, options, rng)
	}

	/// Saves the token sequence as a named snapshot (`None` = default name).
	pub fn save_snapshot(&self, store: &ModelStore, name: Option<&str>) -> Result<PathBuf> {
		store.save(name, &self.tokens)
	}

	/// Replaces the token sequence with a stored snapshot and rebuilds the table.
	///
	/// # Errors
	/// Returns `MarkovError::NotFound` if the snapshot does not exist.
	pub fn load_snapshot(&mut self, store: &ModelStore, name: Option<&str>) -> Result<()> {
		let tokens = store.load(name)?;
		self.replace_tokens(tokens)
	}

	/// Makes a provider-backed vocabulary the model's token sequence.
	///
	/// The vocabulary comes from the store's cache unless the request
	/// forces an update.
	pub fn set_vocabulary<P>(&mut self, store: &mut ModelStore, provider: &P, request: &VocabularyRequest) -> Result<()>
	where
		P: TextProvider + ?Sized,
	{
		let tokens = store.vocabulary(provider, request)?;
		self.replace_tokens(tokens)
	}
}

/// Tokenizes lines in parallel chunks and concatenates them in line order.
///
/// # Behavior
/// - Splits lines into chunks (based on CPU cores * factor, at least
///   `MIN_LINES_PER_CHUNK` lines each).
/// - Spawns one thread per chunk, each sends back `(chunk index, tokens)`.
/// - Sorts the parts by index before concatenation.
///
/// # Errors
/// Returns a description of the failure if a worker did not report back.
fn tokenize_lines(lines: Vec<String>) -> std::result::Result<Vec<Token>, String> {
	if lines.is_empty() {
		return Ok(Vec::new());
	}

	let cpus = num_cpus::get();
	let factor = 8;
	let chunks = cpus * factor;
	let chunk_size = lines.len().div_ceil(chunks).max(MIN_LINES_PER_CHUNK);

	let (tx, rx) = mpsc::channel();
	let mut expected = 0;
	for (index, chunk) in lines.chunks(chunk_size).enumerate() {
		let tx = tx.clone();
		let chunk: Vec<String> = chunk.to_vec();
		expected += 1;

		thread::spawn(move || {
			let tokens: Vec<Token> = chunk.iter().flat_map(|line| tokenize(line)).collect();
			// The receiver waits for every sender, it cannot be gone.
			let _ = tx.send((index, tokens));
		});
	}
	drop(tx);

	let mut parts: Vec<(usize, Vec<Token>)> = rx.iter().collect();
	if parts.len() != expected {
		return Err(format!("{} of {expected} tokenizer workers failed", expected - parts.len()));
	}
	parts.sort_by_key(|(index, _)| *index);

	Ok(parts.into_iter().flat_map(|(_, tokens)| tokens).collect())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::tokenizer::{SENTENCE_END, SENTENCE_START};
	use rand::SeedableRng;
	use rand::rngs::StdRng;
	use tempfile::TempDir;

	#[test]
	fn test_new_rejects_order_zero() {
		assert!(matches!(MarkovModel::new(0), Err(MarkovError::InvalidOrder(0))));
	}

	#[test]
	fn test_fresh_model_is_empty() {
		let model = MarkovModel::new(2).unwrap();
		assert!(!model.is_trained());
		assert!(model.tokens().is_empty());
		assert!(matches!(model.generate(&GenerationOptions::new()), Err(MarkovError::EmptyModel)));
	}

	#[test]
	fn test_updates_accumulate_and_rebuild() {
		let mut model = MarkovModel::new(1).unwrap();
		assert_eq!(model.update_from_text("a b a c"), 6);
		assert_eq!(model.table().continuations(&["a".to_owned()]).unwrap(), ["b", "c"]);

		assert_eq!(model.update(&TrainingSource::Text("a d.".to_owned())).unwrap(), 5);
		assert_eq!(model.tokens().len(), 11);
		assert_eq!(model.table().continuations(&["a".to_owned()]).unwrap(), ["b", "c", "d"]);
		// The end of the first call links to the start of the second.
		assert_eq!(model.table().continuations(&[SENTENCE_END.to_owned()]).unwrap(), [SENTENCE_START]);
	}

	#[test]
	fn test_empty_text_changes_nothing() {
		let mut model = MarkovModel::new(2).unwrap();
		model.update_from_text("Hello there.");
		let before = model.table().clone();
		assert_eq!(model.update_from_text("  #@ "), 0);
		assert_eq!(model.table(), &before);
	}

	#[test]
	fn test_invalid_bytes_leave_model_untouched() {
		let mut model = MarkovModel::new(2).unwrap();
		model.update_from_text("Hello there.");
		let tokens = model.tokens().to_vec();

		assert!(matches!(model.update_from_bytes(&[0xff, 0x00]), Err(MarkovError::InvalidInput(_))));
		assert_eq!(model.tokens(), tokens.as_slice());
		assert_eq!(model.update_from_bytes("General Kenobi!".as_bytes()).unwrap(), 5);
	}

	#[test]
	fn test_missing_file_is_invalid_file() {
		let dir = TempDir::new().unwrap();
		let mut model = MarkovModel::new(2).unwrap();

		let missing = dir.path().join("nope.txt");
		assert!(matches!(model.update_from_file(&missing), Err(MarkovError::InvalidFile { .. })));
		assert!(matches!(model.update_from_file(dir.path()), Err(MarkovError::InvalidFile { .. })));
		assert!(model.tokens().is_empty());
	}

	#[test]
	fn test_file_lines_are_sentinel_bounded() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("corpus.txt");
		fs::write(&path, "First line\n\nsecond line!\n").unwrap();

		let mut model = MarkovModel::new(2).unwrap();
		assert_eq!(model.update_from_file(&path).unwrap(), 9);
		assert_eq!(model.tokens(), ["^", "first", "line", "$", "^", "second", "line", "!", "$"]);
	}

	#[test]
	fn test_large_file_keeps_line_order() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("big.txt");
		let text: String = (0..3000).map(|i| format!("line w{i}\n")).collect();
		fs::write(&path, text).unwrap();

		let mut model = MarkovModel::new(1).unwrap();
		assert_eq!(model.update_from_file(&path).unwrap(), 3000 * 4);
		let words: Vec<&str> = model
			.tokens()
			.iter()
			.filter(|t| t.starts_with('w'))
			.map(String::as_str)
			.collect();
		let expected: Vec<String> = (0..3000).map(|i| format!("w{i}")).collect();
		assert_eq!(words, expected);
	}

	#[test]
	fn test_from_config_skips_missing_and_duplicate_files() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("corpus.txt");
		fs::write(&path, "One two.\n").unwrap();

		let config = ModelConfig {
			chain_order: 1,
			store_dir: dir.path().to_path_buf(),
			initial_sources: vec![
				TrainingSource::File(path.clone()),
				TrainingSource::File(dir.path().join("missing.txt")),
				TrainingSource::File(dir.path().join(".").join("corpus.txt")),
				TrainingSource::Text("Three.".to_owned()),
			],
		};
		let model = MarkovModel::from_config(&config).unwrap();
		assert_eq!(model.chain_order(), 1);
		assert_eq!(model.tokens(), ["^", "one", "two", ".", "$", "^", "three", ".", "$"]);
	}

	#[test]
	fn test_seeded_generation_is_reproducible() {
		let mut model = MarkovModel::new(2).unwrap();
		model.update_from_text("The quick fox jumps. The lazy dog sleeps. A quick dog runs.");
		let options = GenerationOptions::new().with_sentence_count(2);

		let first = model.generate_with_rng(&options, &mut StdRng::seed_from_u64(21)).unwrap();
		let second = model.generate_with_rng(&options, &mut StdRng::seed_from_u64(21)).unwrap();
		assert_eq!(first, second);
	}
}
