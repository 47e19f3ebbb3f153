//! Durable snapshots of token sequences.
//!
//! A snapshot is the flat token sequence of a model, stored as a JSON array
//! of strings in `<base_dir>/<name>.json`. The chain table is never stored:
//! it is rebuilt from the tokens on load, so a snapshot can be loaded into a
//! model of any chain order.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{MarkovError, Result};
use crate::io;
use crate::model::tokenizer::{Token, tokenize};
use crate::provider::TextProvider;

/// Snapshot name used when none is given.
pub const DEFAULT_SNAPSHOT_NAME: &str = "vocabularDump";

/// Parameters for fetching a provider-backed vocabulary.
///
/// The cache key is `{name_prefix}{user_id}_{dialogue}`, where `user_id` is
/// the resolved `peer_id` and `dialogue` defaults to `user_id`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VocabularyRequest {
	/// Identifier of the person whose messages are learned.
	pub peer_id: String,
	/// Dialogue to read from; the direct dialogue with the peer when `None`.
	pub from_dialogue: Option<String>,
	/// Bypass the cache and the stored snapshot, fetch again.
	pub update: bool,
	/// Prefix of the cache key and snapshot name.
	pub name_prefix: String,
}

impl VocabularyRequest {
	pub fn new(peer_id: impl Into<String>) -> Self {
		Self {
			peer_id: peer_id.into(),
			from_dialogue: None,
			update: false,
			name_prefix: String::new(),
		}
	}

	pub fn in_dialogue(mut self, dialogue_id: impl Into<String>) -> Self {
		self.from_dialogue = Some(dialogue_id.into());
		self
	}

	pub fn force_update(mut self, update: bool) -> Self {
		self.update = update;
		self
	}

	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.name_prefix = prefix.into();
		self
	}
}

/// Named snapshot storage plus an in-memory vocabulary cache.
///
/// # Responsibilities
/// - Save token sequences atomically (temporary file, then rename)
/// - Load and list snapshots
/// - Cache provider-backed vocabularies by key
#[derive(Debug)]
pub struct ModelStore {
	base_dir: PathBuf,
	vocabularies: HashMap<String, Vec<Token>>,
}

impl ModelStore {
	/// Creates a store rooted at `base_dir`. The directory is created on first save.
	pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
		Self {
			base_dir: io::normalize_folder(base_dir),
			vocabularies: HashMap::new(),
		}
	}

	pub fn base_dir(&self) -> &Path {
		&self.base_dir
	}

	/// Returns the file path of a snapshot.
	///
	/// # Errors
	/// Returns `MarkovError::InvalidInput` if the name is empty or would
	/// escape the base directory.
	pub fn path_of(&self, name: Option<&str>) -> Result<PathBuf> {
		let name = name.unwrap_or(DEFAULT_SNAPSHOT_NAME);
		if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
			return Err(MarkovError::InvalidInput(format!("invalid snapshot name {name:?}")));
		}
		Ok(io::snapshot_path(&self.base_dir, name))
	}

	/// True if a snapshot with this name exists.
	pub fn exists(&self, name: Option<&str>) -> bool {
		self.path_of(name).is_ok_and(|path| path.is_file())
	}

	/// Saves a token sequence under `name` (`None` = [`DEFAULT_SNAPSHOT_NAME`]).
	///
	/// The JSON is written to a temporary file in the base directory, which
	/// is then renamed over the snapshot. Readers never see a partial file.
	///
	/// Returns the path of the snapshot.
	pub fn save(&self, name: Option<&str>, tokens: &[Token]) -> Result<PathBuf> {
		let path = self.path_of(name)?;
		fs::create_dir_all(&self.base_dir)?;

		let temp_file = NamedTempFile::new_in(&self.base_dir)?;
		{
			let mut writer = BufWriter::new(&temp_file);
			serde_json::to_writer(&mut writer, tokens)?;
			writer.flush()?;
		}
		temp_file.persist(&path).map_err(|e| MarkovError::Io(e.error))?;

		info!(path = %path.display(), tokens = tokens.len(), "snapshot saved");
		Ok(path)
	}

	/// Loads the token sequence stored under `name`.
	///
	/// # Errors
	/// - `MarkovError::NotFound` if there is no such snapshot.
	/// - `MarkovError::Serialization` if the file is not a JSON array of strings.
	pub fn load(&self, name: Option<&str>) -> Result<Vec<Token>> {
		let path = self.path_of(name)?;
		if !path.is_file() {
			return Err(MarkovError::NotFound(path.display().to_string()));
		}

		let reader = BufReader::new(File::open(&path)?);
		let tokens: Vec<Token> = serde_json::from_reader(reader)?;

		info!(path = %path.display(), tokens = tokens.len(), "snapshot loaded");
		Ok(tokens)
	}

	/// Lists snapshot names (without extension), sorted.
	///
	/// A base directory that does not exist yet holds no snapshot.
	pub fn list(&self) -> Result<Vec<String>> {
		if !self.base_dir.is_dir() {
			return Ok(Vec::new());
		}
		io::list_files(&self.base_dir, io::SNAPSHOT_EXTENSION)?
			.iter()
			.map(|file| io::get_filename(file).map_err(MarkovError::from))
			.collect()
	}

	/// Returns the vocabulary of a provider user.
	///
	/// # Behavior
	/// - Resolves `peer_id` through the provider and builds the cache key.
	/// - Unless `update` is set, returns the cached sequence, or the stored
	///   snapshot for that key (which is then cached).
	/// - Otherwise fetches every message, joins them with a space, tokenizes
	///   the result, saves it as a snapshot and caches it.
	pub fn vocabulary<P>(&mut self, provider: &P, request: &VocabularyRequest) -> Result<Vec<Token>>
	where
		P: TextProvider + ?Sized,
	{
		let user_id = provider.resolve_identifier(&request.peer_id)?;
		let dialogue = request.from_dialogue.clone().unwrap_or_else(|| user_id.clone());
		let key = format!("{}{}_{}", request.name_prefix, user_id, dialogue);

		if !request.update {
			if let Some(tokens) = self.vocabularies.get(&key) {
				debug!(key = %key, "vocabulary served from cache");
				return Ok(tokens.clone());
			}
			if self.exists(Some(key.as_str())) {
				let tokens = self.load(Some(key.as_str()))?;
				self.vocabularies.insert(key, tokens.clone());
				return Ok(tokens);
			}
		}

		let messages = provider.fetch_all_messages(&dialogue, &user_id)?;
		let tokens = tokenize(&messages.join(" "));
		self.save(Some(key.as_str()), &tokens)?;
		info!(key = %key, messages = messages.len(), tokens = tokens.len(), "vocabulary fetched");

		self.vocabularies.insert(key, tokens.clone());
		Ok(tokens)
	}

	/// Cached vocabulary for a key, if any.
	pub fn cached(&self, key: &str) -> Option<&[Token]> {
		self.vocabularies.get(key).map(Vec::as_slice)
	}

	/// Drops one cached vocabulary. The snapshot on disk is kept.
	pub fn invalidate(&mut self, key: &str) -> Option<Vec<Token>> {
		self.vocabularies.remove(key)
	}

	pub fn clear_cache(&mut self) {
		self.vocabularies.clear();
	}
}
