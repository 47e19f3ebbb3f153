use std::path::{Path, PathBuf};
use std::{env, fs, io};

use tracing::debug;

/// Reads a newline-delimited text file and returns its usable lines.
///
/// - Splits on `\n` / `\r\n`
/// - Lines that are not valid UTF-8 are skipped
/// - Lines are trimmed and blank lines are skipped
pub(crate) fn read_file<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let bytes = fs::read(&filename)?;
	let mut lines = Vec::new();

	for (number, raw) in bytes.split(|b| *b == b'\n').enumerate() {
		let text = match std::str::from_utf8(raw) {
			Ok(text) => text.trim(),
			Err(e) => {
				debug!(line = number + 1, error = %e, "skipping undecodable line");
				continue;
			}
		};
		if !text.is_empty() {
			lines.push(text.to_owned());
		}
	}

	Ok(lines)
}

/// Builds the path of a named snapshot inside a store directory.
///
/// Example:
/// `data` + `"vocabularDump"` → `data/vocabularDump.json`
pub(crate) fn snapshot_path<P: AsRef<Path>>(dir: P, name: &str) -> PathBuf {
	let mut output = PathBuf::from(dir.as_ref());
	output.push(format!("{name}.{SNAPSHOT_EXTENSION}"));
	output
}

/// Extension used by snapshot files.
pub(crate) const SNAPSHOT_EXTENSION: &str = "json";

/// Extracts the base filename without extension.
///
/// Examples:
/// - `"./data/model.json"` → `"model"`
/// - `"model.json"` → `"model"`
pub(crate) fn get_filename<P: AsRef<Path>>(input_path: P) -> io::Result<String> {
	let stem = input_path
		.as_ref()
		.file_stem()
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no filename"))?;

	Ok(stem.to_string_lossy().to_string())
}

/// Normalize a folder path.
///
/// - `"."` or `"./"` resolves to the current working directory
/// - Other paths are returned as-is (not canonicalized)
pub(crate) fn normalize_folder<P: AsRef<Path>>(input: P) -> PathBuf {
	let input = input.as_ref();
	if input == Path::new(".") || input == Path::new("./") {
		env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		input.to_path_buf()
	}
}

/// Lists all files with a given extension in a directory.
///
/// Returns file names only (no paths), sorted.
pub(crate) fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();

		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			if let Some(name) = path.file_name() {
				files.push(name.to_string_lossy().to_string());
			}
		}
	}

	files.sort();
	Ok(files)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_read_file_skips_blank_and_invalid_lines() {
		let dir = tempfile::TempDir::new().unwrap();
		let path = dir.path().join("corpus.txt");
		let mut bytes = b"first line\r\n\n   \n".to_vec();
		bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);
		bytes.extend_from_slice("second line\n".as_bytes());
		fs::write(&path, bytes).unwrap();

		let lines = read_file(&path).unwrap();
		assert_eq!(lines, vec!["first line".to_owned(), "second line".to_owned()]);
	}

	#[test]
	fn test_snapshot_path_and_filename() {
		let path = snapshot_path("data", "vocabularDump");
		assert_eq!(path, Path::new("data").join("vocabularDump.json"));
		assert_eq!(get_filename(&path).unwrap(), "vocabularDump");
	}

	#[test]
	fn test_list_files_filters_extension() {
		let dir = tempfile::TempDir::new().unwrap();
		fs::write(dir.path().join("b.json"), "[]").unwrap();
		fs::write(dir.path().join("a.json"), "[]").unwrap();
		fs::write(dir.path().join("notes.txt"), "").unwrap();
		fs::create_dir(dir.path().join("nested.json")).unwrap();

		let files = list_files(dir.path(), SNAPSHOT_EXTENSION).unwrap();
		assert_eq!(files, vec!["a.json".to_owned(), "b.json".to_owned()]);
	}
}
