//! External sources of raw training text.
//!
//! The engine only needs two capabilities from a message source: turning a
//! user-facing identifier into a canonical one, and fetching every message a
//! user wrote in a dialogue. Messages are treated as opaque text and go
//! through the tokenizer like any other training input.

use crate::error::Result;

/// A source of messages written by a given user.
///
/// Implementations report their own failures as `MarkovError::Provider`.
pub trait TextProvider {
	/// Resolves an identifier (screen name, alias, numeric id...) to the
	/// canonical user id.
	fn resolve_identifier(&self, id: &str) -> Result<String>;

	/// Returns every message `user_id` wrote in `dialogue_id`.
	fn fetch_all_messages(&self, dialogue_id: &str, user_id: &str) -> Result<Vec<String>>;
}
