//! Name utilities for node ids, socket names and labels
use thiserror::Error;

/// The ways a name may be invalid
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
	/// This name is empty
	#[error("name cannot be empty")]
	Empty,

	/// This name is entirely whitespace
	#[error("name cannot be entirely whitespace")]
	IsWhitespace,

	/// This name has leading or trailing whitespace
	#[error("name cannot have leading or trailing whitespace")]
	TrimWhitespace,

	/// This name contains a character that cannot appear in a file name
	#[error("name cannot contain `{0}`")]
	BadCharacter(char),
}

/// Characters we never allow, since names end up in paths.
const FORBIDDEN: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', '\0'];

/// Check the given name for errors.
pub fn check_name(name: &str) -> Result<(), NameError> {
	if name.is_empty() {
		return Err(NameError::Empty);
	}

	let trimmed = name.trim();
	if trimmed.is_empty() {
		return Err(NameError::IsWhitespace);
	}

	if trimmed.len() != name.len() {
		return Err(NameError::TrimWhitespace);
	}

	if let Some(c) = name.chars().find(|c| FORBIDDEN.contains(c)) {
		return Err(NameError::BadCharacter(c));
	}

	return Ok(());
}
