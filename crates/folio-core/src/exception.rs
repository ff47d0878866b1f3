//! Error taxonomy shared by every Folio crate
//!
//! Field validation failures are collected into [`ValidationErrors`] and
//! reported together. Every other kind aborts the running operation; the
//! operation rolls back its transaction before handing the error to the caller.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
	/// Dot-joined path of the failing field (`items.0.title`)
	pub path: String,
	/// Human readable failure message
	pub message: String,
}

impl FieldError {
	/// Create a new field error
	pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			message: message.into(),
		}
	}
}

/// Path-indexed set of field validation failures
///
/// # Examples
///
/// ```
/// use folio_core::exception::ValidationErrors;
///
/// let mut errors = ValidationErrors::new();
/// errors.push("title", "This field is required.");
/// errors.push("items", "This field requires at least 2 rows.");
///
/// assert_eq!(errors.len(), 2);
/// assert!(errors.contains_path("items"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
	errors: Vec<FieldError>,
}

impl ValidationErrors {
	/// Create an empty error set
	pub fn new() -> Self {
		Self::default()
	}

	/// Record a failure for `path`
	pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
		self.errors.push(FieldError::new(path, message));
	}

	/// Append every error from `other`
	pub fn extend(&mut self, other: ValidationErrors) {
		self.errors.extend(other.errors);
	}

	pub fn is_empty(&self) -> bool {
		self.errors.is_empty()
	}

	pub fn len(&self) -> usize {
		self.errors.len()
	}

	/// Whether any failure was recorded for exactly `path`
	pub fn contains_path(&self, path: &str) -> bool {
		self.errors.iter().any(|e| e.path == path)
	}

	/// Messages recorded for `path`
	pub fn messages_for<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a str> + 'a {
		self.errors
			.iter()
			.filter(move |e| e.path == path)
			.map(|e| e.message.as_str())
	}

	pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
		self.errors.iter()
	}

	/// Turn a non-empty set into an error, an empty one into `Ok(())`
	pub fn into_result(self) -> Result<()> {
		if self.is_empty() {
			Ok(())
		} else {
			Err(Error::Validation(self))
		}
	}
}

impl fmt::Display for ValidationErrors {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let joined = self
			.errors
			.iter()
			.map(|e| format!("{}: {}", e.path, e.message))
			.collect::<Vec<_>>()
			.join("; ");
		write!(f, "{joined}")
	}
}

impl IntoIterator for ValidationErrors {
	type Item = FieldError;
	type IntoIter = std::vec::IntoIter<FieldError>;

	fn into_iter(self) -> Self::IntoIter {
		self.errors.into_iter()
	}
}

/// Folio errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// One or more fields failed validation
	#[error("The following field is invalid: {0}")]
	Validation(ValidationErrors),

	/// Access was denied, or an access predicate failed
	#[error("Forbidden: {0}")]
	Forbidden(String),

	/// The request carries no authenticated user where one is required
	#[error("Unauthorized: {0}")]
	Unauthorized(String),

	/// Referenced entity is absent
	#[error("Not found: {0}")]
	NotFound(String),

	/// Commit or rollback failure
	#[error("Transaction error: {0}")]
	Transaction(String),

	/// Upload write or deletion failure
	#[error("{message}")]
	FileIo {
		/// Localized message shown to the caller
		message: String,
		#[source]
		source: std::io::Error,
	},

	/// A partial (query constraint) access result was used where only a
	/// boolean decision is meaningful
	#[error("Access result is a query constraint where a boolean was required: {0}")]
	InvalidAccessResult(String),

	/// Database adapter failure
	#[error("Database error: {0}")]
	Database(String),

	/// Misconfiguration or an invalid call, such as an unknown collection slug
	#[error("{0}")]
	Api(String),

	/// A user-supplied hook aborted the operation
	#[error("Hook '{phase}' failed: {message}")]
	Hook {
		/// Lifecycle phase the hook ran in
		phase: String,
		message: String,
	},

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl Error {
	/// Convenience constructor for hook failures
	pub fn hook(phase: impl Into<String>, message: impl Into<String>) -> Self {
		Self::Hook {
			phase: phase.into(),
			message: message.into(),
		}
	}

	/// HTTP status a transport should answer with for this error
	///
	/// # Examples
	///
	/// ```
	/// use folio_core::exception::Error;
	/// use http::StatusCode;
	///
	/// assert_eq!(Error::Forbidden("read".into()).status_code(), StatusCode::FORBIDDEN);
	/// assert_eq!(Error::NotFound("posts/1".into()).status_code(), StatusCode::NOT_FOUND);
	/// ```
	pub fn status_code(&self) -> StatusCode {
		match self {
			Error::Validation(_) => StatusCode::BAD_REQUEST,
			Error::Forbidden(_) => StatusCode::FORBIDDEN,
			Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
			Error::NotFound(_) => StatusCode::NOT_FOUND,
			Error::Api(_) => StatusCode::BAD_REQUEST,
			Error::Transaction(_)
			| Error::FileIo { .. }
			| Error::InvalidAccessResult(_)
			| Error::Database(_)
			| Error::Hook { .. }
			| Error::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Validation errors carried by this error, if any
	pub fn validation_errors(&self) -> Option<&ValidationErrors> {
		match self {
			Error::Validation(errors) => Some(errors),
			_ => None,
		}
	}
}

/// Result type for Folio operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_validation_errors_collect_all_messages() {
		let mut errors = ValidationErrors::new();
		errors.push("title", "This field is required.");
		errors.push("items", "too few");
		errors.push("items", "bad row");

		assert_eq!(errors.messages_for("items").count(), 2);
		let err = errors.into_result().unwrap_err();
		let rendered = err.to_string();
		assert!(rendered.contains("title: This field is required."));
		assert!(rendered.contains("items: bad row"));
	}

	#[rstest]
	fn test_empty_validation_errors_is_ok() {
		assert!(ValidationErrors::new().into_result().is_ok());
	}

	#[rstest]
	#[case(Error::Validation(ValidationErrors::new()), StatusCode::BAD_REQUEST)]
	#[case(Error::Unauthorized("no user".into()), StatusCode::UNAUTHORIZED)]
	#[case(Error::Transaction("commit".into()), StatusCode::INTERNAL_SERVER_ERROR)]
	#[case(Error::hook("beforeChange", "boom"), StatusCode::INTERNAL_SERVER_ERROR)]
	fn test_status_codes(#[case] error: Error, #[case] expected: StatusCode) {
		assert_eq!(error.status_code(), expected);
	}

	#[rstest]
	fn test_file_io_keeps_source() {
		let err = Error::FileIo {
			message: "There was an error deleting file.".into(),
			source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
		};
		assert_eq!(err.to_string(), "There was an error deleting file.");
		assert!(std::error::Error::source(&err).is_some());
	}
}
