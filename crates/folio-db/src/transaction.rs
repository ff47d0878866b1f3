//! Transaction handles

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle of an open transaction
///
/// Shared across nested operations of one request so their writes commit or
/// roll back together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
	/// A fresh random id
	pub fn generate() -> Self {
		Self(uuid::Uuid::new_v4().to_string())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<String> for TransactionId {
	fn from(value: String) -> Self {
		Self(value)
	}
}

impl From<&str> for TransactionId {
	fn from(value: &str) -> Self {
		Self(value.to_string())
	}
}

impl fmt::Display for TransactionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}
