//! Database adapter errors

use crate::transaction::TransactionId;

/// Errors raised by a [`DatabaseAdapter`](crate::DatabaseAdapter)
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Document '{id}' not found in '{collection}'")]
	NotFound { collection: String, id: String },

	#[error("Transaction '{0}' is not active")]
	UnknownTransaction(TransactionId),

	#[error("Commit failed: {0}")]
	Commit(String),

	#[error("Rollback failed: {0}")]
	Rollback(String),

	#[error("Backend error: {0}")]
	Backend(String),
}

/// Result type for adapter calls
pub type DbResult<T> = Result<T, DbError>;

impl From<DbError> for folio_core::Error {
	fn from(err: DbError) -> Self {
		match err {
			DbError::NotFound { .. } => folio_core::Error::NotFound(err.to_string()),
			DbError::UnknownTransaction(_) | DbError::Commit(_) | DbError::Rollback(_) => {
				folio_core::Error::Transaction(err.to_string())
			}
			DbError::Backend(msg) => folio_core::Error::Database(msg),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_transaction_errors_map_to_transaction_kind() {
		let err: folio_core::Error = DbError::Commit("disk full".into()).into();
		assert!(matches!(err, folio_core::Error::Transaction(_)));

		let err: folio_core::Error = DbError::NotFound {
			collection: "posts".into(),
			id: "1".into(),
		}
		.into();
		assert!(matches!(err, folio_core::Error::NotFound(_)));
	}
}
