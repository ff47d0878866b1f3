//! Request-scoped transactions
//!
//! The outermost operation of a request opens the transaction and is the
//! only one that commits or rolls it back. Nested operations find the
//! transaction already on the request and run inside it.

use crate::app::Folio;
use crate::request::Request;
use folio_core::{Error, Result};
use std::future::Future;

/// Open a transaction unless the request already carries one
///
/// Returns whether the caller opened it and therefore must commit it.
pub async fn init_transaction(folio: &Folio, req: &Request) -> Result<bool> {
	if req.transaction().is_some() {
		return Ok(false);
	}
	match folio.db().begin_transaction().await? {
		Some(transaction) => {
			tracing::debug!(transaction = %transaction, "opened request transaction");
			req.set_transaction(Some(transaction));
			Ok(true)
		}
		None => Ok(false),
	}
}

/// Commit the request's transaction
///
/// A failed commit is rolled back and reported as a transaction error.
pub async fn commit_transaction(folio: &Folio, req: &Request) -> Result<()> {
	let Some(transaction) = req.take_transaction() else {
		return Ok(());
	};
	if let Err(err) = folio.db().commit_transaction(&transaction).await {
		tracing::error!(transaction = %transaction, error = %err, "commit failed");
		if let Err(rollback) = folio.db().rollback_transaction(&transaction).await {
			tracing::error!(transaction = %transaction, error = %rollback, "rollback after failed commit failed");
		}
		return Err(Error::Transaction(err.to_string()));
	}
	Ok(())
}

/// Roll back the request's transaction, if any
pub async fn kill_transaction(folio: &Folio, req: &Request) {
	let Some(transaction) = req.take_transaction() else {
		return;
	};
	match folio.db().rollback_transaction(&transaction).await {
		Ok(()) => tracing::debug!(transaction = %transaction, "rolled back request transaction"),
		Err(err) => {
			tracing::error!(transaction = %transaction, error = %err, "rollback failed");
		}
	}
}

/// Run `operation` inside the request's transaction
///
/// If this call opened the transaction it commits on success and rolls
/// back on every error; otherwise the transaction is left to its opener.
pub(crate) async fn with_transaction<T, F>(folio: &Folio, req: &Request, operation: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	let should_commit = init_transaction(folio, req).await?;
	match operation.await {
		Ok(value) => {
			if should_commit {
				commit_transaction(folio, req).await?;
			}
			Ok(value)
		}
		Err(err) => {
			if should_commit {
				kill_transaction(folio, req).await;
			}
			Err(err)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use folio_db::{DatabaseAdapter, FindArgs, MemoryAdapter};
	use rstest::rstest;
	use serde_json::json;
	use std::sync::Arc;

	fn folio() -> (Folio, Arc<MemoryAdapter>) {
		let db = Arc::new(MemoryAdapter::new());
		let folio = Folio::builder().database_arc(db.clone()).build().unwrap();
		(folio, db)
	}

	#[rstest]
	#[tokio::test]
	async fn test_nested_call_reuses_and_does_not_commit() {
		let (folio, db) = folio();
		let req = Request::builder(&folio).build();

		assert!(init_transaction(&folio, &req).await.unwrap());
		let opened = req.transaction();
		assert!(!init_transaction(&folio, &req).await.unwrap());
		assert_eq!(req.transaction(), opened);

		commit_transaction(&folio, &req).await.unwrap();
		assert!(req.transaction().is_none());
		assert_eq!(db.open_transactions(), 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_error_rolls_back_writes() {
		let (folio, db) = folio();
		let req = Request::builder(&folio).build();

		let result: Result<()> = with_transaction(&folio, &req, async {
			let tx = req.transaction();
			let data = json!({"title": "partial"}).as_object().cloned().unwrap();
			folio.db().create("posts", data, tx.as_ref()).await?;
			Err(Error::hook("beforeChange", "boom"))
		})
		.await;

		assert!(result.is_err());
		assert_eq!(db.find("posts", FindArgs::new()).await.unwrap().total_docs, 0);
		assert_eq!(db.open_transactions(), 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_without_transaction_support() {
		let folio = Folio::builder()
			.database(MemoryAdapter::without_transactions())
			.build()
			.unwrap();
		let req = Request::builder(&folio).build();
		assert!(!init_transaction(&folio, &req).await.unwrap());
		commit_transaction(&folio, &req).await.unwrap();
	}
}
