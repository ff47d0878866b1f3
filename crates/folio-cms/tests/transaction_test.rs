//! Tests for transaction sharing between an operation and its hooks

use folio_cms::prelude::*;
use folio_db::{DatabaseAdapter, MemoryAdapter};
use rstest::rstest;
use serde_json::{Value, json};
use std::sync::Arc;

fn data(value: Value) -> Document {
	value.as_object().cloned().unwrap()
}

/// `posts` whose beforeChange hook writes an audit row through the request's
/// transaction and then fails when the title says so
fn setup() -> (Folio, Arc<MemoryAdapter>) {
	let db = Arc::new(MemoryAdapter::new());
	let audit_db = db.clone();
	let folio = Folio::builder()
		.collection(
			CollectionConfig::new("posts")
				.field(Field::text("title"))
				.create_access(Access::allow())
				.read_access(Access::allow())
				.before_change(move |args: BeforeChangeArgs| {
					let db = audit_db.clone();
					async move {
						let entry = data(json!({"title": args.data.get("title").cloned()}));
						db.create("audit", entry, args.req.transaction().as_ref()).await?;
						if args.data.get("title") == Some(&json!("reject")) {
							return Err(Error::hook("beforeChange", "rejected by policy"));
						}
						Ok(None)
					}
				}),
		)
		.database_arc(db.clone())
		.build()
		.unwrap();
	(folio, db)
}

#[rstest]
#[tokio::test]
async fn test_hook_failure_rolls_back_nested_writes() {
	// Arrange
	let (folio, db) = setup();
	let req = Request::builder(&folio).build();

	// Act
	let result = folio
		.create(&req, "posts", CreateArgs::new(data(json!({"title": "reject"}))))
		.await;

	// Assert
	assert!(matches!(result, Err(Error::Hook { .. })));
	assert!(db.committed_docs("posts").is_empty());
	assert!(db.committed_docs("audit").is_empty());
	assert_eq!(db.open_transactions(), 0);
	assert!(req.transaction().is_none());
}

#[rstest]
#[tokio::test]
async fn test_success_commits_nested_writes_together() {
	let (folio, db) = setup();
	let req = Request::builder(&folio).build();

	folio
		.create(&req, "posts", CreateArgs::new(data(json!({"title": "accept"}))))
		.await
		.unwrap();

	assert_eq!(db.committed_docs("posts").len(), 1);
	assert_eq!(db.committed_docs("audit").len(), 1);
	assert_eq!(db.open_transactions(), 0);
}

#[rstest]
#[tokio::test]
async fn test_failure_after_success_keeps_earlier_commit() {
	let (folio, db) = setup();
	let req = Request::builder(&folio).build();

	folio
		.create(&req, "posts", CreateArgs::new(data(json!({"title": "first"}))))
		.await
		.unwrap();
	folio
		.create(&req, "posts", CreateArgs::new(data(json!({"title": "reject"}))))
		.await
		.unwrap_err();

	let titles: Vec<Value> = db
		.committed_docs("audit")
		.into_iter()
		.filter_map(|mut doc| doc.remove("title"))
		.collect();
	assert_eq!(titles, vec![json!("first")]);
}

#[rstest]
#[tokio::test]
async fn test_adapter_without_transactions_still_runs() {
	let folio = Folio::builder()
		.collection(
			CollectionConfig::new("posts")
				.field(Field::text("title"))
				.create_access(Access::allow())
				.read_access(Access::allow()),
		)
		.database(MemoryAdapter::without_transactions())
		.build()
		.unwrap();
	let req = Request::builder(&folio).build();

	let doc = folio
		.create(&req, "posts", CreateArgs::new(data(json!({"title": "plain"}))))
		.await
		.unwrap();
	assert_eq!(doc["title"], json!("plain"));
}
