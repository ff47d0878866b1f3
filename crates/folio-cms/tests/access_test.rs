//! Tests for collection-level access through the operations

use folio_cms::prelude::*;
use folio_db::{DatabaseAdapter, MemoryAdapter};
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use std::sync::Arc;

fn data(value: Value) -> Document {
	value.as_object().cloned().unwrap()
}

#[fixture]
fn db() -> Arc<MemoryAdapter> {
	Arc::new(MemoryAdapter::new())
}

fn folio_with(db: Arc<MemoryAdapter>) -> Folio {
	Folio::builder()
		.collection(
			CollectionConfig::new("notes")
				.field(Field::text("body"))
				.read_access(Access::from_fn(|_args: AccessArgs| async {
					Err(Error::Database("acl store unavailable".into()))
				})),
		)
		.database_arc(db)
		.build()
		.unwrap()
}

#[rstest]
#[tokio::test]
async fn test_failing_read_predicate_forbids_find_by_id(db: Arc<MemoryAdapter>) {
	// Arrange
	let stored = db.create("notes", data(json!({"body": "hi"})), None).await.unwrap();
	let folio = folio_with(db);
	let req = Request::builder(&folio).build();

	// Act
	let result = folio
		.find_by_id(&req, "notes", FindByIdArgs::new(stored["id"].clone()))
		.await;

	// Assert
	assert!(matches!(result, Err(Error::Forbidden(_))), "{result:?}");
}

#[rstest]
#[tokio::test]
async fn test_failing_read_predicate_with_disabled_errors_finds_nothing(db: Arc<MemoryAdapter>) {
	let stored = db.create("notes", data(json!({"body": "hi"})), None).await.unwrap();
	let folio = folio_with(db);
	let req = Request::builder(&folio).build();

	let result = folio
		.find_by_id(
			&req,
			"notes",
			FindByIdArgs::new(stored["id"].clone()).with_disable_errors(true),
		)
		.await
		.unwrap();
	assert_eq!(result, None);
}

#[rstest]
#[tokio::test]
async fn test_failing_read_predicate_forbids_find(db: Arc<MemoryAdapter>) {
	db.create("notes", data(json!({"body": "hi"})), None).await.unwrap();
	let folio = folio_with(db);
	let req = Request::builder(&folio).build();

	let result = folio.find(&req, "notes", FindOptions::new()).await;
	assert!(matches!(result, Err(Error::Forbidden(_))));
}
