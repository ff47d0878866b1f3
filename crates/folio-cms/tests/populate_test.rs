//! Tests for relationship population

use async_trait::async_trait;
use folio_cms::prelude::*;
use folio_db::{
	DatabaseAdapter, DbResult, FindArgs, GlobalArgs, MemoryAdapter, PaginatedDocs, TransactionId,
};
use rstest::rstest;
use serde_json::{Value, json};
use std::sync::Arc;

/// Counts single-document lookups per collection
#[derive(Default)]
struct CountingAdapter {
	inner: MemoryAdapter,
	lookups: parking_lot::Mutex<Vec<String>>,
}

impl CountingAdapter {
	fn lookups_of(&self, collection: &str) -> usize {
		self.lookups.lock().iter().filter(|c| *c == collection).count()
	}
}

#[async_trait]
impl DatabaseAdapter for CountingAdapter {
	async fn begin_transaction(&self) -> DbResult<Option<TransactionId>> {
		self.inner.begin_transaction().await
	}

	async fn commit_transaction(&self, transaction: &TransactionId) -> DbResult<()> {
		self.inner.commit_transaction(transaction).await
	}

	async fn rollback_transaction(&self, transaction: &TransactionId) -> DbResult<()> {
		self.inner.rollback_transaction(transaction).await
	}

	async fn find(&self, collection: &str, args: FindArgs) -> DbResult<PaginatedDocs> {
		self.inner.find(collection, args).await
	}

	async fn find_one(
		&self,
		collection: &str,
		where_: &Where,
		transaction: Option<&TransactionId>,
	) -> DbResult<Option<Document>> {
		self.lookups.lock().push(collection.to_string());
		self.inner.find_one(collection, where_, transaction).await
	}

	async fn create(
		&self,
		collection: &str,
		data: Document,
		transaction: Option<&TransactionId>,
	) -> DbResult<Document> {
		self.inner.create(collection, data, transaction).await
	}

	async fn update_one(
		&self,
		collection: &str,
		id: &Value,
		data: Document,
		transaction: Option<&TransactionId>,
	) -> DbResult<Document> {
		self.inner.update_one(collection, id, data, transaction).await
	}

	async fn delete_one(
		&self,
		collection: &str,
		id: &Value,
		transaction: Option<&TransactionId>,
	) -> DbResult<Document> {
		self.inner.delete_one(collection, id, transaction).await
	}

	async fn delete_many(
		&self,
		collection: &str,
		where_: &Where,
		transaction: Option<&TransactionId>,
	) -> DbResult<usize> {
		self.inner.delete_many(collection, where_, transaction).await
	}

	async fn find_global(&self, slug: &str, args: GlobalArgs) -> DbResult<Option<Document>> {
		self.inner.find_global(slug, args).await
	}

	async fn upsert_global(
		&self,
		slug: &str,
		data: Document,
		transaction: Option<&TransactionId>,
	) -> DbResult<Document> {
		self.inner.upsert_global(slug, data, transaction).await
	}
}

fn data(value: Value) -> Document {
	value.as_object().cloned().unwrap()
}

fn setup() -> (Folio, Arc<CountingAdapter>) {
	let db = Arc::new(CountingAdapter::default());
	let folio = Folio::builder()
		.collection(
			CollectionConfig::new("users")
				.field(Field::text("name"))
				.create_access(Access::allow())
				.read_access(Access::allow()),
		)
		.collection(
			CollectionConfig::new("posts")
				.fields([
					Field::text("title"),
					Field::relationship("author", "users"),
					Field::relationship("related", "posts"),
					Field::rich_text("body"),
				])
				.create_access(Access::allow())
				.read_access(Access::allow())
				.update_access(Access::allow()),
		)
		.database_arc(db.clone())
		.build()
		.unwrap();
	(folio, db)
}

#[rstest]
#[tokio::test]
async fn test_shared_reference_is_loaded_once_per_request() {
	// Arrange
	let (folio, db) = setup();
	let req = Request::builder(&folio).build();
	let author = folio
		.create(&req, "users", CreateArgs::new(data(json!({"name": "Ann"}))))
		.await
		.unwrap();
	for title in ["one", "two", "three"] {
		folio
			.create(
				&req,
				"posts",
				CreateArgs::new(data(json!({"title": title, "author": author["id"]}))).with_depth(0),
			)
			.await
			.unwrap();
	}

	// Act
	let read_req = Request::builder(&folio).build();
	let before = db.lookups_of("users");
	let posts = folio
		.find(&read_req, "posts", FindOptions::new().with_depth(1))
		.await
		.unwrap();

	// Assert
	assert_eq!(posts.docs.len(), 3);
	for post in &posts.docs {
		assert_eq!(post["author"]["name"], json!("Ann"));
	}
	assert_eq!(db.lookups_of("users") - before, 1);
}

#[rstest]
#[tokio::test]
async fn test_separate_requests_do_not_share_loads() {
	let (folio, db) = setup();
	let req = Request::builder(&folio).build();
	let author = folio
		.create(&req, "users", CreateArgs::new(data(json!({"name": "Ann"}))))
		.await
		.unwrap();
	let post = folio
		.create(
			&req,
			"posts",
			CreateArgs::new(data(json!({"title": "one", "author": author["id"]}))).with_depth(0),
		)
		.await
		.unwrap();

	let before = db.lookups_of("users");
	for _ in 0..2 {
		let fresh = Request::builder(&folio).build();
		folio
			.find_by_id(&fresh, "posts", FindByIdArgs::new(post["id"].clone()).with_depth(1))
			.await
			.unwrap();
	}
	assert_eq!(db.lookups_of("users") - before, 2);
}

#[rstest]
#[case(0, 0)]
#[case(1, 1)]
#[case(2, 2)]
#[tokio::test]
async fn test_self_reference_stops_at_depth(#[case] depth: u32, #[case] hops: usize) {
	let (folio, _db) = setup();
	let req = Request::builder(&folio).build();
	let post = folio
		.create(&req, "posts", CreateArgs::new(data(json!({"title": "loop"}))))
		.await
		.unwrap();
	let id = post["id"].clone();
	folio
		.update_by_id(&req, "posts", UpdateArgs::new(id.clone(), data(json!({"related": id}))))
		.await
		.unwrap();

	let read = folio
		.find_by_id(
			&Request::builder(&folio).build(),
			"posts",
			FindByIdArgs::new(id.clone()).with_depth(depth),
		)
		.await
		.unwrap()
		.unwrap();

	let mut node = &read["related"];
	for _ in 0..hops {
		assert_eq!(node["title"], json!("loop"));
		node = &node["related"];
	}
	assert_eq!(node, &id);
}

#[rstest]
#[tokio::test]
async fn test_missing_reference_resolves_to_null() {
	let (folio, _db) = setup();
	let req = Request::builder(&folio).build();
	let post = folio
		.create(
			&req,
			"posts",
			CreateArgs::new(data(json!({"title": "orphan", "author": "gone"}))).with_depth(1),
		)
		.await
		.unwrap();
	assert_eq!(post["author"], Value::Null);
	assert!(post.contains_key("author"));
}

#[rstest]
#[case(0, false)]
#[case(1, true)]
#[tokio::test]
async fn test_rich_text_references_are_populated(#[case] depth: u32, #[case] expanded: bool) {
	// Arrange
	let (folio, db) = setup();
	let req = Request::builder(&folio).build();
	let author = folio
		.create(&req, "users", CreateArgs::new(data(json!({"name": "Ann"}))))
		.await
		.unwrap();
	let uid = author["id"].clone();
	let post = folio
		.create(
			&req,
			"posts",
			CreateArgs::new(data(json!({
				"title": "rich",
				"body": [
					{"type": "relationship", "relationTo": "users", "value": {"id": uid}},
					{"type": "paragraph", "children": [
						{"text": "see "},
						{"type": "relationship", "relationTo": "users", "value": {"id": uid}},
						{"type": "relationship", "relationTo": "users", "value": {"id": "gone"}},
					]},
				],
			})))
			.with_depth(0),
		)
		.await
		.unwrap();

	// Act
	let before = db.lookups_of("users");
	let read = folio
		.find_by_id(
			&Request::builder(&folio).build(),
			"posts",
			FindByIdArgs::new(post["id"].clone()).with_depth(depth),
		)
		.await
		.unwrap()
		.unwrap();

	// Assert
	let body = &read["body"];
	let nested = &body[1]["children"];
	assert_eq!(nested[0]["text"], json!("see "));
	if expanded {
		assert_eq!(body[0]["value"]["name"], json!("Ann"));
		assert_eq!(nested[1]["value"]["name"], json!("Ann"));
		assert_eq!(nested[2]["value"], Value::Null);
		assert_eq!(db.lookups_of("users") - before, 2);
	} else {
		assert_eq!(body[0]["value"], json!({"id": uid}));
		assert_eq!(nested[1]["value"], json!({"id": uid}));
		assert_eq!(nested[2]["value"], json!({"id": "gone"}));
		assert_eq!(db.lookups_of("users"), before);
	}
}
