//! Tests for deletion and the cleanup it triggers

use folio_cms::prelude::*;
use folio_conf::Settings;
use folio_db::{DatabaseAdapter, FindArgs, MemoryAdapter};
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;

const PREFERENCES: &str = "folio-preferences";

fn data(value: Value) -> Document {
	value.as_object().cloned().unwrap()
}

struct Harness {
	folio: Folio,
	db: Arc<MemoryAdapter>,
	dir: TempDir,
}

#[fixture]
fn harness() -> Harness {
	let dir = TempDir::new().unwrap();
	let db = Arc::new(MemoryAdapter::new());
	let folio = Folio::builder()
		.settings(Settings {
			config_dir: dir.path().to_path_buf(),
			..Default::default()
		})
		.collection(CollectionConfig::new("users").auth(AuthConfig::default()))
		.collection(
			CollectionConfig::new("media")
				.upload(UploadConfig::new("media"))
				.field(Field::text("alt"))
				.create_access(Access::allow())
				.read_access(Access::allow())
				.delete_access(Access::allow()),
		)
		.collection(
			CollectionConfig::new("posts")
				.field(Field::text("title"))
				.create_access(Access::allow())
				.read_access(Access::allow())
				.delete_access(Access::from_fn(|args: AccessArgs| async move {
					Ok(match args.req.user() {
						Some(_) => AccessResult::Where(Where::field("locked").not_equals(true)),
						None => AccessResult::Bool(false),
					})
				})),
		)
		.database_arc(db.clone())
		.build()
		.unwrap();
	Harness { folio, db, dir }
}

async fn seed_preferences(db: &MemoryAdapter) {
	let records = [
		json!({"key": "collection-users-42", "user": 7, "userCollection": "users"}),
		json!({"key": "nav", "user": 42, "userCollection": "users"}),
		json!({"key": "nav", "user": 42, "userCollection": "admins"}),
		json!({"key": "nav", "user": 7, "userCollection": "users"}),
	];
	for record in records {
		db.create(PREFERENCES, data(record), None).await.unwrap();
	}
}

fn remaining_preferences(db: &MemoryAdapter) -> Vec<(String, Value)> {
	db.committed_docs(PREFERENCES)
		.into_iter()
		.map(|doc| {
			let key = doc["key"].as_str().unwrap_or_default().to_string();
			(format!("{key}/{}", doc["userCollection"].as_str().unwrap_or_default()), doc["user"].clone())
		})
		.collect()
}

#[rstest]
#[tokio::test]
async fn test_deleting_a_user_removes_their_preferences(harness: Harness) {
	// Arrange
	let Harness { folio, db, .. } = harness;
	db.create("users", data(json!({"id": 42, "email": "gone@example.com"})), None)
		.await
		.unwrap();
	seed_preferences(&db).await;
	let req = Request::builder(&folio).build();

	// Act
	let deleted = folio
		.delete_by_id(&req, "users", 42, DeleteArgs::new().with_override_access(true))
		.await
		.unwrap();

	// Assert
	assert_eq!(deleted["id"], json!(42));
	assert!(db.committed_docs("users").is_empty());
	assert_eq!(
		remaining_preferences(&db),
		vec![
			("nav/admins".to_string(), json!(42)),
			("nav/users".to_string(), json!(7)),
		]
	);
}

#[rstest]
#[tokio::test]
async fn test_bulk_delete_respects_access_constraint(harness: Harness) {
	let Harness { folio, db, .. } = harness;
	for (title, locked) in [("a", false), ("b", true), ("c", false)] {
		db.create("posts", data(json!({"title": title, "locked": locked})), None)
			.await
			.unwrap();
	}
	let req = Request::builder(&folio).user(User::new("u1", "users")).build();

	let result = folio
		.delete(
			&req,
			"posts",
			DeleteArgs::new().with_where(Where::field("title").in_list(vec![json!("a"), json!("b")])),
		)
		.await
		.unwrap();

	assert_eq!(result.docs.len(), 1);
	assert_eq!(result.docs[0]["title"], json!("a"));
	assert!(result.errors.is_empty());
	let left: Vec<Value> = db
		.committed_docs("posts")
		.into_iter()
		.map(|doc| doc["title"].clone())
		.collect();
	assert_eq!(left, vec![json!("b"), json!("c")]);
}

#[rstest]
#[tokio::test]
async fn test_bulk_delete_requires_where(harness: Harness) {
	let req = Request::builder(&harness.folio).build();
	let result = harness
		.folio
		.delete(&req, "posts", DeleteArgs::new().with_override_access(true))
		.await;
	assert!(matches!(result, Err(Error::Api(_))));
}

#[rstest]
#[tokio::test]
async fn test_delete_of_hidden_document_is_forbidden(harness: Harness) {
	let Harness { folio, db, .. } = harness;
	let locked = db
		.create("posts", data(json!({"title": "keep", "locked": true})), None)
		.await
		.unwrap();
	let req = Request::builder(&folio).user(User::new("u1", "users")).build();

	let result = folio
		.delete_by_id(&req, "posts", locked["id"].clone(), DeleteArgs::new())
		.await;
	assert!(matches!(result, Err(Error::Forbidden(_))));

	let anonymous = Request::builder(&folio).build();
	let result = folio
		.delete_by_id(&anonymous, "posts", "missing", DeleteArgs::new().with_override_access(true))
		.await;
	assert!(matches!(result, Err(Error::NotFound(_))));
	assert_eq!(db.committed_docs("posts").len(), 1);
}

#[rstest]
#[tokio::test]
async fn test_deleting_an_upload_removes_its_files(harness: Harness) {
	let Harness { folio, dir, .. } = harness;
	let req = Request::builder(&folio)
		.file(UploadedFile::new("photo.png", "image/png", vec![1, 2, 3]))
		.build();
	let media = folio
		.create(&req, "media", CreateArgs::new(data(json!({"alt": "a photo"}))))
		.await
		.unwrap();
	let path = dir.path().join("media").join(media["filename"].as_str().unwrap());
	assert!(path.exists());
	assert_eq!(media["filesize"], json!(3));

	let plain = Request::builder(&folio).build();
	folio
		.delete_by_id(&plain, "media", media["id"].clone(), DeleteArgs::new())
		.await
		.unwrap();
	assert!(!path.exists());

	let listed = folio
		.db()
		.find("media", FindArgs::new())
		.await
		.unwrap();
	assert_eq!(listed.total_docs, 0);
}
