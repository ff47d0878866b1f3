//! Versions and drafts
//!
//! Every save of a versioned entity is also recorded in `_<slug>_versions`.
//! Only the newest version of a parent carries `latest: true`.

use crate::app::Folio;
use crate::request::Request;
use chrono::{DateTime, SecondsFormat, Utc};
use folio_core::types::ID_KEY;
use folio_core::{Document, Result, Where};
use folio_db::{FindArgs, Sort};
use serde_json::Value;

pub(crate) const STATUS_KEY: &str = "_status";
pub(crate) const DRAFT: &str = "draft";
pub(crate) const PUBLISHED: &str = "published";

/// Storage collection holding the versions of `slug`
pub fn versions_collection(slug: &str) -> String {
	format!("_{slug}_versions")
}

/// Current time in the stored timestamp format
pub(crate) fn now() -> String {
	Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
	value
		.and_then(Value::as_str)
		.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
		.map(|dt| dt.with_timezone(&Utc))
}

/// Record `doc` as the newest version of `parent`
pub(crate) async fn save_version(
	folio: &Folio,
	req: &Request,
	slug: &str,
	parent: &Value,
	doc: &Document,
	draft: bool,
) -> Result<Document> {
	let collection = versions_collection(slug);
	let transaction = req.transaction();
	let db = folio.db();

	let previous = db
		.find(
			&collection,
			FindArgs::new()
				.with_where(Some(
					Where::field("parent")
						.equals(parent.clone())
						.and(Where::field("latest").equals(true)),
				))
				.with_transaction(transaction.clone()),
		)
		.await?;
	for old in previous.docs {
		if let Some(id) = old.get(ID_KEY) {
			let mut unset = Document::new();
			unset.insert("latest".to_string(), Value::Bool(false));
			db.update_one(&collection, id, unset, transaction.as_ref()).await?;
		}
	}

	let mut version = doc.clone();
	version.remove(ID_KEY);
	version.insert(
		STATUS_KEY.to_string(),
		Value::String(if draft { DRAFT } else { PUBLISHED }.to_string()),
	);
	let timestamp = Value::String(now());
	let mut record = Document::new();
	record.insert("parent".to_string(), parent.clone());
	record.insert("version".to_string(), Value::Object(version));
	record.insert("latest".to_string(), Value::Bool(true));
	record.insert("createdAt".to_string(), timestamp.clone());
	record.insert("updatedAt".to_string(), timestamp);
	tracing::debug!(collection = %collection, draft, "saving version");
	Ok(db.create(&collection, record, transaction.as_ref()).await?)
}

/// Replace `doc` with the newest draft of `parent`, if that draft is newer
pub(crate) async fn replace_with_draft_if_available(
	folio: &Folio,
	req: &Request,
	slug: &str,
	parent: &Value,
	doc: Document,
) -> Result<Document> {
	let drafts = folio
		.db()
		.find(
			&versions_collection(slug),
			FindArgs::new()
				.with_where(Some(
					Where::field("parent")
						.equals(parent.clone())
						.and(Where::field("version._status").equals(DRAFT)),
				))
				.with_sort(Some(Sort::parse("-updatedAt")))
				.with_limit(Some(1))
				.with_transaction(req.transaction()),
		)
		.await?;
	let Some(newest) = drafts.docs.into_iter().next() else {
		return Ok(doc);
	};

	let draft_at = parse_timestamp(newest.get("updatedAt"));
	let doc_at = parse_timestamp(doc.get("updatedAt"));
	let newer = match (draft_at, doc_at) {
		(Some(draft), Some(current)) => draft > current,
		(Some(_), None) => true,
		_ => false,
	};
	if !newer {
		return Ok(doc);
	}

	let Some(Value::Object(mut version)) = newest.get("version").cloned() else {
		return Ok(doc);
	};
	if let Some(id) = doc.get(ID_KEY) {
		version.insert(ID_KEY.to_string(), id.clone());
	}
	if let Some(updated_at) = newest.get("updatedAt") {
		version.insert("updatedAt".to_string(), updated_at.clone());
	}
	Ok(version)
}

/// Remove every version of `parent`
pub(crate) async fn delete_versions(
	folio: &Folio,
	req: &Request,
	slug: &str,
	parent: &Value,
) -> Result<usize> {
	Ok(folio
		.db()
		.delete_many(
			&versions_collection(slug),
			&Where::field("parent").equals(parent.clone()),
			req.transaction().as_ref(),
		)
		.await?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use folio_db::MemoryAdapter;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_versions_collection_name() {
		assert_eq!(versions_collection("posts"), "_posts_versions");
	}

	#[rstest]
	#[tokio::test]
	async fn test_only_newest_version_is_latest() {
		let folio = Folio::builder().database(MemoryAdapter::new()).build().unwrap();
		let req = Request::builder(&folio).build();
		let doc = json!({"id": "p1", "title": "a"}).as_object().cloned().unwrap();

		save_version(&folio, &req, "posts", &json!("p1"), &doc, false).await.unwrap();
		save_version(&folio, &req, "posts", &json!("p1"), &doc, true).await.unwrap();

		let versions = folio
			.db()
			.find("_posts_versions", FindArgs::new())
			.await
			.unwrap()
			.docs;
		assert_eq!(versions.len(), 2);
		let latest: Vec<_> = versions.iter().filter(|v| v["latest"] == json!(true)).collect();
		assert_eq!(latest.len(), 1);
		assert_eq!(latest[0]["version"]["_status"], json!("draft"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_newer_draft_replaces_document() {
		let folio = Folio::builder().database(MemoryAdapter::new()).build().unwrap();
		let req = Request::builder(&folio).build();
		let published = json!({"id": "p1", "title": "old", "updatedAt": "2020-01-01T00:00:00.000Z"})
			.as_object()
			.cloned()
			.unwrap();
		let draft = json!({"title": "new"}).as_object().cloned().unwrap();
		save_version(&folio, &req, "posts", &json!("p1"), &draft, true).await.unwrap();

		let read = replace_with_draft_if_available(&folio, &req, "posts", &json!("p1"), published)
			.await
			.unwrap();
		assert_eq!(read["title"], json!("new"));
		assert_eq!(read["id"], json!("p1"));
	}
}
