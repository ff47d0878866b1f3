//! Per-user admin preferences
//!
//! Records of the preferences collection look like
//! `{ key, user, userCollection, value }` and belong to exactly one user.

use crate::app::Folio;
use crate::request::{Request, User};
use crate::transaction::with_transaction;
use crate::versions::now;
use folio_core::types::{ID_KEY, id_to_string};
use folio_core::{Document, Error, Result, Where};
use serde_json::Value;

fn require_user<'a>(folio: &Folio, req: &'a Request) -> Result<&'a User> {
	req.user()
		.ok_or_else(|| Error::Unauthorized(folio.t("error:unauthorized")))
}

fn owned_by(user: &User, key: &str) -> Where {
	Where::field("key")
		.equals(key)
		.and(Where::field("user").equals(user.id.clone()))
		.and(Where::field("userCollection").equals(user.collection.clone()))
}

impl Folio {
	/// Value stored under `key` for the request's user
	pub async fn find_preference(&self, req: &Request, key: &str) -> Result<Option<Value>> {
		let user = require_user(self, req)?;
		let slug = &self.settings().preferences_slug;
		with_transaction(self, req, async {
			let found = self
				.db()
				.find_one(slug, &owned_by(user, key), req.transaction().as_ref())
				.await?;
			Ok(found.and_then(|mut doc| doc.remove("value")))
		})
		.await
	}

	/// Create or replace the value stored under `key`
	pub async fn update_preference(&self, req: &Request, key: &str, value: Value) -> Result<Document> {
		let user = require_user(self, req)?;
		let slug = &self.settings().preferences_slug;
		with_transaction(self, req, async {
			let db = self.db();
			let transaction = req.transaction();
			let mut data = Document::new();
			data.insert("value".to_string(), value);
			data.insert("updatedAt".to_string(), Value::String(now()));

			match db.find_one(slug, &owned_by(user, key), transaction.as_ref()).await? {
				Some(existing) => {
					let id = existing.get(ID_KEY).cloned().unwrap_or(Value::Null);
					Ok(db.update_one(slug, &id, data, transaction.as_ref()).await?)
				}
				None => {
					data.insert("key".to_string(), Value::String(key.to_string()));
					data.insert("user".to_string(), user.id.clone());
					data.insert(
						"userCollection".to_string(),
						Value::String(user.collection.clone()),
					);
					data.insert("createdAt".to_string(), Value::String(now()));
					Ok(db.create(slug, data, transaction.as_ref()).await?)
				}
			}
		})
		.await
	}

	/// Remove the value stored under `key`, returning the removed record
	pub async fn delete_preference(&self, req: &Request, key: &str) -> Result<Option<Document>> {
		let user = require_user(self, req)?;
		let slug = &self.settings().preferences_slug;
		with_transaction(self, req, async {
			let db = self.db();
			let transaction = req.transaction();
			let Some(existing) = db.find_one(slug, &owned_by(user, key), transaction.as_ref()).await?
			else {
				return Ok(None);
			};
			let id = existing.get(ID_KEY).cloned().unwrap_or(Value::Null);
			Ok(Some(db.delete_one(slug, &id, transaction.as_ref()).await?))
		})
		.await
	}
}

/// Remove preferences tied to deleted documents of `slug`
///
/// Drops the per-document preferences `collection-<slug>-<id>` and, for an
/// auth collection, every preference owned by the deleted users.
pub(crate) async fn delete_user_preferences(
	folio: &Folio,
	req: &Request,
	slug: &str,
	ids: &[Value],
) -> Result<()> {
	if ids.is_empty() {
		return Ok(());
	}
	let preferences = &folio.settings().preferences_slug;
	let transaction = req.transaction();

	let keys: Vec<Value> = ids
		.iter()
		.filter_map(id_to_string)
		.map(|id| Value::String(format!("collection-{slug}-{id}")))
		.collect();
	let removed = folio
		.db()
		.delete_many(preferences, &Where::field("key").in_list(keys), transaction.as_ref())
		.await?;

	let owned = if folio.collection(slug)?.is_auth() {
		let owners = Where::field("user")
			.in_list(ids.to_vec())
			.and(Where::field("userCollection").equals(slug));
		folio
			.db()
			.delete_many(preferences, &owners, transaction.as_ref())
			.await?
	} else {
		0
	};
	tracing::debug!(collection = %slug, removed, owned, "deleted preferences of removed documents");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::CollectionConfig;
	use folio_db::{FindArgs, MemoryAdapter};
	use rstest::{fixture, rstest};
	use serde_json::json;

	#[fixture]
	fn folio() -> Folio {
		Folio::builder()
			.collection(CollectionConfig::new("users").auth(Default::default()))
			.database(MemoryAdapter::new())
			.build()
			.unwrap()
	}

	#[rstest]
	#[tokio::test]
	async fn test_requires_user(folio: Folio) {
		let req = Request::builder(&folio).build();
		let result = folio.find_preference(&req, "nav").await;
		assert!(matches!(result, Err(Error::Unauthorized(_))));
	}

	#[rstest]
	#[tokio::test]
	async fn test_update_is_an_upsert(folio: Folio) {
		let req = Request::builder(&folio).user(User::new("u1", "users")).build();
		folio.update_preference(&req, "nav", json!({"open": true})).await.unwrap();
		folio.update_preference(&req, "nav", json!({"open": false})).await.unwrap();

		assert_eq!(
			folio.find_preference(&req, "nav").await.unwrap(),
			Some(json!({"open": false}))
		);
		let all = folio
			.db()
			.find("folio-preferences", FindArgs::new())
			.await
			.unwrap();
		assert_eq!(all.total_docs, 1);

		let other = Request::builder(&folio).user(User::new("u2", "users")).build();
		assert_eq!(folio.find_preference(&other, "nav").await.unwrap(), None);

		assert!(folio.delete_preference(&req, "nav").await.unwrap().is_some());
		assert_eq!(folio.find_preference(&req, "nav").await.unwrap(), None);
	}
}
