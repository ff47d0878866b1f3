//! In-memory adapter with staged transactions
//!
//! Each open transaction works on its own copy of the committed store and
//! records a write log. Commit replays the log onto the committed store;
//! rollback drops both.

use crate::adapter::{DatabaseAdapter, FindArgs, GlobalArgs, PaginatedDocs};
use crate::error::{DbError, DbResult};
use crate::transaction::TransactionId;
use async_trait::async_trait;
use folio_core::types::{ID_KEY, document_id, id_to_string};
use folio_core::{Document, Where};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
struct Store {
	collections: IndexMap<String, IndexMap<String, Document>>,
	globals: IndexMap<String, Document>,
}

#[derive(Debug, Clone)]
enum WriteOp {
	Put {
		collection: String,
		id: String,
		doc: Document,
	},
	Delete {
		collection: String,
		id: String,
	},
	PutGlobal {
		slug: String,
		doc: Document,
	},
}

impl Store {
	fn apply(&mut self, op: &WriteOp) {
		match op {
			WriteOp::Put {
				collection,
				id,
				doc,
			} => {
				self.collections
					.entry(collection.clone())
					.or_default()
					.insert(id.clone(), doc.clone());
			}
			WriteOp::Delete { collection, id } => {
				if let Some(docs) = self.collections.get_mut(collection) {
					docs.shift_remove(id);
				}
			}
			WriteOp::PutGlobal { slug, doc } => {
				self.globals.insert(slug.clone(), doc.clone());
			}
		}
	}

	fn get(&self, collection: &str, id: &str) -> Option<&Document> {
		self.collections.get(collection).and_then(|docs| docs.get(id))
	}

	fn matching<'a>(
		&'a self,
		collection: &str,
		where_: Option<&'a Where>,
	) -> impl Iterator<Item = &'a Document> + 'a {
		self.collections
			.get(collection)
			.into_iter()
			.flat_map(|docs| docs.values())
			.filter(move |doc| where_.is_none_or(|w| w.matches(doc)))
	}
}

#[derive(Debug)]
struct Staged {
	view: Store,
	log: Vec<WriteOp>,
}

/// Transactional in-memory [`DatabaseAdapter`]
///
/// # Examples
///
/// ```
/// use folio_db::{DatabaseAdapter, FindArgs, MemoryAdapter};
/// use serde_json::json;
///
/// # tokio_test_block(async {
/// let db = MemoryAdapter::new();
/// let tx = db.begin_transaction().await.unwrap().unwrap();
/// let data = json!({"title": "Hello"}).as_object().cloned().unwrap();
/// db.create("posts", data, Some(&tx)).await.unwrap();
///
/// // not visible outside the transaction until commit
/// assert_eq!(db.find("posts", FindArgs::new()).await.unwrap().total_docs, 0);
/// db.commit_transaction(&tx).await.unwrap();
/// assert_eq!(db.find("posts", FindArgs::new()).await.unwrap().total_docs, 1);
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryAdapter {
	committed: RwLock<Store>,
	transactions: Mutex<HashMap<TransactionId, Staged>>,
	transactional: bool,
}

impl Default for MemoryAdapter {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryAdapter {
	pub fn new() -> Self {
		Self {
			committed: RwLock::new(Store::default()),
			transactions: Mutex::new(HashMap::new()),
			transactional: true,
		}
	}

	/// An adapter whose `begin_transaction` always returns `None`
	pub fn without_transactions() -> Self {
		Self {
			transactional: false,
			..Self::new()
		}
	}

	/// Number of transactions currently open
	pub fn open_transactions(&self) -> usize {
		self.transactions.lock().len()
	}

	/// Committed documents of `collection`, in insertion order
	pub fn committed_docs(&self, collection: &str) -> Vec<Document> {
		self.committed
			.read()
			.collections
			.get(collection)
			.map(|docs| docs.values().cloned().collect())
			.unwrap_or_default()
	}

	fn read<R>(
		&self,
		transaction: Option<&TransactionId>,
		f: impl FnOnce(&Store) -> R,
	) -> DbResult<R> {
		match transaction {
			Some(tx) => {
				let transactions = self.transactions.lock();
				let staged = transactions
					.get(tx)
					.ok_or_else(|| DbError::UnknownTransaction(tx.clone()))?;
				Ok(f(&staged.view))
			}
			None => Ok(f(&self.committed.read())),
		}
	}

	fn write(&self, transaction: Option<&TransactionId>, ops: Vec<WriteOp>) -> DbResult<()> {
		match transaction {
			Some(tx) => {
				let mut transactions = self.transactions.lock();
				let staged = transactions
					.get_mut(tx)
					.ok_or_else(|| DbError::UnknownTransaction(tx.clone()))?;
				for op in ops {
					staged.view.apply(&op);
					staged.log.push(op);
				}
			}
			None => {
				let mut committed = self.committed.write();
				for op in &ops {
					committed.apply(op);
				}
			}
		}
		Ok(())
	}

	fn id_key(collection: &str, id: &Value) -> DbResult<String> {
		id_to_string(id).ok_or_else(|| DbError::NotFound {
			collection: collection.to_string(),
			id: id.to_string(),
		})
	}
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
	match (a, b) {
		(Some(Value::Number(x)), Some(Value::Number(y))) => x
			.as_f64()
			.partial_cmp(&y.as_f64())
			.unwrap_or(Ordering::Equal),
		(Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
		(Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
		(None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
		(None | Some(Value::Null), _) => Ordering::Less,
		(_, None | Some(Value::Null)) => Ordering::Greater,
		_ => Ordering::Equal,
	}
}

#[async_trait]
impl DatabaseAdapter for MemoryAdapter {
	async fn begin_transaction(&self) -> DbResult<Option<TransactionId>> {
		if !self.transactional {
			return Ok(None);
		}
		let id = TransactionId::generate();
		let view = self.committed.read().clone();
		self.transactions.lock().insert(
			id.clone(),
			Staged {
				view,
				log: Vec::new(),
			},
		);
		tracing::debug!(transaction = %id, "began transaction");
		Ok(Some(id))
	}

	async fn commit_transaction(&self, transaction: &TransactionId) -> DbResult<()> {
		let staged = self
			.transactions
			.lock()
			.remove(transaction)
			.ok_or_else(|| DbError::UnknownTransaction(transaction.clone()))?;
		let mut committed = self.committed.write();
		for op in &staged.log {
			committed.apply(op);
		}
		tracing::debug!(transaction = %transaction, writes = staged.log.len(), "committed transaction");
		Ok(())
	}

	async fn rollback_transaction(&self, transaction: &TransactionId) -> DbResult<()> {
		let staged = self
			.transactions
			.lock()
			.remove(transaction)
			.ok_or_else(|| DbError::UnknownTransaction(transaction.clone()))?;
		tracing::debug!(transaction = %transaction, discarded = staged.log.len(), "rolled back transaction");
		Ok(())
	}

	async fn find(&self, collection: &str, args: FindArgs) -> DbResult<PaginatedDocs> {
		let mut docs = self.read(args.transaction.as_ref(), |store| {
			store
				.matching(collection, args.where_.as_ref())
				.cloned()
				.collect::<Vec<_>>()
		})?;
		if let Some(sort) = &args.sort {
			docs.sort_by(|a, b| {
				let ordering = compare_values(a.get(&sort.field), b.get(&sort.field));
				if sort.descending {
					ordering.reverse()
				} else {
					ordering
				}
			});
		}
		Ok(PaginatedDocs::paginate(docs, args.limit, args.page))
	}

	async fn find_one(
		&self,
		collection: &str,
		where_: &Where,
		transaction: Option<&TransactionId>,
	) -> DbResult<Option<Document>> {
		self.read(transaction, |store| {
			store.matching(collection, Some(where_)).next().cloned()
		})
	}

	async fn create(
		&self,
		collection: &str,
		mut data: Document,
		transaction: Option<&TransactionId>,
	) -> DbResult<Document> {
		let id = match document_id(&data).and_then(id_to_string) {
			Some(id) => id,
			None => {
				let id = uuid::Uuid::new_v4().to_string();
				data.insert(ID_KEY.to_string(), Value::String(id.clone()));
				id
			}
		};
		let exists = self.read(transaction, |store| store.get(collection, &id).is_some())?;
		if exists {
			return Err(DbError::Backend(format!(
				"duplicate id '{id}' in '{collection}'"
			)));
		}
		self.write(
			transaction,
			vec![WriteOp::Put {
				collection: collection.to_string(),
				id,
				doc: data.clone(),
			}],
		)?;
		Ok(data)
	}

	async fn update_one(
		&self,
		collection: &str,
		id: &Value,
		data: Document,
		transaction: Option<&TransactionId>,
	) -> DbResult<Document> {
		let key = Self::id_key(collection, id)?;
		let mut doc = self
			.read(transaction, |store| store.get(collection, &key).cloned())?
			.ok_or_else(|| DbError::NotFound {
				collection: collection.to_string(),
				id: key.clone(),
			})?;
		for (field, value) in data {
			if field != ID_KEY {
				doc.insert(field, value);
			}
		}
		self.write(
			transaction,
			vec![WriteOp::Put {
				collection: collection.to_string(),
				id: key,
				doc: doc.clone(),
			}],
		)?;
		Ok(doc)
	}

	async fn delete_one(
		&self,
		collection: &str,
		id: &Value,
		transaction: Option<&TransactionId>,
	) -> DbResult<Document> {
		let key = Self::id_key(collection, id)?;
		let doc = self
			.read(transaction, |store| store.get(collection, &key).cloned())?
			.ok_or_else(|| DbError::NotFound {
				collection: collection.to_string(),
				id: key.clone(),
			})?;
		self.write(
			transaction,
			vec![WriteOp::Delete {
				collection: collection.to_string(),
				id: key,
			}],
		)?;
		Ok(doc)
	}

	async fn delete_many(
		&self,
		collection: &str,
		where_: &Where,
		transaction: Option<&TransactionId>,
	) -> DbResult<usize> {
		let ids: Vec<String> = self.read(transaction, |store| {
			store
				.matching(collection, Some(where_))
				.filter_map(|doc| document_id(doc).and_then(id_to_string))
				.collect()
		})?;
		let count = ids.len();
		let ops = ids
			.into_iter()
			.map(|id| WriteOp::Delete {
				collection: collection.to_string(),
				id,
			})
			.collect();
		self.write(transaction, ops)?;
		Ok(count)
	}

	async fn find_global(&self, slug: &str, args: GlobalArgs) -> DbResult<Option<Document>> {
		self.read(args.transaction.as_ref(), |store| {
			store
				.globals
				.get(slug)
				.filter(|doc| args.where_.as_ref().is_none_or(|w| w.matches(doc)))
				.cloned()
		})
	}

	async fn upsert_global(
		&self,
		slug: &str,
		data: Document,
		transaction: Option<&TransactionId>,
	) -> DbResult<Document> {
		self.write(
			transaction,
			vec![WriteOp::PutGlobal {
				slug: slug.to_string(),
				doc: data.clone(),
			}],
		)?;
		Ok(data)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::adapter::Sort;
	use rstest::{fixture, rstest};
	use serde_json::json;

	fn doc(value: Value) -> Document {
		value.as_object().cloned().unwrap()
	}

	#[fixture]
	fn db() -> MemoryAdapter {
		MemoryAdapter::new()
	}

	#[rstest]
	#[tokio::test]
	async fn test_create_assigns_id_and_keeps_given_one(db: MemoryAdapter) {
		let created = db.create("users", doc(json!({"email": "a@b.c"})), None).await.unwrap();
		assert!(created.get("id").and_then(Value::as_str).is_some());

		let given = db.create("users", doc(json!({"id": 42})), None).await.unwrap();
		assert_eq!(given.get("id"), Some(&json!(42)));

		let duplicate = db.create("users", doc(json!({"id": "42"})), None).await;
		assert!(matches!(duplicate, Err(DbError::Backend(_))));
	}

	#[rstest]
	#[tokio::test]
	async fn test_transaction_reads_own_writes_and_rollback_discards(db: MemoryAdapter) {
		let tx = db.begin_transaction().await.unwrap().unwrap();
		db.create("posts", doc(json!({"id": "p1", "title": "draft"})), Some(&tx))
			.await
			.unwrap();

		let inside = db
			.find("posts", FindArgs::new().with_transaction(Some(tx.clone())))
			.await
			.unwrap();
		assert_eq!(inside.total_docs, 1);

		db.rollback_transaction(&tx).await.unwrap();
		assert!(db.committed_docs("posts").is_empty());
		assert_eq!(db.open_transactions(), 0);
		assert!(matches!(
			db.commit_transaction(&tx).await,
			Err(DbError::UnknownTransaction(_))
		));
	}

	#[rstest]
	#[tokio::test]
	async fn test_commit_replays_updates_and_deletes(db: MemoryAdapter) {
		db.create("posts", doc(json!({"id": "a", "n": 1})), None).await.unwrap();
		db.create("posts", doc(json!({"id": "b", "n": 2})), None).await.unwrap();

		let tx = db.begin_transaction().await.unwrap().unwrap();
		db.update_one("posts", &json!("a"), doc(json!({"n": 10})), Some(&tx))
			.await
			.unwrap();
		db.delete_one("posts", &json!("b"), Some(&tx)).await.unwrap();
		assert_eq!(db.committed_docs("posts").len(), 2);

		db.commit_transaction(&tx).await.unwrap();
		let docs = db.committed_docs("posts");
		assert_eq!(docs, vec![doc(json!({"id": "a", "n": 10}))]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_delete_many_by_where(db: MemoryAdapter) {
		for (key, user) in [("a", 42), ("b", 42), ("c", 7)] {
			db.create("prefs", doc(json!({"key": key, "user": user})), None)
				.await
				.unwrap();
		}
		let removed = db
			.delete_many("prefs", &Where::field("user").in_list(vec![json!("42")]), None)
			.await
			.unwrap();
		assert_eq!(removed, 2);
		assert_eq!(db.committed_docs("prefs").len(), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_find_sorts_and_paginates(db: MemoryAdapter) {
		for n in [3, 1, 2] {
			db.create("posts", doc(json!({"n": n})), None).await.unwrap();
		}
		let page = db
			.find(
				"posts",
				FindArgs::new()
					.with_sort(Some(Sort::parse("-n")))
					.with_limit(Some(2)),
			)
			.await
			.unwrap();
		let ns: Vec<_> = page.docs.iter().map(|d| d["n"].clone()).collect();
		assert_eq!(ns, vec![json!(3), json!(2)]);
		assert!(page.has_next_page);
	}

	#[rstest]
	#[tokio::test]
	async fn test_globals_respect_where(db: MemoryAdapter) {
		db.upsert_global("header", doc(json!({"status": "draft"})), None)
			.await
			.unwrap();
		let args = GlobalArgs {
			where_: Some(Where::field("status").equals("published")),
			..Default::default()
		};
		assert!(db.find_global("header", args).await.unwrap().is_none());
		assert!(
			db.find_global("header", GlobalArgs::default())
				.await
				.unwrap()
				.is_some()
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_without_transactions() {
		let db = MemoryAdapter::without_transactions();
		assert!(db.begin_transaction().await.unwrap().is_none());
	}
}
