//! Request-scoped relationship loader
//!
//! Lookups are keyed by everything that can change the shape of the resolved
//! document. The first lookup for a key starts the fetch; every later lookup
//! for the same key (concurrent or not) awaits that same fetch.

use folio_core::Document;
use folio_db::TransactionId;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Identity of one relationship lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoaderKey {
	pub transaction: Option<TransactionId>,
	pub collection: String,
	/// Canonical string form of the id
	pub id: String,
	pub depth: u32,
	pub current_depth: u32,
	pub locale: Option<String>,
	pub fallback_locale: Option<String>,
	pub override_access: bool,
	pub show_hidden_fields: bool,
}

type SharedFetch = Shared<BoxFuture<'static, Option<Document>>>;

/// Memoizing loader owned by a [`Request`](crate::request::Request)
///
/// Entries live as long as the request; there is no eviction.
#[derive(Default)]
pub struct DocumentLoader {
	entries: Mutex<HashMap<LoaderKey, SharedFetch>>,
}

impl DocumentLoader {
	pub fn new() -> Self {
		Self::default()
	}

	/// Resolve `key`, starting `fetch` only if no lookup for it exists yet
	///
	/// # Examples
	///
	/// ```
	/// use folio_cms::loader::{DocumentLoader, LoaderKey};
	/// use futures::FutureExt;
	/// use std::sync::atomic::{AtomicUsize, Ordering};
	/// use std::sync::Arc;
	///
	/// # futures::executor::block_on(async {
	/// let loader = DocumentLoader::new();
	/// let calls = Arc::new(AtomicUsize::new(0));
	/// let key = LoaderKey {
	///     transaction: None,
	///     collection: "posts".into(),
	///     id: "1".into(),
	///     depth: 2,
	///     current_depth: 1,
	///     locale: None,
	///     fallback_locale: None,
	///     override_access: false,
	///     show_hidden_fields: false,
	/// };
	///
	/// for _ in 0..3 {
	///     let calls = calls.clone();
	///     loader
	///         .load(key.clone(), move || {
	///             async move {
	///                 calls.fetch_add(1, Ordering::SeqCst);
	///                 None
	///             }
	///             .boxed()
	///         })
	///         .await;
	/// }
	/// assert_eq!(calls.load(Ordering::SeqCst), 1);
	/// # });
	/// ```
	pub async fn load<F>(&self, key: LoaderKey, fetch: F) -> Option<Document>
	where
		F: FnOnce() -> BoxFuture<'static, Option<Document>>,
	{
		let pending = {
			let mut entries = self.entries.lock();
			entries
				.entry(key)
				.or_insert_with(|| fetch().shared())
				.clone()
		};
		pending.await
	}

	/// Number of distinct keys looked up so far
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	fn key(id: &str, current_depth: u32) -> LoaderKey {
		LoaderKey {
			transaction: None,
			collection: "posts".into(),
			id: id.into(),
			depth: 2,
			current_depth,
			locale: Some("en".into()),
			fallback_locale: None,
			override_access: false,
			show_hidden_fields: false,
		}
	}

	fn counting_fetch(
		calls: Arc<AtomicUsize>,
	) -> impl FnOnce() -> BoxFuture<'static, Option<Document>> {
		move || {
			async move {
				calls.fetch_add(1, Ordering::SeqCst);
				tokio::task::yield_now().await;
				json!({"id": "1"}).as_object().cloned()
			}
			.boxed()
		}
	}

	#[rstest]
	#[tokio::test]
	async fn test_concurrent_identical_keys_share_one_fetch() {
		let loader = DocumentLoader::new();
		let calls = Arc::new(AtomicUsize::new(0));

		let (a, b) = tokio::join!(
			loader.load(key("1", 1), counting_fetch(calls.clone())),
			loader.load(key("1", 1), counting_fetch(calls.clone())),
		);

		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(a, b);
		assert_eq!(loader.len(), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_key_components_are_distinct() {
		let loader = DocumentLoader::new();
		let calls = Arc::new(AtomicUsize::new(0));

		loader.load(key("1", 1), counting_fetch(calls.clone())).await;
		loader.load(key("1", 2), counting_fetch(calls.clone())).await;
		let mut other_locale = key("1", 1);
		other_locale.locale = Some("es".into());
		loader.load(other_locale, counting_fetch(calls.clone())).await;

		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}
}
