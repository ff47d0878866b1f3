//! Request-scoped context
//!
//! A [`Request`] lives for one inbound operation and everything it triggers:
//! nested operations share its transaction, its relationship loader and its
//! free-form context map.

use crate::app::Folio;
use crate::loader::DocumentLoader;
use folio_conf::{ALL_LOCALES, LocalizationSettings};
use folio_core::{ApiKind, Document};
use folio_db::TransactionId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Weak};

/// The authenticated user of a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
	pub id: Value,
	/// Slug of the auth collection the user belongs to
	pub collection: String,
	pub email: Option<String>,
	/// Remaining fields of the user document
	#[serde(default)]
	pub data: Document,
}

impl User {
	pub fn new(id: impl Into<Value>, collection: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			collection: collection.into(),
			email: None,
			data: Document::new(),
		}
	}

	pub fn with_email(mut self, email: impl Into<String>) -> Self {
		self.email = Some(email.into());
		self
	}

	pub fn with_data(mut self, data: Document) -> Self {
		self.data = data;
		self
	}

	/// A field of the user document
	pub fn get(&self, field: &str) -> Option<&Value> {
		self.data.get(field)
	}
}

/// A file attached to a create or update of an upload collection
#[derive(Debug, Clone)]
pub struct UploadedFile {
	pub name: String,
	pub mime_type: String,
	pub data: Vec<u8>,
}

impl UploadedFile {
	pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
		Self {
			name: name.into(),
			mime_type: mime_type.into(),
			data,
		}
	}
}

struct RequestInner {
	user: Option<User>,
	locale: Option<String>,
	fallback_locale: Option<String>,
	default_locale: Option<String>,
	api: ApiKind,
	token: Option<String>,
	file: Option<UploadedFile>,
	transaction: Mutex<Option<TransactionId>>,
	context: Mutex<Document>,
	loader: DocumentLoader,
}

/// Per-request state shared by every operation the request triggers
///
/// Cloning is cheap; clones share the same transaction, loader and context.
#[derive(Clone)]
pub struct Request {
	inner: Arc<RequestInner>,
}

impl std::fmt::Debug for Request {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Request")
			.field("user", &self.inner.user)
			.field("locale", &self.inner.locale)
			.field("fallback_locale", &self.inner.fallback_locale)
			.field("api", &self.inner.api)
			.field("transaction", &*self.inner.transaction.lock())
			.finish()
	}
}

impl Request {
	/// Start building a request against `folio`'s localization settings
	pub fn builder(folio: &Folio) -> RequestBuilder {
		RequestBuilder::new(folio.settings().localization.clone())
	}

	pub fn user(&self) -> Option<&User> {
		self.inner.user.as_ref()
	}

	/// Effective locale; `None` when localization is disabled
	pub fn locale(&self) -> Option<&str> {
		self.inner.locale.as_deref()
	}

	pub fn fallback_locale(&self) -> Option<&str> {
		self.inner.fallback_locale.as_deref()
	}

	pub fn default_locale(&self) -> Option<&str> {
		self.inner.default_locale.as_deref()
	}

	/// Whether every locale was requested at once
	pub fn is_all_locales(&self) -> bool {
		self.locale() == Some(ALL_LOCALES)
	}

	/// Whether the request writes or reads a locale other than the default
	pub fn is_non_default_locale(&self) -> bool {
		match (self.locale(), self.default_locale()) {
			(Some(locale), Some(default)) => locale != default && locale != ALL_LOCALES,
			_ => false,
		}
	}

	pub fn api(&self) -> ApiKind {
		self.inner.api
	}

	/// Raw auth token the request was made with
	pub fn token(&self) -> Option<&str> {
		self.inner.token.as_deref()
	}

	pub fn file(&self) -> Option<&UploadedFile> {
		self.inner.file.as_ref()
	}

	/// Transaction currently open for this request
	pub fn transaction(&self) -> Option<TransactionId> {
		self.inner.transaction.lock().clone()
	}

	pub(crate) fn set_transaction(&self, transaction: Option<TransactionId>) {
		*self.inner.transaction.lock() = transaction;
	}

	pub(crate) fn take_transaction(&self) -> Option<TransactionId> {
		self.inner.transaction.lock().take()
	}

	/// Value stashed in the context map
	pub fn context_get(&self, key: &str) -> Option<Value> {
		self.inner.context.lock().get(key).cloned()
	}

	/// Stash a value for later hooks of the same request
	pub fn context_set(&self, key: impl Into<String>, value: Value) {
		self.inner.context.lock().insert(key.into(), value);
	}

	/// Snapshot of the whole context map
	pub fn context(&self) -> Document {
		self.inner.context.lock().clone()
	}

	pub fn loader(&self) -> &DocumentLoader {
		&self.inner.loader
	}

	pub(crate) fn downgrade(&self) -> WeakRequest {
		WeakRequest {
			inner: Arc::downgrade(&self.inner),
		}
	}
}

/// Non-owning handle held by loader futures, so a cached fetch never keeps
/// its own request alive
#[derive(Clone)]
pub(crate) struct WeakRequest {
	inner: Weak<RequestInner>,
}

impl WeakRequest {
	pub(crate) fn upgrade(&self) -> Option<Request> {
		self.inner.upgrade().map(|inner| Request { inner })
	}
}

/// Builder for [`Request`]
///
/// # Examples
///
/// ```
/// use folio_cms::prelude::*;
/// use folio_conf::{LocalizationSettings, Settings};
///
/// let folio = Folio::builder()
///     .settings(Settings {
///         localization: Some(LocalizationSettings::new(["en", "es"])),
///         ..Default::default()
///     })
///     .database(folio_db::MemoryAdapter::new())
///     .build()
///     .unwrap();
///
/// let req = Request::builder(&folio).locale("fr").build();
/// assert_eq!(req.locale(), Some("en"));
///
/// let req = Request::builder(&folio).locale("es").fallback_locale("none").build();
/// assert_eq!(req.locale(), Some("es"));
/// assert_eq!(req.fallback_locale(), None);
/// ```
pub struct RequestBuilder {
	localization: Option<LocalizationSettings>,
	user: Option<User>,
	locale: Option<String>,
	fallback_locale: Option<String>,
	api: ApiKind,
	token: Option<String>,
	file: Option<UploadedFile>,
	context: Document,
}

impl RequestBuilder {
	fn new(localization: Option<LocalizationSettings>) -> Self {
		Self {
			localization,
			user: None,
			locale: None,
			fallback_locale: None,
			api: ApiKind::Local,
			token: None,
			file: None,
			context: Document::new(),
		}
	}

	pub fn user(mut self, user: User) -> Self {
		self.user = Some(user);
		self
	}

	pub fn locale(mut self, locale: impl Into<String>) -> Self {
		self.locale = Some(locale.into());
		self
	}

	/// Requested fallback; `none`, `null` and `false` disable fallback
	pub fn fallback_locale(mut self, locale: impl Into<String>) -> Self {
		self.fallback_locale = Some(locale.into());
		self
	}

	pub fn api(mut self, api: ApiKind) -> Self {
		self.api = api;
		self
	}

	pub fn token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(token.into());
		self
	}

	pub fn file(mut self, file: UploadedFile) -> Self {
		self.file = Some(file);
		self
	}

	/// Pre-seed a context entry
	pub fn context(mut self, key: impl Into<String>, value: Value) -> Self {
		self.context.insert(key.into(), value);
		self
	}

	pub fn build(self) -> Request {
		let (locale, fallback_locale, default_locale) = match &self.localization {
			Some(l10n) => {
				let locale = match self.locale {
					Some(l) if l == ALL_LOCALES || l10n.is_known(&l) => l,
					_ => l10n.default_locale.clone(),
				};
				let fallback = match self.fallback_locale.as_deref() {
					Some("none" | "null" | "false" | "") => None,
					Some(l) if l10n.is_known(l) => Some(l.to_string()),
					_ if l10n.fallback => Some(l10n.default_locale.clone()),
					_ => None,
				};
				(Some(locale), fallback, Some(l10n.default_locale.clone()))
			}
			None => (None, None, None),
		};

		Request {
			inner: Arc::new(RequestInner {
				user: self.user,
				locale,
				fallback_locale,
				default_locale,
				api: self.api,
				token: self.token,
				file: self.file,
				transaction: Mutex::new(None),
				context: Mutex::new(self.context),
				loader: DocumentLoader::new(),
			}),
		}
	}
}
