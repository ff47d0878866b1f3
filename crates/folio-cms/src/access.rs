//! Access control
//!
//! Rules are static decisions or async predicates over the request. A rule
//! resolves to an [`AccessResult`]: a plain allow/deny, or a [`Where`]
//! constraint that allows only the documents it matches.

use crate::app::Folio;
use crate::request::Request;
use folio_core::{Document, Error, Result, Where};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Outcome of an access rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccessResult {
	Bool(bool),
	Where(Where),
}

impl AccessResult {
	pub fn is_denied(&self) -> bool {
		matches!(self, AccessResult::Bool(false))
	}

	/// The decision as a boolean
	///
	/// A constraint cannot be collapsed into a boolean without a document to
	/// test it against, so it is an error here.
	///
	/// # Examples
	///
	/// ```
	/// use folio_cms::access::AccessResult;
	/// use folio_core::Where;
	///
	/// assert!(AccessResult::Bool(true).as_bool().unwrap());
	/// assert!(AccessResult::Where(Where::field("owner").equals("1")).as_bool().is_err());
	/// ```
	pub fn as_bool(&self) -> Result<bool> {
		match self {
			AccessResult::Bool(b) => Ok(*b),
			AccessResult::Where(w) => Err(Error::InvalidAccessResult(format!("{w:?}"))),
		}
	}

	/// The decision as a query constraint; `None` means unconstrained
	pub fn into_where(self) -> Option<Where> {
		match self {
			AccessResult::Bool(true) => None,
			AccessResult::Bool(false) => Some(Where::Never),
			AccessResult::Where(w) => Some(w),
		}
	}

	/// Both results must allow
	///
	/// # Examples
	///
	/// ```
	/// use folio_cms::access::AccessResult;
	/// use folio_core::Where;
	///
	/// let partial = AccessResult::Where(Where::field("status").equals("published"));
	/// assert_eq!(partial.clone().intersect(AccessResult::Bool(true)), partial);
	/// assert_eq!(partial.intersect(AccessResult::Bool(false)), AccessResult::Bool(false));
	/// ```
	pub fn intersect(self, other: AccessResult) -> AccessResult {
		match (self, other) {
			(AccessResult::Bool(false), _) | (_, AccessResult::Bool(false)) => {
				AccessResult::Bool(false)
			}
			(AccessResult::Bool(true), other) | (other, AccessResult::Bool(true)) => other,
			(AccessResult::Where(a), AccessResult::Where(b)) => AccessResult::Where(a.and(b)),
		}
	}

	/// Whether `doc` is visible under this result
	pub fn permits(&self, doc: &Document) -> bool {
		match self {
			AccessResult::Bool(b) => *b,
			AccessResult::Where(w) => w.matches(doc),
		}
	}
}

impl From<bool> for AccessResult {
	fn from(value: bool) -> Self {
		AccessResult::Bool(value)
	}
}

impl From<Where> for AccessResult {
	fn from(value: Where) -> Self {
		AccessResult::Where(value)
	}
}

/// Arguments handed to access predicates
#[derive(Debug, Clone)]
pub struct AccessArgs {
	pub req: Request,
	/// Id of the targeted document, when known
	pub id: Option<Value>,
	/// Incoming data of a write
	pub data: Option<Document>,
	/// Stored document, for field-level checks
	pub doc: Option<Document>,
	/// Data of the field's enclosing scope, for field-level checks
	pub sibling_data: Option<Document>,
}

impl AccessArgs {
	pub fn new(req: &Request) -> Self {
		Self {
			req: req.clone(),
			id: None,
			data: None,
			doc: None,
			sibling_data: None,
		}
	}

	pub fn with_id(mut self, id: Option<Value>) -> Self {
		self.id = id;
		self
	}

	pub fn with_data(mut self, data: Option<Document>) -> Self {
		self.data = data;
		self
	}

	pub fn with_doc(mut self, doc: Option<Document>) -> Self {
		self.doc = doc;
		self
	}

	pub fn with_sibling_data(mut self, sibling_data: Option<Document>) -> Self {
		self.sibling_data = sibling_data;
		self
	}
}

type AccessFn = Arc<dyn Fn(AccessArgs) -> BoxFuture<'static, Result<AccessResult>> + Send + Sync>;

/// An access rule
#[derive(Clone, Default)]
pub enum Access {
	/// Always the given decision
	Static(bool),
	/// Allowed when the request carries a user
	#[default]
	Authenticated,
	/// Decided by an async predicate
	Predicate(AccessFn),
}

impl std::fmt::Debug for Access {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Access::Static(b) => f.debug_tuple("Static").field(b).finish(),
			Access::Authenticated => f.write_str("Authenticated"),
			Access::Predicate(_) => f.write_str("Predicate(..)"),
		}
	}
}

impl Access {
	pub fn allow() -> Self {
		Access::Static(true)
	}

	pub fn deny() -> Self {
		Access::Static(false)
	}

	/// Rule backed by an async predicate
	///
	/// # Examples
	///
	/// ```
	/// use folio_cms::access::{Access, AccessArgs, AccessResult};
	/// use folio_core::Where;
	///
	/// // users see only their own documents
	/// let own_docs = Access::from_fn(|args: AccessArgs| async move {
	///     Ok(match args.req.user() {
	///         Some(user) => AccessResult::Where(Where::field("owner").equals(user.id.clone())),
	///         None => AccessResult::Bool(false),
	///     })
	/// });
	/// ```
	pub fn from_fn<F, Fut>(f: F) -> Self
	where
		F: Fn(AccessArgs) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<AccessResult>> + Send + 'static,
	{
		Access::Predicate(Arc::new(move |args| Box::pin(f(args))))
	}

	/// Evaluate the rule
	pub async fn evaluate(&self, args: AccessArgs) -> Result<AccessResult> {
		match self {
			Access::Static(b) => Ok(AccessResult::Bool(*b)),
			Access::Authenticated => Ok(AccessResult::Bool(args.req.user().is_some())),
			Access::Predicate(f) => f(args).await,
		}
	}
}

impl From<bool> for Access {
	fn from(value: bool) -> Self {
		Access::Static(value)
	}
}

/// Evaluate `rule` as an authorization gate
///
/// A denial, or a predicate that fails, is `Forbidden`. With
/// `disable_errors` both resolve to `Bool(false)` instead.
pub async fn execute_access(
	folio: &Folio,
	rule: &Access,
	args: AccessArgs,
	disable_errors: bool,
) -> Result<AccessResult> {
	let forbidden = || Error::Forbidden(folio.t("error:notAllowedToPerformAction"));
	match rule.evaluate(args).await {
		Ok(AccessResult::Bool(false)) if !disable_errors => Err(forbidden()),
		Ok(result) => Ok(result),
		Err(err) => {
			tracing::warn!(error = %err, "access predicate failed; treating as denied");
			if disable_errors {
				Ok(AccessResult::Bool(false))
			} else {
				Err(forbidden())
			}
		}
	}
}

/// Evaluate a field-level rule against the document it guards
///
/// A constraint result allows the field only if `doc` matches it. Predicate
/// failures deny the field.
pub(crate) async fn field_permits(rule: &Access, args: AccessArgs) -> bool {
	let doc = args.doc.clone().or_else(|| args.data.clone()).unwrap_or_default();
	match rule.evaluate(args).await {
		Ok(result) => result.permits(&doc),
		Err(err) => {
			tracing::warn!(error = %err, "field access predicate failed; treating as denied");
			false
		}
	}
}
