//! Lifecycle hooks
//!
//! A hook receives the in-flight value of its phase and returns either a
//! replacement or `None` to keep the value as is. Hooks of one phase run one
//! after another in registration order; an error aborts the operation.

use crate::operations::auth::RefreshResult;
use crate::operations::collections::BulkOperationResult;
use crate::request::Request;
use folio_core::{Document, Operation, Result, Where};
use folio_db::PaginatedDocs;
use futures::future::BoxFuture;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// A single async hook callback
pub struct Hook<A, R> {
	f: Arc<dyn Fn(A) -> BoxFuture<'static, Result<Option<R>>> + Send + Sync>,
}

impl<A, R> Clone for Hook<A, R> {
	fn clone(&self) -> Self {
		Self { f: self.f.clone() }
	}
}

impl<A, R> std::fmt::Debug for Hook<A, R> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str("Hook(..)")
	}
}

impl<A, R> Hook<A, R> {
	/// Wrap an async closure
	///
	/// # Examples
	///
	/// ```
	/// use folio_cms::hooks::{BeforeChangeArgs, Hook};
	/// use serde_json::json;
	///
	/// let slugify = Hook::new(|mut args: BeforeChangeArgs| async move {
	///     if let Some(title) = args.data.get("title").and_then(|t| t.as_str()) {
	///         let slug = title.to_lowercase().replace(' ', "-");
	///         args.data.insert("slug".into(), json!(slug));
	///     }
	///     Ok(Some(args.data))
	/// });
	/// ```
	pub fn new<F, Fut>(f: F) -> Self
	where
		F: Fn(A) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Option<R>>> + Send + 'static,
	{
		Self {
			f: Arc::new(move |args| Box::pin(f(args))),
		}
	}

	pub async fn call(&self, args: A) -> Result<Option<R>> {
		(self.f)(args).await
	}
}

/// Run `hooks` in order, threading the value through
///
/// `make_args` builds each hook's arguments from the current value.
pub(crate) async fn run_hooks<A, R, F>(
	phase: &str,
	hooks: &[Hook<A, R>],
	mut value: R,
	mut make_args: F,
) -> Result<R>
where
	F: FnMut(&R) -> A + Send,
	A: Send,
	R: Send,
{
	for (index, hook) in hooks.iter().enumerate() {
		tracing::debug!(phase, index, "running hook");
		match hook.call(make_args(&value)).await {
			Ok(Some(next)) => value = next,
			Ok(None) => {}
			Err(err) => {
				tracing::debug!(phase, index, error = %err, "hook aborted the operation");
				return Err(err);
			}
		}
	}
	Ok(value)
}

/// Arguments describing the operation about to run
#[derive(Debug, Clone)]
pub struct OperationArgs {
	pub collection: String,
	pub operation: Operation,
	pub id: Option<Value>,
	pub data: Option<Document>,
	pub where_: Option<Where>,
}

#[derive(Debug, Clone)]
pub struct BeforeOperationArgs {
	pub args: OperationArgs,
	pub req: Request,
}

/// Result of a finished operation, as seen by `afterOperation` hooks
#[derive(Debug, Clone)]
pub enum OperationResult {
	Document(Document),
	Documents(PaginatedDocs),
	Bulk(BulkOperationResult),
	Refresh(RefreshResult),
	Unlocked(bool),
	/// A lookup that found nothing
	Empty,
}

#[derive(Debug, Clone)]
pub struct AfterOperationArgs {
	pub operation: Operation,
	pub result: OperationResult,
	pub req: Request,
}

/// Arguments of `beforeValidate` and `beforeChange` entity hooks
#[derive(Debug, Clone)]
pub struct BeforeChangeArgs {
	pub data: Document,
	pub original_doc: Option<Document>,
	pub operation: Operation,
	pub req: Request,
}

#[derive(Debug, Clone)]
pub struct AfterChangeArgs {
	pub doc: Document,
	pub previous_doc: Option<Document>,
	pub operation: Operation,
	pub req: Request,
}

#[derive(Debug, Clone)]
pub struct BeforeReadArgs {
	pub doc: Document,
	pub query: Option<Where>,
	pub req: Request,
}

#[derive(Debug, Clone)]
pub struct AfterReadArgs {
	pub doc: Document,
	pub query: Option<Where>,
	pub find_many: bool,
	pub req: Request,
}

#[derive(Debug, Clone)]
pub struct BeforeDeleteArgs {
	pub id: Value,
	pub req: Request,
}

#[derive(Debug, Clone)]
pub struct AfterDeleteArgs {
	pub id: Value,
	pub doc: Document,
	pub req: Request,
}

#[derive(Debug, Clone)]
pub struct AfterRefreshArgs {
	pub result: RefreshResult,
	pub token: String,
	pub exp: i64,
	pub req: Request,
}

/// Arguments of field-level hooks
#[derive(Debug, Clone)]
pub struct FieldHookArgs {
	pub value: Value,
	/// Dot-joined path of the field
	pub path: String,
	/// The whole in-flight document
	pub data: Document,
	/// Data of the field's enclosing scope
	pub sibling_data: Document,
	pub original_doc: Option<Document>,
	pub operation: Operation,
	pub find_many: bool,
	pub req: Request,
}

pub type FieldHook = Hook<FieldHookArgs, Value>;

/// Field-level hook lists
#[derive(Debug, Clone, Default)]
pub struct FieldHooks {
	pub before_validate: Vec<FieldHook>,
	pub before_change: Vec<FieldHook>,
	pub after_change: Vec<FieldHook>,
	pub after_read: Vec<FieldHook>,
}

/// Collection-level hook lists
#[derive(Debug, Clone, Default)]
pub struct CollectionHooks {
	pub before_operation: Vec<Hook<BeforeOperationArgs, OperationArgs>>,
	pub before_validate: Vec<Hook<BeforeChangeArgs, Document>>,
	pub before_change: Vec<Hook<BeforeChangeArgs, Document>>,
	pub after_change: Vec<Hook<AfterChangeArgs, Document>>,
	pub before_read: Vec<Hook<BeforeReadArgs, Document>>,
	pub after_read: Vec<Hook<AfterReadArgs, Document>>,
	pub before_delete: Vec<Hook<BeforeDeleteArgs, ()>>,
	pub after_delete: Vec<Hook<AfterDeleteArgs, Document>>,
	pub after_operation: Vec<Hook<AfterOperationArgs, OperationResult>>,
	pub after_refresh: Vec<Hook<AfterRefreshArgs, RefreshResult>>,
}

/// Global-level hook lists
#[derive(Debug, Clone, Default)]
pub struct GlobalHooks {
	pub before_validate: Vec<Hook<BeforeChangeArgs, Document>>,
	pub before_change: Vec<Hook<BeforeChangeArgs, Document>>,
	pub after_change: Vec<Hook<AfterChangeArgs, Document>>,
	pub before_read: Vec<Hook<BeforeReadArgs, Document>>,
	pub after_read: Vec<Hook<AfterReadArgs, Document>>,
}
