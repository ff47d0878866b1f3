//! Collection operations

use super::{
	after_operation, before_operation, expect_document, flatten_original, localize_write,
	read_pipeline, stamp,
};
use crate::access::{AccessArgs, AccessResult, execute_access};
use crate::app::Folio;
use crate::config::CollectionConfig;
use crate::fields::phases::{ReadOptions, WriteContext, after_change, before_change, before_validate};
use crate::hooks::{
	AfterChangeArgs, AfterDeleteArgs, BeforeChangeArgs, BeforeDeleteArgs, OperationArgs,
	OperationResult, run_hooks,
};
use crate::operations::preferences::delete_user_preferences;
use crate::operations::uploads::{delete_associated_files, store_file};
use crate::request::Request;
use crate::transaction::with_transaction;
use crate::versions::{delete_versions, replace_with_draft_if_available, save_version};
use folio_core::types::{ID_KEY, deep_merge, document_id};
use folio_core::{Document, Error, Operation, Result, Where};
use folio_db::{FindArgs, PaginatedDocs, Sort};
use futures::FutureExt;
use futures::future::{BoxFuture, try_join_all};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Arguments of [`Folio::create`]
#[derive(Debug, Clone, Default)]
pub struct CreateArgs {
	pub data: Document,
	pub depth: Option<u32>,
	pub draft: bool,
	pub override_access: bool,
	pub show_hidden_fields: bool,
}

impl CreateArgs {
	pub fn new(data: Document) -> Self {
		Self {
			data,
			..Default::default()
		}
	}

	pub fn with_depth(mut self, depth: u32) -> Self {
		self.depth = Some(depth);
		self
	}

	pub fn with_draft(mut self, draft: bool) -> Self {
		self.draft = draft;
		self
	}

	pub fn with_override_access(mut self, override_access: bool) -> Self {
		self.override_access = override_access;
		self
	}
}

/// Arguments of [`Folio::find`]
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
	pub where_: Option<Where>,
	/// Field to sort by, `-` prefixed for descending
	pub sort: Option<String>,
	pub limit: Option<usize>,
	pub page: Option<usize>,
	pub depth: Option<u32>,
	pub draft: bool,
	pub override_access: bool,
	pub show_hidden_fields: bool,
}

impl FindOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_where(mut self, where_: Where) -> Self {
		self.where_ = Some(where_);
		self
	}

	pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
		self.sort = Some(sort.into());
		self
	}

	pub fn with_limit(mut self, limit: usize) -> Self {
		self.limit = Some(limit);
		self
	}

	pub fn with_page(mut self, page: usize) -> Self {
		self.page = Some(page);
		self
	}

	pub fn with_depth(mut self, depth: u32) -> Self {
		self.depth = Some(depth);
		self
	}

	pub fn with_draft(mut self, draft: bool) -> Self {
		self.draft = draft;
		self
	}

	pub fn with_override_access(mut self, override_access: bool) -> Self {
		self.override_access = override_access;
		self
	}
}

/// Arguments of [`Folio::find_by_id`]
#[derive(Debug, Clone)]
pub struct FindByIdArgs {
	pub id: Value,
	pub depth: Option<u32>,
	pub draft: bool,
	pub override_access: bool,
	pub show_hidden_fields: bool,
	/// Resolve denials and misses to `None` instead of errors
	pub disable_errors: bool,
}

impl FindByIdArgs {
	pub fn new(id: impl Into<Value>) -> Self {
		Self {
			id: id.into(),
			depth: None,
			draft: false,
			override_access: false,
			show_hidden_fields: false,
			disable_errors: false,
		}
	}

	pub fn with_depth(mut self, depth: u32) -> Self {
		self.depth = Some(depth);
		self
	}

	pub fn with_draft(mut self, draft: bool) -> Self {
		self.draft = draft;
		self
	}

	pub fn with_override_access(mut self, override_access: bool) -> Self {
		self.override_access = override_access;
		self
	}

	pub fn with_show_hidden_fields(mut self, show_hidden_fields: bool) -> Self {
		self.show_hidden_fields = show_hidden_fields;
		self
	}

	pub fn with_disable_errors(mut self, disable_errors: bool) -> Self {
		self.disable_errors = disable_errors;
		self
	}
}

/// Arguments of [`Folio::update_by_id`]
#[derive(Debug, Clone)]
pub struct UpdateArgs {
	pub id: Value,
	/// Partial data; absent fields keep their stored values
	pub data: Document,
	pub depth: Option<u32>,
	/// Save a draft version instead of updating the document
	pub draft: bool,
	pub override_access: bool,
	pub show_hidden_fields: bool,
}

impl UpdateArgs {
	pub fn new(id: impl Into<Value>, data: Document) -> Self {
		Self {
			id: id.into(),
			data,
			depth: None,
			draft: false,
			override_access: false,
			show_hidden_fields: false,
		}
	}

	pub fn with_depth(mut self, depth: u32) -> Self {
		self.depth = Some(depth);
		self
	}

	pub fn with_draft(mut self, draft: bool) -> Self {
		self.draft = draft;
		self
	}

	pub fn with_override_access(mut self, override_access: bool) -> Self {
		self.override_access = override_access;
		self
	}
}

/// Arguments of [`Folio::delete`] and [`Folio::delete_by_id`]
#[derive(Debug, Clone, Default)]
pub struct DeleteArgs {
	pub where_: Option<Where>,
	pub depth: Option<u32>,
	pub override_access: bool,
	pub show_hidden_fields: bool,
}

impl DeleteArgs {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_where(mut self, where_: Where) -> Self {
		self.where_ = Some(where_);
		self
	}

	pub fn with_override_access(mut self, override_access: bool) -> Self {
		self.override_access = override_access;
		self
	}
}

/// Failure to delete one document of a bulk delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkError {
	pub id: Value,
	pub message: String,
}

/// Outcome of a bulk operation: what succeeded and what failed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkOperationResult {
	pub docs: Vec<Document>,
	pub errors: Vec<BulkError>,
}

fn read_options(
	folio: &Folio,
	depth: Option<u32>,
	current_depth: u32,
	override_access: bool,
	show_hidden_fields: bool,
	find_many: bool,
) -> ReadOptions {
	ReadOptions {
		depth: folio.settings().effective_depth(depth),
		current_depth,
		override_access,
		show_hidden_fields,
		find_many,
	}
}

fn operation_args(collection: &CollectionConfig, operation: Operation) -> OperationArgs {
	OperationArgs {
		collection: collection.slug.clone(),
		operation,
		id: None,
		data: None,
		where_: None,
	}
}

/// Missing document under the given access result
fn not_found_or_forbidden(folio: &Folio, access: &AccessResult) -> Error {
	if matches!(access, AccessResult::Where(_)) {
		Error::Forbidden(folio.t("error:notAllowedToPerformAction"))
	} else {
		Error::NotFound(folio.t("error:notFound"))
	}
}

/// `find_by_id` at a given population depth, boxed so population can
/// recurse into it
pub(crate) fn find_by_id_boxed(
	folio: Folio,
	slug: String,
	args: FindByIdArgs,
	req: Request,
	current_depth: u32,
) -> BoxFuture<'static, Result<Option<Document>>> {
	async move { find_by_id_at(&folio, &req, &slug, args, current_depth).await }.boxed()
}

async fn find_by_id_at(
	folio: &Folio,
	req: &Request,
	slug: &str,
	args: FindByIdArgs,
	current_depth: u32,
) -> Result<Option<Document>> {
	let collection = folio.collection(slug)?;
	with_transaction(folio, req, async {
		let op = before_operation(
			req,
			&collection.hooks.before_operation,
			OperationArgs {
				id: Some(args.id.clone()),
				..operation_args(collection, Operation::Read)
			},
		)
		.await?;
		let id = op.id.unwrap_or_else(|| args.id.clone());

		let access = if args.override_access {
			AccessResult::Bool(true)
		} else {
			execute_access(
				folio,
				&collection.access.read,
				AccessArgs::new(req).with_id(Some(id.clone())),
				args.disable_errors,
			)
			.await?
		};
		if access.is_denied() {
			return Ok(None);
		}

		let query = Where::field(ID_KEY).equals(id.clone());
		let query = Where::and_option(Some(query), access.clone().into_where()).unwrap_or(Where::Never);
		let Some(mut doc) = folio
			.db()
			.find_one(slug, &query, req.transaction().as_ref())
			.await?
		else {
			if args.disable_errors {
				return Ok(None);
			}
			return Err(Error::NotFound(folio.t("error:notFound")));
		};

		if args.draft && collection.drafts_enabled() {
			doc = replace_with_draft_if_available(folio, req, slug, &id, doc).await?;
		}

		let options = read_options(
			folio,
			args.depth,
			current_depth,
			args.override_access,
			args.show_hidden_fields,
			false,
		);
		let doc = read_pipeline(
			folio,
			req,
			&collection.fields,
			&collection.hooks.before_read,
			&collection.hooks.after_read,
			doc,
			Some(&query),
			options,
		)
		.await?;

		match after_operation(
			req,
			&collection.hooks.after_operation,
			Operation::Read,
			OperationResult::Document(doc),
		)
		.await?
		{
			OperationResult::Empty => Ok(None),
			result => expect_document(result).map(Some),
		}
	})
	.await
}

impl Folio {
	/// Create a document
	///
	/// # Examples
	///
	/// ```
	/// use folio_cms::prelude::*;
	/// use serde_json::json;
	///
	/// # tokio_test::block_on(async {
	/// let folio = Folio::builder()
	///     .collection(
	///         CollectionConfig::new("posts")
	///             .field(Field::text("title").required())
	///             .create_access(Access::allow()),
	///     )
	///     .database(folio_db::MemoryAdapter::new())
	///     .build()
	///     .unwrap();
	/// let req = Request::builder(&folio).build();
	///
	/// let data = json!({"title": "Hello"}).as_object().cloned().unwrap();
	/// let doc = folio.create(&req, "posts", CreateArgs::new(data)).await.unwrap();
	/// assert_eq!(doc["title"], json!("Hello"));
	/// assert!(doc.contains_key("createdAt"));
	///
	/// let missing = folio.create(&req, "posts", CreateArgs::new(Document::new())).await;
	/// assert!(matches!(missing, Err(Error::Validation(_))));
	/// # });
	/// ```
	pub async fn create(&self, req: &Request, slug: &str, args: CreateArgs) -> Result<Document> {
		let collection = self.collection(slug)?;
		with_transaction(self, req, async {
			let op = before_operation(
				req,
				&collection.hooks.before_operation,
				OperationArgs {
					data: Some(args.data.clone()),
					..operation_args(collection, Operation::Create)
				},
			)
			.await?;
			let mut data = op.data.unwrap_or(args.data);

			if !args.override_access {
				execute_access(
					self,
					&collection.access.create,
					AccessArgs::new(req).with_data(Some(data.clone())),
					false,
				)
				.await?;
			}

			if let Some(upload) = &collection.upload
				&& let Some(file) = req.file()
			{
				data.extend(store_file(self, upload, file).await?);
			}

			let draft = args.draft && collection.drafts_enabled();
			let write = WriteContext {
				req,
				operation: Operation::Create,
				id: None,
				original_doc: None,
				override_access: args.override_access,
				draft,
			};
			before_validate(&collection.fields, &mut data, write).await?;
			let data = run_hooks(
				"beforeValidate",
				&collection.hooks.before_validate,
				data,
				|data| BeforeChangeArgs {
					data: data.clone(),
					original_doc: None,
					operation: Operation::Create,
					req: req.clone(),
				},
			)
			.await?;
			let mut data = run_hooks(
				"beforeChange",
				&collection.hooks.before_change,
				data,
				|data| BeforeChangeArgs {
					data: data.clone(),
					original_doc: None,
					operation: Operation::Create,
					req: req.clone(),
				},
			)
			.await?;
			before_change(self, &collection.fields, &mut data, write).await?;

			localize_write(self, req, &collection.fields, &mut data, None);
			stamp(
				&mut data,
				Operation::Create,
				collection.timestamps,
				collection.drafts_enabled(),
				draft,
			);

			let doc = self.db().create(slug, data, req.transaction().as_ref()).await?;
			tracing::debug!(collection = %slug, id = ?document_id(&doc), "created document");
			if collection.versions.is_some()
				&& let Some(id) = document_id(&doc)
			{
				save_version(self, req, slug, id, &doc, draft).await?;
			}

			let options = read_options(
				self,
				args.depth,
				0,
				args.override_access,
				args.show_hidden_fields,
				false,
			);
			let mut doc = read_pipeline(
				self,
				req,
				&collection.fields,
				&[],
				&collection.hooks.after_read,
				doc,
				None,
				options,
			)
			.await?;

			after_change(&collection.fields, &mut doc, write).await?;
			let doc = run_hooks(
				"afterChange",
				&collection.hooks.after_change,
				doc,
				|doc| AfterChangeArgs {
					doc: doc.clone(),
					previous_doc: None,
					operation: Operation::Create,
					req: req.clone(),
				},
			)
			.await?;

			expect_document(
				after_operation(
					req,
					&collection.hooks.after_operation,
					Operation::Create,
					OperationResult::Document(doc),
				)
				.await?,
			)
		})
		.await
	}

	/// Query a collection
	///
	/// Read access constrains the query; each returned document goes
	/// through the read pipeline concurrently.
	pub async fn find(&self, req: &Request, slug: &str, args: FindOptions) -> Result<PaginatedDocs> {
		let collection = self.collection(slug)?;
		with_transaction(self, req, async {
			let op = before_operation(
				req,
				&collection.hooks.before_operation,
				OperationArgs {
					where_: args.where_.clone(),
					..operation_args(collection, Operation::Read)
				},
			)
			.await?;

			let access_where = if args.override_access {
				None
			} else {
				execute_access(self, &collection.access.read, AccessArgs::new(req), false)
					.await?
					.into_where()
			};
			let query = Where::and_option(op.where_, access_where);

			let mut result = self
				.db()
				.find(
					slug,
					FindArgs::new()
						.with_where(query.clone())
						.with_sort(args.sort.as_deref().map(Sort::parse))
						.with_limit(args.limit)
						.with_page(args.page)
						.with_locale(req.locale().map(str::to_string))
						.with_transaction(req.transaction()),
				)
				.await?;
			tracing::debug!(collection = %slug, total = result.total_docs, "found documents");

			if args.draft && collection.drafts_enabled() {
				let docs = std::mem::take(&mut result.docs);
				result.docs = try_join_all(docs.into_iter().map(|doc| async move {
					match document_id(&doc).cloned() {
						Some(id) => replace_with_draft_if_available(self, req, slug, &id, doc).await,
						None => Ok(doc),
					}
				}))
				.await?;
			}

			let options = read_options(
				self,
				args.depth,
				0,
				args.override_access,
				args.show_hidden_fields,
				true,
			);
			let docs = std::mem::take(&mut result.docs);
			result.docs = try_join_all(docs.into_iter().map(|doc| {
				read_pipeline(
					self,
					req,
					&collection.fields,
					&collection.hooks.before_read,
					&collection.hooks.after_read,
					doc,
					query.as_ref(),
					options,
				)
			}))
			.await?;

			match after_operation(
				req,
				&collection.hooks.after_operation,
				Operation::Read,
				OperationResult::Documents(result),
			)
			.await?
			{
				OperationResult::Documents(result) => Ok(result),
				_ => Err(Error::hook(
					"afterOperation",
					"hook replaced a find result with a different kind",
				)),
			}
		})
		.await
	}

	/// Read one document by id
	///
	/// `None` only when `disable_errors` is set; otherwise a miss is
	/// `NotFound` and a denial `Forbidden`.
	pub async fn find_by_id(
		&self,
		req: &Request,
		slug: &str,
		args: FindByIdArgs,
	) -> Result<Option<Document>> {
		find_by_id_at(self, req, slug, args, 0).await
	}

	/// Apply a partial update to one document
	pub async fn update_by_id(&self, req: &Request, slug: &str, args: UpdateArgs) -> Result<Document> {
		let collection = self.collection(slug)?;
		with_transaction(self, req, async {
			let op = before_operation(
				req,
				&collection.hooks.before_operation,
				OperationArgs {
					id: Some(args.id.clone()),
					data: Some(args.data.clone()),
					..operation_args(collection, Operation::Update)
				},
			)
			.await?;
			let id = op.id.unwrap_or(args.id);
			let mut data = op.data.unwrap_or(args.data);

			let access = if args.override_access {
				AccessResult::Bool(true)
			} else {
				execute_access(
					self,
					&collection.access.update,
					AccessArgs::new(req)
						.with_id(Some(id.clone()))
						.with_data(Some(data.clone())),
					false,
				)
				.await?
			};
			let query = Where::and_option(
				Some(Where::field(ID_KEY).equals(id.clone())),
				access.clone().into_where(),
			)
			.unwrap_or(Where::Never);
			let Some(stored) = self
				.db()
				.find_one(slug, &query, req.transaction().as_ref())
				.await?
			else {
				return Err(not_found_or_forbidden(self, &access));
			};
			let original = flatten_original(self, req, &collection.fields, stored.clone());

			if let Some(upload) = &collection.upload
				&& let Some(file) = req.file()
			{
				data.extend(store_file(self, upload, file).await?);
			}

			let draft = args.draft && collection.drafts_enabled();
			let write = WriteContext {
				req,
				operation: Operation::Update,
				id: Some(&id),
				original_doc: Some(&original),
				override_access: args.override_access,
				draft,
			};
			before_validate(&collection.fields, &mut data, write).await?;
			let make_args = |data: &Document| BeforeChangeArgs {
				data: data.clone(),
				original_doc: Some(original.clone()),
				operation: Operation::Update,
				req: req.clone(),
			};
			let data = run_hooks("beforeValidate", &collection.hooks.before_validate, data, make_args).await?;
			let data = run_hooks("beforeChange", &collection.hooks.before_change, data, make_args).await?;

			let mut merged = Value::Object(original.clone());
			deep_merge(&mut merged, Value::Object(data));
			let Value::Object(mut result) = merged else {
				return Err(Error::Api("update produced a non-object document".to_string()));
			};
			before_change(self, &collection.fields, &mut result, write).await?;

			localize_write(self, req, &collection.fields, &mut result, Some(&stored));
			stamp(
				&mut result,
				Operation::Update,
				collection.timestamps,
				collection.drafts_enabled(),
				draft,
			);
			result.insert(ID_KEY.to_string(), id.clone());

			let doc = if draft {
				tracing::debug!(collection = %slug, id = %id, "saving draft without touching the document");
				save_version(self, req, slug, &id, &result, true).await?;
				result
			} else {
				let doc = self
					.db()
					.update_one(slug, &id, result, req.transaction().as_ref())
					.await?;
				if collection.versions.is_some() {
					save_version(self, req, slug, &id, &doc, false).await?;
				}
				doc
			};

			let options = read_options(
				self,
				args.depth,
				0,
				args.override_access,
				args.show_hidden_fields,
				false,
			);
			let mut doc = read_pipeline(
				self,
				req,
				&collection.fields,
				&[],
				&collection.hooks.after_read,
				doc,
				None,
				options,
			)
			.await?;

			after_change(&collection.fields, &mut doc, write).await?;
			let doc = run_hooks(
				"afterChange",
				&collection.hooks.after_change,
				doc,
				|doc| AfterChangeArgs {
					doc: doc.clone(),
					previous_doc: Some(original.clone()),
					operation: Operation::Update,
					req: req.clone(),
				},
			)
			.await?;

			expect_document(
				after_operation(
					req,
					&collection.hooks.after_operation,
					Operation::Update,
					OperationResult::Document(doc),
				)
				.await?,
			)
		})
		.await
	}

	/// Delete every document matching `where_`
	///
	/// A failure on one document is recorded in the result and does not stop
	/// the others.
	pub async fn delete(
		&self,
		req: &Request,
		slug: &str,
		args: DeleteArgs,
	) -> Result<BulkOperationResult> {
		let collection = self.collection(slug)?;
		with_transaction(self, req, async {
			let op = before_operation(
				req,
				&collection.hooks.before_operation,
				OperationArgs {
					where_: args.where_.clone(),
					..operation_args(collection, Operation::Delete)
				},
			)
			.await?;
			let Some(where_) = op.where_ else {
				return Err(Error::Api(self.t("error:missingWhere")));
			};

			let access_where = if args.override_access {
				None
			} else {
				execute_access(self, &collection.access.delete, AccessArgs::new(req), false)
					.await?
					.into_where()
			};
			let query = Where::and_option(Some(where_), access_where).unwrap_or(Where::Never);

			let found = self
				.db()
				.find(
					slug,
					FindArgs::new()
						.with_where(Some(query))
						.with_locale(req.locale().map(str::to_string))
						.with_transaction(req.transaction()),
				)
				.await?;

			let options = read_options(
				self,
				args.depth,
				0,
				args.override_access,
				args.show_hidden_fields,
				false,
			);
			let mut result = BulkOperationResult::default();
			let mut deleted_ids = Vec::new();
			for doc in found.docs {
				let Some(id) = document_id(&doc).cloned() else {
					continue;
				};
				match delete_document(self, req, collection, &id, doc, options).await {
					Ok(doc) => {
						deleted_ids.push(id);
						result.docs.push(doc);
					}
					Err(err) => {
						tracing::warn!(collection = %slug, id = %id, error = %err, "failed to delete document");
						result.errors.push(BulkError {
							id,
							message: err.to_string(),
						});
					}
				}
			}

			delete_user_preferences(self, req, slug, &deleted_ids).await?;

			match after_operation(
				req,
				&collection.hooks.after_operation,
				Operation::Delete,
				OperationResult::Bulk(result),
			)
			.await?
			{
				OperationResult::Bulk(result) => Ok(result),
				_ => Err(Error::hook(
					"afterOperation",
					"hook replaced a bulk result with a different kind",
				)),
			}
		})
		.await
	}

	/// Delete one document by id
	pub async fn delete_by_id(
		&self,
		req: &Request,
		slug: &str,
		id: impl Into<Value>,
		args: DeleteArgs,
	) -> Result<Document> {
		let collection = self.collection(slug)?;
		let id = id.into();
		with_transaction(self, req, async {
			let op = before_operation(
				req,
				&collection.hooks.before_operation,
				OperationArgs {
					id: Some(id.clone()),
					..operation_args(collection, Operation::Delete)
				},
			)
			.await?;
			let id = op.id.unwrap_or(id);

			let access = if args.override_access {
				AccessResult::Bool(true)
			} else {
				execute_access(
					self,
					&collection.access.delete,
					AccessArgs::new(req).with_id(Some(id.clone())),
					false,
				)
				.await?
			};
			let query = Where::and_option(
				Some(Where::field(ID_KEY).equals(id.clone())),
				access.clone().into_where(),
			)
			.unwrap_or(Where::Never);
			let Some(doc) = self
				.db()
				.find_one(slug, &query, req.transaction().as_ref())
				.await?
			else {
				return Err(not_found_or_forbidden(self, &access));
			};

			let options = read_options(
				self,
				args.depth,
				0,
				args.override_access,
				args.show_hidden_fields,
				false,
			);
			let doc = delete_document(self, req, collection, &id, doc, options).await?;
			delete_user_preferences(self, req, slug, std::slice::from_ref(&id)).await?;

			expect_document(
				after_operation(
					req,
					&collection.hooks.after_operation,
					Operation::Delete,
					OperationResult::Document(doc),
				)
				.await?,
			)
		})
		.await
	}
}

/// Remove one document with its files and versions
async fn delete_document(
	folio: &Folio,
	req: &Request,
	collection: &CollectionConfig,
	id: &Value,
	doc: Document,
	options: ReadOptions,
) -> Result<Document> {
	let slug = collection.slug.as_str();
	run_hooks("beforeDelete", &collection.hooks.before_delete, (), |_| BeforeDeleteArgs {
		id: id.clone(),
		req: req.clone(),
	})
	.await?;

	if let Some(upload) = &collection.upload {
		delete_associated_files(folio, upload, &doc).await?;
	}
	folio
		.db()
		.delete_one(slug, id, req.transaction().as_ref())
		.await?;
	if collection.versions.is_some() {
		delete_versions(folio, req, slug, id).await?;
	}
	tracing::debug!(collection = %slug, id = %id, "deleted document");

	let doc = read_pipeline(
		folio,
		req,
		&collection.fields,
		&[],
		&collection.hooks.after_read,
		doc,
		None,
		options,
	)
	.await?;
	run_hooks("afterDelete", &collection.hooks.after_delete, doc, |doc| AfterDeleteArgs {
		id: id.clone(),
		doc: doc.clone(),
		req: req.clone(),
	})
	.await
}
