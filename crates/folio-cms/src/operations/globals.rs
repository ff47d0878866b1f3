//! Global operations
//!
//! A global is a singleton: reading one that was never saved yields `{}`
//! shaped by its fields, and updating one that was never saved creates it.

use super::{flatten_original, localize_write, read_pipeline, stamp};
use crate::access::{AccessArgs, AccessResult, execute_access};
use crate::app::Folio;
use crate::fields::phases::{ReadOptions, WriteContext, after_change, before_change, before_validate};
use crate::hooks::{AfterChangeArgs, BeforeChangeArgs, run_hooks};
use crate::request::Request;
use crate::transaction::with_transaction;
use crate::versions::{replace_with_draft_if_available, save_version};
use folio_core::types::deep_merge;
use folio_core::{Document, Error, Operation, Result};
use folio_db::GlobalArgs;
use serde_json::Value;

/// Arguments of [`Folio::find_global`]
#[derive(Debug, Clone, Default)]
pub struct FindGlobalArgs {
	pub depth: Option<u32>,
	pub draft: bool,
	pub override_access: bool,
	pub show_hidden_fields: bool,
}

impl FindGlobalArgs {
	pub fn new() -> Self {
		Self::default()
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

/// Arguments of [`Folio::update_global`]
#[derive(Debug, Clone, Default)]
pub struct UpdateGlobalArgs {
	pub data: Document,
	pub depth: Option<u32>,
	pub draft: bool,
	pub override_access: bool,
	pub show_hidden_fields: bool,
}

impl UpdateGlobalArgs {
	pub fn new(data: Document) -> Self {
		Self {
			data,
			..Default::default()
		}
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

fn global_args(req: &Request, where_: Option<folio_core::Where>) -> GlobalArgs {
	GlobalArgs {
		where_,
		locale: req.locale().map(str::to_string),
		transaction: req.transaction(),
	}
}

impl Folio {
	/// Read a global
	///
	/// # Examples
	///
	/// ```
	/// use folio_cms::prelude::*;
	/// use serde_json::json;
	///
	/// # tokio_test::block_on(async {
	/// let folio = Folio::builder()
	///     .global(
	///         GlobalConfig::new("header")
	///             .field(Field::text("tagline").default_value("Hello"))
	///             .read_access(Access::allow()),
	///     )
	///     .database(folio_db::MemoryAdapter::new())
	///     .build()
	///     .unwrap();
	/// let req = Request::builder(&folio).build();
	///
	/// let header = folio.find_global(&req, "header", FindGlobalArgs::new()).await.unwrap();
	/// assert_eq!(header["tagline"], json!("Hello"));
	/// # });
	/// ```
	pub async fn find_global(&self, req: &Request, slug: &str, args: FindGlobalArgs) -> Result<Document> {
		let global = self.global(slug)?;
		with_transaction(self, req, async {
			let query = if args.override_access {
				None
			} else {
				execute_access(self, &global.access.read, AccessArgs::new(req), false)
					.await?
					.into_where()
			};

			let mut doc = self
				.db()
				.find_global(slug, global_args(req, query.clone()))
				.await?
				.unwrap_or_default();
			if args.draft && global.drafts_enabled() {
				let parent = Value::String(slug.to_string());
				doc = replace_with_draft_if_available(self, req, slug, &parent, doc).await?;
			}

			let options = ReadOptions {
				depth: self.settings().effective_depth(args.depth),
				current_depth: 0,
				override_access: args.override_access,
				show_hidden_fields: args.show_hidden_fields,
				find_many: false,
			};
			read_pipeline(
				self,
				req,
				&global.fields,
				&global.hooks.before_read,
				&global.hooks.after_read,
				doc,
				query.as_ref(),
				options,
			)
			.await
		})
		.await
	}

	/// Apply a partial update to a global, creating it on first save
	pub async fn update_global(
		&self,
		req: &Request,
		slug: &str,
		args: UpdateGlobalArgs,
	) -> Result<Document> {
		let global = self.global(slug)?;
		with_transaction(self, req, async {
			let mut data = args.data;
			let access = if args.override_access {
				AccessResult::Bool(true)
			} else {
				execute_access(
					self,
					&global.access.update,
					AccessArgs::new(req).with_data(Some(data.clone())),
					false,
				)
				.await?
			};

			let stored = self.db().find_global(slug, global_args(req, None)).await?;
			if let Some(stored) = &stored
				&& !access.permits(stored)
			{
				return Err(Error::Forbidden(self.t("error:notAllowedToPerformAction")));
			}
			// hooks always see an update; only the timestamps mark the first save
			let stamp_operation = if stored.is_some() {
				Operation::Update
			} else {
				Operation::Create
			};
			let stored = stored.unwrap_or_default();
			let original = flatten_original(self, req, &global.fields, stored.clone());

			let draft = args.draft && global.drafts_enabled();
			let write = WriteContext {
				req,
				operation: Operation::Update,
				id: None,
				original_doc: Some(&original),
				override_access: args.override_access,
				draft,
			};
			before_validate(&global.fields, &mut data, write).await?;
			let make_args = |data: &Document| BeforeChangeArgs {
				data: data.clone(),
				original_doc: Some(original.clone()),
				operation: Operation::Update,
				req: req.clone(),
			};
			let data = run_hooks("beforeValidate", &global.hooks.before_validate, data, make_args).await?;
			let data = run_hooks("beforeChange", &global.hooks.before_change, data, make_args).await?;

			let mut merged = Value::Object(original.clone());
			deep_merge(&mut merged, Value::Object(data));
			let Value::Object(mut result) = merged else {
				return Err(Error::Api("update produced a non-object document".to_string()));
			};
			before_change(self, &global.fields, &mut result, write).await?;
			localize_write(self, req, &global.fields, &mut result, Some(&stored));
			stamp(&mut result, stamp_operation, true, global.drafts_enabled(), draft);

			let parent = Value::String(slug.to_string());
			let doc = if draft {
				save_version(self, req, slug, &parent, &result, true).await?;
				result
			} else {
				let doc = self
					.db()
					.upsert_global(slug, result, req.transaction().as_ref())
					.await?;
				if global.versions.is_some() {
					save_version(self, req, slug, &parent, &doc, false).await?;
				}
				doc
			};
			tracing::debug!(global = %slug, draft, "updated global");

			let options = ReadOptions {
				depth: self.settings().effective_depth(args.depth),
				current_depth: 0,
				override_access: args.override_access,
				show_hidden_fields: args.show_hidden_fields,
				find_many: false,
			};
			let mut doc = read_pipeline(
				self,
				req,
				&global.fields,
				&[],
				&global.hooks.after_read,
				doc,
				None,
				options,
			)
			.await?;

			after_change(&global.fields, &mut doc, write).await?;
			run_hooks("afterChange", &global.hooks.after_change, doc, |doc| AfterChangeArgs {
				doc: doc.clone(),
				previous_doc: Some(original.clone()),
				operation: Operation::Update,
				req: req.clone(),
			})
			.await
		})
		.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::access::Access;
	use crate::config::{GlobalConfig, VersionsConfig};
	use crate::fields::Field;
	use folio_db::MemoryAdapter;
	use rstest::{fixture, rstest};
	use serde_json::json;
	use std::sync::Arc;

	#[fixture]
	fn folio() -> Folio {
		Folio::builder()
			.global(
				GlobalConfig::new("footer")
					.fields([Field::text("copyright").required(), Field::text("note")])
					.versions(VersionsConfig::with_drafts())
					.read_access(Access::allow())
					.update_access(Access::allow()),
			)
			.database(MemoryAdapter::new())
			.build()
			.unwrap()
	}

	fn data(value: Value) -> Document {
		value.as_object().cloned().unwrap()
	}

	#[rstest]
	#[tokio::test]
	async fn test_unsaved_global_reads_empty(folio: Folio) {
		let req = Request::builder(&folio).build();
		let doc = folio.find_global(&req, "footer", FindGlobalArgs::new()).await.unwrap();
		assert!(!doc.contains_key("copyright"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_partial_update_keeps_other_fields(folio: Folio) {
		let req = Request::builder(&folio).build();
		folio
			.update_global(&req, "footer", UpdateGlobalArgs::new(data(json!({"copyright": "2024", "note": "a"}))))
			.await
			.unwrap();
		let doc = folio
			.update_global(&req, "footer", UpdateGlobalArgs::new(data(json!({"note": "b"}))))
			.await
			.unwrap();
		assert_eq!(doc["copyright"], json!("2024"));
		assert_eq!(doc["note"], json!("b"));
		assert_eq!(doc["_status"], json!("published"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_draft_skips_validation_and_is_read_back_on_request(folio: Folio) {
		let req = Request::builder(&folio).build();
		folio
			.update_global(&req, "footer", UpdateGlobalArgs::new(data(json!({"copyright": "2024"}))))
			.await
			.unwrap();
		tokio::time::sleep(std::time::Duration::from_millis(5)).await;
		folio
			.update_global(
				&req,
				"footer",
				UpdateGlobalArgs::new(data(json!({"copyright": null, "note": "wip"}))).with_draft(true),
			)
			.await
			.unwrap();

		let published = folio.find_global(&req, "footer", FindGlobalArgs::new()).await.unwrap();
		assert_eq!(published["copyright"], json!("2024"));
		assert!(!published.contains_key("note"));

		let draft = folio
			.find_global(&req, "footer", FindGlobalArgs::new().with_draft(true))
			.await
			.unwrap();
		assert_eq!(draft["note"], json!("wip"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_first_save_stamps_created_at_once() {
		// Arrange
		let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
		let seen_in_hook = seen.clone();
		let folio = Folio::builder()
			.global(
				GlobalConfig::new("banner")
					.field(Field::text("message"))
					.read_access(Access::allow())
					.update_access(Access::allow())
					.before_change(move |args: BeforeChangeArgs| {
						let seen = seen_in_hook.clone();
						async move {
							seen.lock().push(args.operation);
							Ok(None)
						}
					}),
			)
			.database(MemoryAdapter::new())
			.build()
			.unwrap();
		let req = Request::builder(&folio).build();

		// Act
		let first = folio
			.update_global(&req, "banner", UpdateGlobalArgs::new(data(json!({"message": "hello"}))))
			.await
			.unwrap();
		let second = folio
			.update_global(&req, "banner", UpdateGlobalArgs::new(data(json!({"message": "bye"}))))
			.await
			.unwrap();

		// Assert
		assert!(first["createdAt"].is_string());
		assert_eq!(second["createdAt"], first["createdAt"]);
		assert!(second["updatedAt"].is_string());
		assert_eq!(*seen.lock(), vec![Operation::Update, Operation::Update]);
	}
}
