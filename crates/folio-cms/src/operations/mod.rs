//! Operations
//!
//! Every entry point is a method on [`Folio`](crate::app::Folio) taking the
//! [`Request`] it runs for. Operations run inside the request's transaction
//! and call each other freely; only the outermost one commits.

pub mod access;
pub mod auth;
pub mod collections;
pub mod globals;
pub mod preferences;
pub(crate) mod uploads;

use crate::app::Folio;
use crate::fields::Field;
use crate::fields::phases::{ReadOptions, after_read};
use crate::hooks::{
	AfterOperationArgs, AfterReadArgs, BeforeOperationArgs, BeforeReadArgs, Hook, OperationArgs,
	OperationResult, run_hooks,
};
use crate::localization::{localize_for_read, merge_for_write};
use crate::request::Request;
use crate::versions::{DRAFT, PUBLISHED, STATUS_KEY, now};
use folio_core::{Document, Error, Operation, Result, Where};
use serde_json::Value;

pub(crate) async fn before_operation(
	req: &Request,
	hooks: &[Hook<BeforeOperationArgs, OperationArgs>],
	args: OperationArgs,
) -> Result<OperationArgs> {
	run_hooks("beforeOperation", hooks, args, |args| BeforeOperationArgs {
		args: args.clone(),
		req: req.clone(),
	})
	.await
}

pub(crate) async fn after_operation(
	req: &Request,
	hooks: &[Hook<AfterOperationArgs, OperationResult>],
	operation: Operation,
	result: OperationResult,
) -> Result<OperationResult> {
	run_hooks("afterOperation", hooks, result, |result| AfterOperationArgs {
		operation,
		result: result.clone(),
		req: req.clone(),
	})
	.await
}

/// `beforeRead` hooks, field `afterRead`, then `afterRead` hooks
#[allow(clippy::too_many_arguments)]
pub(crate) async fn read_pipeline(
	folio: &Folio,
	req: &Request,
	fields: &[Field],
	before_read: &[Hook<BeforeReadArgs, Document>],
	after_read_hooks: &[Hook<AfterReadArgs, Document>],
	doc: Document,
	query: Option<&Where>,
	options: ReadOptions,
) -> Result<Document> {
	let doc = run_hooks("beforeRead", before_read, doc, |doc| BeforeReadArgs {
		doc: doc.clone(),
		query: query.cloned(),
		req: req.clone(),
	})
	.await?;
	let doc = after_read(folio, req, fields, doc, options).await?;
	run_hooks("afterRead", after_read_hooks, doc, |doc| AfterReadArgs {
		doc: doc.clone(),
		query: query.cloned(),
		find_many: options.find_many,
		req: req.clone(),
	})
	.await
}

/// Stored document flattened to the request locale, without fallback
pub(crate) fn flatten_original(
	folio: &Folio,
	req: &Request,
	fields: &[Field],
	mut doc: Document,
) -> Document {
	if let Some(l10n) = &folio.settings().localization {
		localize_for_read(fields, &mut doc, l10n, req.locale(), None);
	}
	doc
}

/// Fold localized values of `data` into the stored locale maps
pub(crate) fn localize_write(
	folio: &Folio,
	req: &Request,
	fields: &[Field],
	data: &mut Document,
	original: Option<&Document>,
) {
	if let Some(l10n) = &folio.settings().localization {
		let locale = req.locale().unwrap_or(l10n.default_locale.as_str());
		merge_for_write(fields, data, original, l10n, locale);
	}
}

/// Set `createdAt`/`updatedAt` and, for drafts-enabled entities, `_status`
pub(crate) fn stamp(
	data: &mut Document,
	operation: Operation,
	timestamps: bool,
	drafts: bool,
	draft: bool,
) {
	if timestamps {
		let now = Value::String(now());
		if operation == Operation::Create && data.get("createdAt").is_none_or(Value::is_null) {
			data.insert("createdAt".to_string(), now.clone());
		}
		data.insert("updatedAt".to_string(), now);
	}
	if drafts {
		let status = if draft { DRAFT } else { PUBLISHED };
		data.insert(STATUS_KEY.to_string(), Value::String(status.to_string()));
	}
}

/// Unwrap the document an `afterOperation` hook chain produced
pub(crate) fn expect_document(result: OperationResult) -> Result<Document> {
	match result {
		OperationResult::Document(doc) => Ok(doc),
		_ => Err(Error::hook(
			"afterOperation",
			"hook replaced a document result with a different kind",
		)),
	}
}
