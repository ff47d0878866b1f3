//! Relationship and rich-text population
//!
//! References are resolved through the request's [`DocumentLoader`], so the
//! same document at the same depth is fetched at most once per request.
//! Each hop passes `current_depth + 1`; once the budget is spent references
//! stay unexpanded, which also ends cycles.
//!
//! [`DocumentLoader`]: crate::loader::DocumentLoader

use crate::app::Folio;
use crate::fields::phases::ReadOptions;
use crate::fields::{Field, FieldKind, RelationTo};
use crate::loader::LoaderKey;
use crate::operations::collections::{FindByIdArgs, find_by_id_boxed};
use crate::request::Request;
use folio_core::Document;
use folio_core::types::{ID_KEY, id_to_string};
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use serde_json::Value;

/// Depth budget for a field, capped by its own `max_depth`
fn field_depth(field: &Field, options: &ReadOptions) -> u32 {
	let max_depth = match &field.kind {
		FieldKind::Relationship { max_depth, .. } | FieldKind::RichText { max_depth } => *max_depth,
		_ => None,
	};
	max_depth.map_or(options.depth, |max| max.min(options.depth))
}

/// Resolve one reference, `None` when it is missing or unreadable
pub(crate) async fn fetch_related(
	folio: &Folio,
	req: &Request,
	collection: &str,
	id: &Value,
	depth: u32,
	options: ReadOptions,
) -> Option<Document> {
	let id_key = id_to_string(id)?;
	if folio.collection(collection).is_err() {
		tracing::debug!(collection, "reference to unknown collection left unresolved");
		return None;
	}
	let key = LoaderKey {
		transaction: req.transaction(),
		collection: collection.to_string(),
		id: id_key,
		depth,
		current_depth: options.current_depth + 1,
		locale: req.locale().map(str::to_string),
		fallback_locale: req.fallback_locale().map(str::to_string),
		override_access: options.override_access,
		show_hidden_fields: options.show_hidden_fields,
	};

	let folio = folio.clone();
	let weak = req.downgrade();
	let slug = collection.to_string();
	let id = id.clone();
	req.loader()
		.load(key, move || {
			async move {
				let req = weak.upgrade()?;
				let args = FindByIdArgs {
					depth: Some(depth),
					override_access: options.override_access,
					show_hidden_fields: options.show_hidden_fields,
					disable_errors: true,
					..FindByIdArgs::new(id)
				};
				match find_by_id_boxed(folio, slug.clone(), args, req, options.current_depth + 1).await {
					Ok(doc) => doc,
					Err(err) => {
						tracing::debug!(collection = %slug, error = %err, "relationship left unresolved");
						None
					}
				}
			}
			.boxed()
		})
		.await
}

/// Expand a relationship value in place
pub(crate) async fn populate_relationship(
	folio: &Folio,
	req: &Request,
	field: &Field,
	value: &mut Value,
	options: ReadOptions,
) {
	let FieldKind::Relationship {
		relation_to,
		has_many,
		..
	} = &field.kind
	else {
		return;
	};
	let depth = field_depth(field, &options);
	if options.current_depth >= depth || value.is_null() {
		return;
	}

	if *has_many && let Value::Array(items) = value {
		join_all(
			items
				.iter_mut()
				.map(|item| populate_reference(folio, req, relation_to, item, depth, options)),
		)
		.await;
	} else {
		populate_reference(folio, req, relation_to, value, depth, options).await;
	}
}

async fn populate_reference(
	folio: &Folio,
	req: &Request,
	relation_to: &RelationTo,
	item: &mut Value,
	depth: u32,
	options: ReadOptions,
) {
	match relation_to {
		RelationTo::One(slug) => {
			if item.is_object() {
				return;
			}
			let resolved = fetch_related(folio, req, slug, item, depth, options).await;
			*item = resolved.map_or(Value::Null, Value::Object);
		}
		RelationTo::Many(_) => {
			let Value::Object(reference) = item else {
				return;
			};
			let Some(slug) = reference.get("relationTo").and_then(Value::as_str).map(str::to_string)
			else {
				return;
			};
			let Some(id) = reference.get("value").filter(|v| !v.is_object()).cloned() else {
				return;
			};
			let resolved = fetch_related(folio, req, &slug, &id, depth, options).await;
			reference.insert("value".to_string(), resolved.map_or(Value::Null, Value::Object));
		}
	}
}

/// Expand relationship and upload nodes of rich text in place
///
/// Nodes whose target cannot be resolved keep their place with a `null`
/// value.
pub(crate) async fn populate_rich_text(
	folio: &Folio,
	req: &Request,
	field: &Field,
	value: &mut Value,
	options: ReadOptions,
) {
	let depth = field_depth(field, &options);
	if options.current_depth >= depth {
		return;
	}
	if let Value::Array(nodes) = value {
		populate_nodes(folio, req, nodes, depth, options).await;
	}
}

fn populate_nodes<'a>(
	folio: &'a Folio,
	req: &'a Request,
	nodes: &'a mut [Value],
	depth: u32,
	options: ReadOptions,
) -> BoxFuture<'a, ()> {
	async move {
		for node in nodes.iter_mut().filter_map(Value::as_object_mut) {
			let is_reference = matches!(
				node.get("type").and_then(Value::as_str),
				Some("relationship" | "upload")
			);
			if is_reference
				&& let Some(slug) = node.get("relationTo").and_then(Value::as_str).map(str::to_string)
				&& let Some(id) = node.get("value").and_then(|v| v.get(ID_KEY)).cloned()
			{
				let resolved = fetch_related(folio, req, &slug, &id, depth, options).await;
				node.insert("value".to_string(), resolved.map_or(Value::Null, Value::Object));
			}
			if let Some(Value::Array(children)) = node.get_mut("children") {
				populate_nodes(folio, req, children, depth, options).await;
			}
		}
	}
	.boxed()
}
