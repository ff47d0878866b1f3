//! Generic field-tree walker
//!
//! Walks a field schema and the data tree shaped by it in lockstep,
//! depth-first and strictly in field order. What happens at each field is
//! decided by a [`FieldPhase`]; the walker owns the structural rules shared
//! by every phase (conditions, row identity, block matching, tabs).

use super::{Field, FieldKind};
use async_trait::async_trait;
use folio_core::types::{BLOCK_TYPE_KEY, ID_KEY};
use folio_core::{Document, Result};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;

/// Whether a phase transforms incoming data or outgoing documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
	Read,
	Write,
}

/// Where the walker currently is
#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldCx<'a> {
	/// Dot-joined path, row indexes included (`items.0.title`)
	pub path: &'a str,
	/// Snapshot of the whole document taken before the walk
	pub data: &'a Document,
	/// Snapshot of the enclosing scope at the time the field is reached
	pub sibling_data: &'a Document,
	/// The field or one of its ancestors is localized
	pub in_localized: bool,
}

#[async_trait]
pub(crate) trait FieldPhase: Send + Sync {
	fn direction(&self) -> Direction;

	/// Localized values still hold one entry per locale
	fn all_locales(&self) -> bool {
		false
	}

	/// Whether unmet conditions strip fields during this phase
	fn checks_conditions(&self) -> bool {
		true
	}

	/// Whether the field may stay in the document at all
	async fn admit(&self, _field: &Field, _cx: &FieldCx<'_>) -> Result<bool> {
		Ok(true)
	}

	/// Transform the field's own value, before its children are walked
	async fn visit(&self, field: &Field, value: &mut Value, cx: &FieldCx<'_>) -> Result<()>;
}

/// Walk `fields` over `doc`
pub(crate) async fn traverse(
	phase: &dyn FieldPhase,
	fields: &[Field],
	doc: &mut Document,
) -> Result<()> {
	let data = doc.clone();
	traverse_fields(phase, fields, doc, &data, "", false).await
}

fn join(prefix: &str, name: &str) -> String {
	if prefix.is_empty() {
		name.to_string()
	} else {
		format!("{prefix}.{name}")
	}
}

fn traverse_fields<'a>(
	phase: &'a dyn FieldPhase,
	fields: &'a [Field],
	scope: &'a mut Document,
	data: &'a Document,
	prefix: &'a str,
	in_localized: bool,
) -> BoxFuture<'a, Result<()>> {
	async move {
		for field in fields {
			match &field.kind {
				FieldKind::Tabs { tabs } => {
					for tab in tabs {
						match &tab.name {
							None => {
								traverse_fields(phase, &tab.fields, scope, data, prefix, in_localized)
									.await?
							}
							Some(name) => {
								let path = join(prefix, name);
								if phase.direction() == Direction::Write
									&& !scope.get(name).is_some_and(Value::is_object)
								{
									scope.insert(name.clone(), Value::Object(Document::new()));
								}
								if let Some(Value::Object(nested)) = scope.get_mut(name) {
									traverse_fields(phase, &tab.fields, nested, data, &path, in_localized)
										.await?;
								}
							}
						}
					}
				}
				_ => visit_field(phase, field, scope, data, prefix, in_localized).await?,
			}
		}
		Ok(())
	}
	.boxed()
}

async fn visit_field(
	phase: &dyn FieldPhase,
	field: &Field,
	scope: &mut Document,
	data: &Document,
	prefix: &str,
	in_localized: bool,
) -> Result<()> {
	let name = field.name();
	let path = join(prefix, name);
	let direction = phase.direction();

	if phase.checks_conditions()
		&& let Some(condition) = &field.options.condition
		&& !condition(data, &*scope)
	{
		if direction == Direction::Write {
			scope.remove(name);
		}
		return Ok(());
	}

	let sibling = scope.clone();
	let cx = FieldCx {
		path: &path,
		data,
		sibling_data: &sibling,
		in_localized: in_localized || field.options.localized,
	};

	if !phase.admit(field, &cx).await? {
		tracing::debug!(path = %path, "field removed by access");
		scope.remove(name);
		return Ok(());
	}

	let inserted = !scope.contains_key(name);
	if inserted {
		scope.insert(name.to_string(), Value::Null);
	}
	let Some(value) = scope.get_mut(name) else {
		return Ok(());
	};

	// only the outermost localized field holds the locale map
	let fan_out = direction == Direction::Read
		&& phase.all_locales()
		&& field.options.localized
		&& !in_localized;
	if fan_out && let Value::Object(locales) = value {
		for localized in locales.values_mut() {
			visit_value(phase, field, localized, &cx).await?;
		}
	} else {
		visit_value(phase, field, value, &cx).await?;
	}

	if inserted && scope.get(name).is_some_and(Value::is_null) {
		scope.remove(name);
	}
	Ok(())
}

async fn visit_value(
	phase: &dyn FieldPhase,
	field: &Field,
	value: &mut Value,
	cx: &FieldCx<'_>,
) -> Result<()> {
	phase.visit(field, value, cx).await?;

	let write = phase.direction() == Direction::Write;
	match &field.kind {
		FieldKind::Group { fields } => {
			if write && !value.is_object() {
				*value = Value::Object(Document::new());
			}
			if let Value::Object(scope) = value {
				traverse_fields(phase, fields, scope, cx.data, cx.path, cx.in_localized).await?;
			}
		}
		FieldKind::Array { fields, .. } => {
			let Value::Array(rows) = value else {
				return Ok(());
			};
			for (index, row) in rows.iter_mut().enumerate() {
				let Value::Object(row) = row else {
					continue;
				};
				if write {
					ensure_row_id(row);
				}
				let path = format!("{}.{index}", cx.path);
				traverse_fields(phase, fields, row, cx.data, &path, cx.in_localized).await?;
			}
		}
		FieldKind::Blocks { blocks, .. } => {
			let Value::Array(rows) = value else {
				return Ok(());
			};
			let mut unmatched = Vec::new();
			for (index, row) in rows.iter_mut().enumerate() {
				let Value::Object(row) = row else {
					continue;
				};
				let block = row
					.get(BLOCK_TYPE_KEY)
					.and_then(Value::as_str)
					.and_then(|block_type| blocks.iter().find(|b| b.slug == block_type));
				let Some(block) = block else {
					// unknown block types are left alone on write
					if !write {
						unmatched.push(index);
					}
					continue;
				};
				if write {
					ensure_row_id(row);
				}
				let path = format!("{}.{index}", cx.path);
				traverse_fields(phase, &block.fields, row, cx.data, &path, cx.in_localized)
					.await?;
			}
			if !unmatched.is_empty() {
				tracing::debug!(path = %cx.path, rows = ?unmatched, "omitting rows of unregistered block types");
				let mut index = 0;
				rows.retain(|_| {
					let keep = !unmatched.contains(&index);
					index += 1;
					keep
				});
			}
		}
		_ => {}
	}
	Ok(())
}

fn ensure_row_id(row: &mut Document) {
	if row.get(ID_KEY).is_none_or(Value::is_null) {
		row.insert(
			ID_KEY.to_string(),
			Value::String(uuid::Uuid::new_v4().to_string()),
		);
	}
}
