//! Field-level lifecycle phases
//!
//! Each phase is a [`FieldPhase`] run by the walker: `beforeValidate`
//! (access, defaults, coercion), `beforeChange` (hooks and validation),
//! `afterChange`, and `afterRead` (access, hidden fields, population).

use super::traverse::{Direction, FieldCx, FieldPhase, traverse};
use super::validate::default_validate;
use super::{Field, FieldKind, HookPhase, ValidateContext};
use crate::access::{AccessArgs, field_permits};
use crate::app::Folio;
use crate::hooks::{FieldHookArgs, run_hooks};
use crate::localization::localize_for_read;
use crate::populate::{populate_relationship, populate_rich_text};
use crate::request::Request;
use async_trait::async_trait;
use folio_core::types::document_id;
use folio_core::{Document, Operation, Result, ValidationErrors};
use parking_lot::Mutex;
use serde_json::{Number, Value};

/// What a write is doing, shared by the write phases
#[derive(Debug, Clone, Copy)]
pub(crate) struct WriteContext<'a> {
	pub req: &'a Request,
	pub operation: Operation,
	pub id: Option<&'a Value>,
	/// Stored document before the write, flattened to the request locale
	pub original_doc: Option<&'a Document>,
	pub override_access: bool,
	/// Saving a draft skips validation
	pub draft: bool,
}

/// How a read resolves relationships and access
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReadOptions {
	pub depth: u32,
	pub current_depth: u32,
	pub override_access: bool,
	pub show_hidden_fields: bool,
	pub find_many: bool,
}

async fn run_field_hooks(
	field: &Field,
	phase: HookPhase,
	value: &mut Value,
	cx: &FieldCx<'_>,
	req: &Request,
	operation: Operation,
	original_doc: Option<&Document>,
	find_many: bool,
) -> Result<()> {
	let hooks = field.hook_list(phase);
	if hooks.is_empty() {
		return Ok(());
	}
	let current = std::mem::take(value);
	*value = run_hooks(phase.as_str(), hooks, current, |value| FieldHookArgs {
		value: value.clone(),
		path: cx.path.to_string(),
		data: cx.data.clone(),
		sibling_data: cx.sibling_data.clone(),
		original_doc: original_doc.cloned(),
		operation,
		find_many,
		req: req.clone(),
	})
	.await?;
	Ok(())
}

/// Coerce loosely typed input into the field's storage shape
fn coerce(field: &Field, value: &mut Value) {
	let replacement = match (&field.kind, &*value) {
		(FieldKind::Number { .. }, Value::String(s)) => {
			let s = s.trim();
			if s.is_empty() {
				Some(Value::Null)
			} else if let Ok(n) = s.parse::<i64>() {
				Some(Value::Number(n.into()))
			} else {
				s.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
			}
		}
		(FieldKind::Checkbox, Value::String(s)) => match s.as_str() {
			"true" => Some(Value::Bool(true)),
			"false" => Some(Value::Bool(false)),
			_ => None,
		},
		(FieldKind::Date, Value::String(s)) if s.is_empty() => Some(Value::Null),
		_ => None,
	};
	if let Some(replacement) = replacement {
		*value = replacement;
		return;
	}

	if let FieldKind::Relationship { has_many, .. } = &field.kind {
		if *has_many && let Value::Array(items) = value {
			items.iter_mut().for_each(unpopulate);
		} else {
			unpopulate(value);
		}
	}
}

/// Turn a populated relationship value back into a reference
fn unpopulate(value: &mut Value) {
	match value {
		Value::String(s) if s.is_empty() => *value = Value::Null,
		Value::Object(obj) if obj.contains_key("relationTo") => {
			if let Some(inner) = obj.get_mut("value") {
				unpopulate(inner);
			}
		}
		Value::Object(obj) => {
			if let Some(id) = document_id(obj).cloned() {
				*value = id;
			}
		}
		_ => {}
	}
}

struct BeforeValidate<'a> {
	write: WriteContext<'a>,
}

#[async_trait]
impl FieldPhase for BeforeValidate<'_> {
	fn direction(&self) -> Direction {
		Direction::Write
	}

	// a partial update lacks the stored siblings; beforeChange decides on the merged document
	fn checks_conditions(&self) -> bool {
		self.write.operation != Operation::Update
	}

	async fn admit(&self, field: &Field, cx: &FieldCx<'_>) -> Result<bool> {
		if self.write.override_access {
			return Ok(true);
		}
		let rule = match self.write.operation {
			Operation::Create => field.options.access.create.as_ref(),
			Operation::Update => field.options.access.update.as_ref(),
			_ => None,
		};
		let Some(rule) = rule else {
			return Ok(true);
		};
		let args = AccessArgs::new(self.write.req)
			.with_id(self.write.id.cloned())
			.with_data(Some(cx.data.clone()))
			.with_doc(self.write.original_doc.cloned())
			.with_sibling_data(Some(cx.sibling_data.clone()));
		Ok(field_permits(rule, args).await)
	}

	async fn visit(&self, field: &Field, value: &mut Value, cx: &FieldCx<'_>) -> Result<()> {
		if self.write.operation == Operation::Create
			&& value.is_null()
			&& let Some(default) = &field.options.default_value
		{
			*value = default.clone();
		}
		coerce(field, value);
		run_field_hooks(
			field,
			HookPhase::BeforeValidate,
			value,
			cx,
			self.write.req,
			self.write.operation,
			self.write.original_doc,
			false,
		)
		.await
	}
}

struct BeforeChange<'a> {
	folio: &'a Folio,
	write: WriteContext<'a>,
	errors: Mutex<ValidationErrors>,
}

#[async_trait]
impl FieldPhase for BeforeChange<'_> {
	fn direction(&self) -> Direction {
		Direction::Write
	}

	async fn visit(&self, field: &Field, value: &mut Value, cx: &FieldCx<'_>) -> Result<()> {
		run_field_hooks(
			field,
			HookPhase::BeforeChange,
			value,
			cx,
			self.write.req,
			self.write.operation,
			self.write.original_doc,
			false,
		)
		.await?;

		if self.write.draft {
			return Ok(());
		}
		// other locales may stay unset while the default locale is required
		if value.is_null() && cx.in_localized && self.write.req.is_non_default_locale() {
			return Ok(());
		}

		let (min_rows, max_rows) = field.kind.row_bounds().unwrap_or((None, None));
		let vcx = ValidateContext {
			path: cx.path.to_string(),
			data: cx.data.clone(),
			sibling_data: cx.sibling_data.clone(),
			operation: self.write.operation,
			required: field.options.required,
			min_rows,
			max_rows,
			req: self.write.req.clone(),
			messages: self.folio.messages().clone(),
		};
		let outcome = match &field.options.validate {
			Some(validate) => validate(value.clone(), vcx).await,
			None => default_validate(field, value, &vcx),
		};
		if let Err(message) = outcome {
			tracing::debug!(path = %cx.path, %message, "field failed validation");
			self.errors.lock().push(cx.path, message);
		}
		Ok(())
	}
}

struct AfterChange<'a> {
	write: WriteContext<'a>,
}

#[async_trait]
impl FieldPhase for AfterChange<'_> {
	fn direction(&self) -> Direction {
		Direction::Write
	}

	async fn visit(&self, field: &Field, value: &mut Value, cx: &FieldCx<'_>) -> Result<()> {
		run_field_hooks(
			field,
			HookPhase::AfterChange,
			value,
			cx,
			self.write.req,
			self.write.operation,
			self.write.original_doc,
			false,
		)
		.await
	}
}

struct AfterRead<'a> {
	folio: &'a Folio,
	req: &'a Request,
	options: ReadOptions,
}

#[async_trait]
impl FieldPhase for AfterRead<'_> {
	fn direction(&self) -> Direction {
		Direction::Read
	}

	fn all_locales(&self) -> bool {
		self.req.is_all_locales()
	}

	async fn admit(&self, field: &Field, cx: &FieldCx<'_>) -> Result<bool> {
		if field.options.hidden && !self.options.show_hidden_fields {
			return Ok(false);
		}
		if self.options.override_access {
			return Ok(true);
		}
		let Some(rule) = &field.options.access.read else {
			return Ok(true);
		};
		let args = AccessArgs::new(self.req)
			.with_id(document_id(cx.data).cloned())
			.with_doc(Some(cx.data.clone()))
			.with_sibling_data(Some(cx.sibling_data.clone()));
		Ok(field_permits(rule, args).await)
	}

	async fn visit(&self, field: &Field, value: &mut Value, cx: &FieldCx<'_>) -> Result<()> {
		if value.is_null()
			&& let Some(default) = &field.options.default_value
		{
			*value = default.clone();
		}

		match &field.kind {
			FieldKind::Relationship { .. } => {
				populate_relationship(self.folio, self.req, field, value, self.options).await
			}
			FieldKind::RichText { .. } => {
				populate_rich_text(self.folio, self.req, field, value, self.options).await
			}
			_ => {}
		}

		run_field_hooks(
			field,
			HookPhase::AfterRead,
			value,
			cx,
			self.req,
			Operation::Read,
			None,
			self.options.find_many,
		)
		.await
	}
}

/// Field access, defaults, coercion and `beforeValidate` field hooks
pub(crate) async fn before_validate(
	fields: &[Field],
	data: &mut Document,
	write: WriteContext<'_>,
) -> Result<()> {
	traverse(&BeforeValidate { write }, fields, data).await
}

/// `beforeChange` field hooks, then validation of every field
///
/// All failures are collected and reported as one validation error.
pub(crate) async fn before_change(
	folio: &Folio,
	fields: &[Field],
	data: &mut Document,
	write: WriteContext<'_>,
) -> Result<()> {
	let phase = BeforeChange {
		folio,
		write,
		errors: Mutex::new(ValidationErrors::new()),
	};
	traverse(&phase, fields, data).await?;
	phase.errors.into_inner().into_result()
}

pub(crate) async fn after_change(
	fields: &[Field],
	doc: &mut Document,
	write: WriteContext<'_>,
) -> Result<()> {
	traverse(&AfterChange { write }, fields, doc).await
}

/// Shape a stored document for the caller
///
/// Flattens localized values to the request locale, strips hidden and
/// unreadable fields, populates relationships within the depth budget and
/// runs `afterRead` field hooks.
pub(crate) async fn after_read(
	folio: &Folio,
	req: &Request,
	fields: &[Field],
	mut doc: Document,
	options: ReadOptions,
) -> Result<Document> {
	if let Some(l10n) = &folio.settings().localization {
		localize_for_read(fields, &mut doc, l10n, req.locale(), req.fallback_locale());
	}
	traverse(&AfterRead { folio, req, options }, fields, &mut doc).await?;
	Ok(doc)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case(Field::number("n"), json!("42"), json!(42))]
	#[case(Field::number("n"), json!("1.5"), json!(1.5))]
	#[case(Field::number("n"), json!(""), json!(null))]
	#[case(Field::number("n"), json!("abc"), json!("abc"))]
	#[case(Field::checkbox("c"), json!("true"), json!(true))]
	#[case(Field::date("d"), json!(""), json!(null))]
	#[case(Field::relationship("r", "users"), json!({"id": "u1", "email": "a@b.co"}), json!("u1"))]
	#[case(Field::relationship("r", "users"), json!(""), json!(null))]
	#[case(
		Field::relationship("r", ["posts", "pages"]),
		json!({"relationTo": "posts", "value": {"id": 3}}),
		json!({"relationTo": "posts", "value": 3})
	)]
	#[case(Field::relationship("r", "users").has_many(), json!([{"id": 1}, 2]), json!([1, 2]))]
	fn test_coerce(#[case] field: Field, #[case] mut value: Value, #[case] expected: Value) {
		coerce(&field, &mut value);
		assert_eq!(value, expected);
	}
}
