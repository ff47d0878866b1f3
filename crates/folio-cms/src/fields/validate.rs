//! Built-in field validation
//!
//! Used for every field without a custom `validate`.

use super::{Field, FieldKind, RelationTo, ValidateContext};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Validate `value` against the built-in rules of `field`'s kind
pub fn default_validate(field: &Field, value: &Value, cx: &ValidateContext) -> Result<(), String> {
	let t = |key: &str| cx.messages.t(key);
	let empty = match &field.kind {
		FieldKind::RichText { .. } => is_empty_rich_text(value),
		_ => is_empty(value),
	};

	if cx.required && empty {
		return Err(t("validation:required"));
	}

	match &field.kind {
		FieldKind::Text | FieldKind::Textarea | FieldKind::Code => match value {
			Value::Null | Value::String(_) => Ok(()),
			_ => Err(t("validation:invalidInput")),
		},
		FieldKind::Email => match value {
			Value::Null => Ok(()),
			Value::String(s) if s.is_empty() || EMAIL_RE.is_match(s) => Ok(()),
			_ => Err(t("validation:emailAddress")),
		},
		FieldKind::Json | FieldKind::Group { .. } | FieldKind::Tabs { .. } => Ok(()),
		FieldKind::Number { min, max } => validate_number(value, *min, *max, cx),
		FieldKind::Checkbox => match value {
			Value::Null | Value::Bool(_) => Ok(()),
			_ => Err(t("validation:trueOrFalse")),
		},
		FieldKind::Date => match value {
			Value::Null => Ok(()),
			Value::String(s) if parse_date(s).is_some() => Ok(()),
			other => Err(cx.messages.t_with(
				"validation:notValidDate",
				&[("value", display_value(other).as_str())],
			)),
		},
		FieldKind::Select { options, has_many } => {
			validate_select(value, options, *has_many, cx)
		}
		FieldKind::Relationship {
			relation_to,
			has_many,
			..
		} => validate_relationship(value, relation_to, *has_many, cx),
		FieldKind::RichText { .. } => match value {
			Value::Null | Value::Array(_) => Ok(()),
			_ => Err(t("validation:invalidInput")),
		},
		FieldKind::Array { .. } | FieldKind::Blocks { .. } => validate_rows(value, cx),
	}
}

/// Whether a value counts as "not provided" for `required`
fn is_empty(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::String(s) => s.is_empty(),
		Value::Array(items) => items.is_empty(),
		_ => false,
	}
}

fn is_empty_rich_text(value: &Value) -> bool {
	match value {
		Value::Array(nodes) => nodes.iter().all(is_empty_rich_text_node),
		other => is_empty(other),
	}
}

/// Rich text nodes whose text leaves are all blank
fn is_empty_rich_text_node(node: &Value) -> bool {
	let Value::Object(map) = node else {
		return false;
	};
	if map.contains_key("type") && map.get("type").and_then(Value::as_str) != Some("p") {
		return false;
	}
	match map.get("children") {
		Some(Value::Array(children)) => children.iter().all(|child| match child {
			Value::Object(leaf) if leaf.contains_key("text") => {
				leaf.get("text").and_then(Value::as_str).is_some_and(str::is_empty)
			}
			other => is_empty_rich_text_node(other),
		}),
		_ => false,
	}
}

fn display_value(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

pub(crate) fn parse_date(s: &str) -> Option<chrono::DateTime<chrono::FixedOffset>> {
	if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
		return Some(dt);
	}
	chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
		.ok()
		.and_then(|d| d.and_hms_opt(0, 0, 0))
		.map(|dt| dt.and_utc().fixed_offset())
}

fn validate_number(
	value: &Value,
	min: Option<f64>,
	max: Option<f64>,
	cx: &ValidateContext,
) -> Result<(), String> {
	let n = match value {
		Value::Null => return Ok(()),
		Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
		_ => return Err(cx.messages.t("validation:enterNumber")),
	};
	if n.is_nan() {
		return Err(cx.messages.t("validation:enterNumber"));
	}
	if let Some(min) = min
		&& n < min
	{
		return Err(cx.messages.t_with(
			"validation:lessThanMin",
			&[("value", n.to_string().as_str()), ("min", min.to_string().as_str())],
		));
	}
	if let Some(max) = max
		&& n > max
	{
		return Err(cx.messages.t_with(
			"validation:greaterThanMax",
			&[("value", n.to_string().as_str()), ("max", max.to_string().as_str())],
		));
	}
	Ok(())
}

fn validate_select(
	value: &Value,
	options: &[String],
	has_many: bool,
	cx: &ValidateContext,
) -> Result<(), String> {
	let is_option = |v: &Value| v.as_str().is_some_and(|s| options.iter().any(|o| o == s));
	match value {
		Value::Null => Ok(()),
		Value::Array(items) if has_many => {
			let invalid: Vec<String> = items
				.iter()
				.filter(|v| !is_option(*v))
				.map(display_value)
				.collect();
			if invalid.is_empty() {
				Ok(())
			} else {
				Err(format!(
					"{} {}",
					cx.messages.t("validation:invalidSelections"),
					invalid.join(", ")
				))
			}
		}
		v if !has_many && is_option(v) => Ok(()),
		_ => Err(cx.messages.t("validation:invalidSelection")),
	}
}

fn is_id(value: &Value) -> bool {
	matches!(value, Value::String(s) if !s.is_empty()) || value.is_number()
}

fn validate_relationship(
	value: &Value,
	relation_to: &RelationTo,
	has_many: bool,
	cx: &ValidateContext,
) -> Result<(), String> {
	let valid_one = |v: &Value| match relation_to {
		RelationTo::One(_) => is_id(v),
		RelationTo::Many(slugs) => v.as_object().is_some_and(|obj| {
			obj.get("relationTo")
				.and_then(Value::as_str)
				.is_some_and(|slug| slugs.iter().any(|s| s == slug))
				&& obj.get("value").is_some_and(is_id)
		}),
	};
	let invalid: Vec<String> = match value {
		Value::Null => return Ok(()),
		Value::Array(items) if has_many => items
			.iter()
			.filter(|v| !valid_one(*v))
			.map(display_value)
			.collect(),
		v if !has_many && valid_one(v) => return Ok(()),
		other => vec![display_value(other)],
	};
	if invalid.is_empty() {
		Ok(())
	} else {
		Err(format!(
			"{} {}",
			cx.messages.t("validation:invalidRelationship"),
			invalid.join(", ")
		))
	}
}

fn validate_rows(value: &Value, cx: &ValidateContext) -> Result<(), String> {
	let count = match value {
		Value::Null => 0,
		Value::Array(rows) => rows.len(),
		_ => return Err(cx.messages.t("validation:invalidInput")),
	};
	if let Some(min) = cx.min_rows
		&& count < min
		&& (cx.required || count > 0)
	{
		return Err(cx.messages.t_with(
			"validation:requiresAtLeast",
			&[
				("count", min.to_string().as_str()),
				("label", cx.messages.rows_label(min).as_str()),
			],
		));
	}
	if let Some(max) = cx.max_rows
		&& count > max
	{
		return Err(cx.messages.t_with(
			"validation:requiresNoMoreThan",
			&[
				("count", max.to_string().as_str()),
				("label", cx.messages.rows_label(max).as_str()),
			],
		));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fields::Field;
	use crate::messages::Messages;
	use folio_core::{Document, Operation};
	use rstest::rstest;
	use serde_json::json;

	fn cx_for(field: &Field) -> ValidateContext {
		let (min_rows, max_rows) = field.kind.row_bounds().unwrap_or((None, None));
		ValidateContext {
			path: field.name().to_string(),
			data: Document::new(),
			sibling_data: Document::new(),
			operation: Operation::Create,
			required: field.options.required,
			min_rows,
			max_rows,
			req: crate::request::test_support::request(),
			messages: Messages::default(),
		}
	}

	fn check(field: &Field, value: Value) -> Result<(), String> {
		default_validate(field, &value, &cx_for(field))
	}

	#[rstest]
	#[case(json!(null), false)]
	#[case(json!([{"id": "a"}]), false)]
	#[case(json!([{"id": "a"}, {"id": "b"}]), true)]
	fn test_required_array_min_rows(#[case] value: Value, #[case] ok: bool) {
		let field = Field::array("items", vec![Field::text("title")]).required().min_rows(2);
		assert_eq!(check(&field, value).is_ok(), ok);
	}

	#[rstest]
	fn test_min_rows_message() {
		let field = Field::array("items", vec![]).required().min_rows(2);
		assert_eq!(
			check(&field, json!([{}])).unwrap_err(),
			"This field requires at least 2 rows."
		);
	}

	#[rstest]
	fn test_max_rows() {
		let field = Field::blocks("layout", vec![]).max_rows(1);
		assert!(check(&field, json!([{}, {}])).is_err());
	}

	#[rstest]
	#[case(json!("a@b.co"), true)]
	#[case(json!("nope"), false)]
	#[case(json!(null), true)]
	fn test_email(#[case] value: Value, #[case] ok: bool) {
		assert_eq!(check(&Field::email("email"), value).is_ok(), ok);
	}

	#[rstest]
	#[case(json!("2024-02-29"), true)]
	#[case(json!("2024-02-29T10:00:00.000Z"), true)]
	#[case(json!("yesterday"), false)]
	fn test_date(#[case] value: Value, #[case] ok: bool) {
		assert_eq!(check(&Field::date("at"), value).is_ok(), ok);
	}

	#[rstest]
	#[case(json!(5), true)]
	#[case(json!(11), false)]
	#[case(json!("5"), false)]
	fn test_number_bounds(#[case] value: Value, #[case] ok: bool) {
		let field = Field::number("n").min(0.0).max(10.0);
		assert_eq!(check(&field, value).is_ok(), ok);
	}

	#[rstest]
	fn test_select_has_many_lists_invalid() {
		let field = Field::select("tags", ["a", "b"]).has_many();
		let err = check(&field, json!(["a", "z"])).unwrap_err();
		assert!(err.ends_with("z"));
	}

	#[rstest]
	#[case(json!("abc"), true)]
	#[case(json!({"relationTo": "posts", "value": "1"}), false)]
	fn test_single_relationship_shape(#[case] value: Value, #[case] ok: bool) {
		assert_eq!(check(&Field::relationship("author", "users"), value).is_ok(), ok);
	}

	#[rstest]
	fn test_polymorphic_relationship_shape() {
		let field = Field::relationship("link", ["posts", "pages"]).has_many();
		assert!(check(&field, json!([{"relationTo": "posts", "value": 1}])).is_ok());
		assert!(check(&field, json!([{"relationTo": "users", "value": 1}])).is_err());
	}

	#[rstest]
	fn test_required_rich_text_rejects_blank_paragraph() {
		let field = Field::rich_text("body").required();
		assert!(check(&field, json!([{"children": [{"text": ""}]}])).is_err());
		assert!(check(&field, json!([{"children": [{"text": "hi"}]}])).is_ok());
	}
}
