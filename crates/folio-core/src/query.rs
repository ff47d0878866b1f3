//! Query constraints
//!
//! [`Where`] is the constraint half of an access result and the filter
//! argument of every adapter query. Adapters are free to translate it into
//! their own query language; [`Where::matches`] evaluates it against an
//! in-memory document.

use crate::types::{Document, id_to_string};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Comparison operator of a field condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
	Equals,
	NotEquals,
	In,
	NotIn,
	Exists,
	GreaterThan,
	GreaterThanEqual,
	LessThan,
	LessThanEqual,
	/// Case-insensitive substring match
	Like,
	/// String contains substring, or array contains element
	Contains,
}

/// A query constraint tree
///
/// # Examples
///
/// ```
/// use folio_core::query::Where;
/// use serde_json::json;
///
/// let constraint = Where::field("user").in_list(vec![json!(42)])
///     .and(Where::field("userCollection").equals(json!("users")));
///
/// let doc = json!({"user": 42, "userCollection": "users"});
/// assert!(constraint.matches(doc.as_object().unwrap()));
///
/// let other = json!({"user": 7, "userCollection": "users"});
/// assert!(!constraint.matches(other.as_object().unwrap()));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Where {
	/// `path operator value`
	Field {
		path: String,
		operator: Operator,
		value: Value,
	},
	/// Every child must match; an empty list matches everything
	And(Vec<Where>),
	/// At least one child must match; an empty list matches nothing
	Or(Vec<Where>),
	/// Matches no document
	Never,
}

/// Builder for a single field condition, created by [`Where::field`]
#[derive(Debug, Clone)]
pub struct FieldCondition {
	path: String,
}

macro_rules! condition_ops {
	($($(#[$doc:meta])* $name:ident => $op:ident),* $(,)?) => {
		impl FieldCondition {
			$(
				$(#[$doc])*
				pub fn $name(self, value: impl Into<Value>) -> Where {
					Where::Field {
						path: self.path,
						operator: Operator::$op,
						value: value.into(),
					}
				}
			)*
		}
	};
}

condition_ops! {
	equals => Equals,
	not_equals => NotEquals,
	greater_than => GreaterThan,
	greater_than_equal => GreaterThanEqual,
	less_than => LessThan,
	less_than_equal => LessThanEqual,
	/// Case-insensitive substring match
	like => Like,
	contains => Contains,
}

impl FieldCondition {
	/// Field value is one of `values`
	pub fn in_list(self, values: Vec<Value>) -> Where {
		Where::Field {
			path: self.path,
			operator: Operator::In,
			value: Value::Array(values),
		}
	}

	/// Field value is none of `values`
	pub fn not_in_list(self, values: Vec<Value>) -> Where {
		Where::Field {
			path: self.path,
			operator: Operator::NotIn,
			value: Value::Array(values),
		}
	}

	/// Field is (or is not) present with a non-null value
	pub fn exists(self, exists: bool) -> Where {
		Where::Field {
			path: self.path,
			operator: Operator::Exists,
			value: Value::Bool(exists),
		}
	}
}

impl Where {
	/// Start a condition on a dot-separated field path
	pub fn field(path: impl Into<String>) -> FieldCondition {
		FieldCondition { path: path.into() }
	}

	/// Conjunction of this constraint with `other`, flattening nested `And`s
	pub fn and(self, other: Where) -> Where {
		match (self, other) {
			(Where::Never, _) | (_, Where::Never) => Where::Never,
			(Where::And(mut left), Where::And(right)) => {
				left.extend(right);
				Where::And(left)
			}
			(Where::And(mut left), other) => {
				left.push(other);
				Where::And(left)
			}
			(this, Where::And(mut right)) => {
				right.insert(0, this);
				Where::And(right)
			}
			(this, other) => Where::And(vec![this, other]),
		}
	}

	/// Combine two optional constraints; `None` means unconstrained
	pub fn and_option(left: Option<Where>, right: Option<Where>) -> Option<Where> {
		match (left, right) {
			(Some(l), Some(r)) => Some(l.and(r)),
			(Some(w), None) | (None, Some(w)) => Some(w),
			(None, None) => None,
		}
	}

	/// Evaluate the constraint against a document
	pub fn matches(&self, doc: &Document) -> bool {
		match self {
			Where::Never => false,
			Where::And(children) => children.iter().all(|c| c.matches(doc)),
			Where::Or(children) => children.iter().any(|c| c.matches(doc)),
			Where::Field {
				path,
				operator,
				value,
			} => {
				let mut found = Vec::new();
				let segments: Vec<&str> = path.split('.').collect();
				resolve_path(doc, &segments, &mut found);
				evaluate(*operator, &found, value)
			}
		}
	}
}

/// Collect every value reachable under `segments`, fanning out over arrays
fn resolve_path<'a>(doc: &'a Document, segments: &[&str], out: &mut Vec<&'a Value>) {
	let Some((head, rest)) = segments.split_first() else {
		return;
	};
	if let Some(value) = doc.get(*head) {
		resolve_value(value, rest, out);
	}
}

fn resolve_value<'a>(value: &'a Value, segments: &[&str], out: &mut Vec<&'a Value>) {
	if segments.is_empty() {
		match value {
			Value::Array(items) => out.extend(items.iter()),
			other => out.push(other),
		}
		return;
	}
	match value {
		Value::Object(map) => resolve_path(map, segments, out),
		Value::Array(items) => {
			if let Ok(index) = segments[0].parse::<usize>() {
				if let Some(item) = items.get(index) {
					resolve_value(item, &segments[1..], out);
				}
			} else {
				for item in items {
					resolve_value(item, segments, out);
				}
			}
		}
		_ => {}
	}
}

/// Equality that treats ids printed the same way as equal (`42 == "42"`)
pub fn loose_eq(left: &Value, right: &Value) -> bool {
	if left == right {
		return true;
	}
	match (left, right) {
		(Value::String(_), Value::Number(_)) | (Value::Number(_), Value::String(_)) => {
			id_to_string(left) == id_to_string(right)
		}
		(Value::Object(map), scalar) | (scalar, Value::Object(map))
			if !scalar.is_object() && map.contains_key("relationTo") =>
		{
			map.get("value").is_some_and(|inner| loose_eq(inner, scalar))
		}
		_ => false,
	}
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
	match (left, right) {
		(Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
		(Value::String(a), Value::String(b)) => Some(a.cmp(b)),
		_ => None,
	}
}

fn evaluate(operator: Operator, found: &[&Value], expected: &Value) -> bool {
	match operator {
		Operator::Equals => {
			if found.is_empty() {
				expected.is_null()
			} else {
				found.iter().any(|v| loose_eq(v, expected))
			}
		}
		Operator::NotEquals => !evaluate(Operator::Equals, found, expected),
		Operator::In => match expected {
			Value::Array(options) => found
				.iter()
				.any(|v| options.iter().any(|o| loose_eq(v, o))),
			other => found.iter().any(|v| loose_eq(v, other)),
		},
		Operator::NotIn => !evaluate(Operator::In, found, expected),
		Operator::Exists => {
			let present = found.iter().any(|v| !v.is_null());
			present == expected.as_bool().unwrap_or(true)
		}
		Operator::GreaterThan => found
			.iter()
			.any(|v| compare(v, expected) == Some(Ordering::Greater)),
		Operator::GreaterThanEqual => found.iter().any(|v| {
			matches!(
				compare(v, expected),
				Some(Ordering::Greater | Ordering::Equal)
			)
		}),
		Operator::LessThan => found
			.iter()
			.any(|v| compare(v, expected) == Some(Ordering::Less)),
		Operator::LessThanEqual => found.iter().any(|v| {
			matches!(
				compare(v, expected),
				Some(Ordering::Less | Ordering::Equal)
			)
		}),
		Operator::Like => {
			let Some(needle) = expected.as_str().map(str::to_lowercase) else {
				return false;
			};
			found
				.iter()
				.filter_map(|v| v.as_str())
				.any(|s| s.to_lowercase().contains(&needle))
		}
		Operator::Contains => found.iter().any(|v| match (v, expected) {
			(Value::String(s), Value::String(needle)) => s.contains(needle.as_str()),
			(v, expected) => loose_eq(v, expected),
		}),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	fn doc(value: Value) -> Document {
		value.as_object().cloned().unwrap()
	}

	#[rstest]
	fn test_nested_path_through_arrays() {
		let d = doc(json!({"items": [{"title": "a"}, {"title": "b"}]}));
		assert!(Where::field("items.title").equals("b").matches(&d));
		assert!(Where::field("items.0.title").equals("a").matches(&d));
		assert!(!Where::field("items.0.title").equals("b").matches(&d));
	}

	#[rstest]
	fn test_loose_id_equality() {
		let d = doc(json!({"user": "42"}));
		assert!(Where::field("user").in_list(vec![json!(42)]).matches(&d));
		assert!(Where::field("user").equals(42).matches(&d));
	}

	#[rstest]
	fn test_missing_field_semantics() {
		let d = doc(json!({"title": "x"}));
		assert!(Where::field("missing").equals(Value::Null).matches(&d));
		assert!(Where::field("missing").exists(false).matches(&d));
		assert!(Where::field("title").exists(true).matches(&d));
		assert!(Where::field("missing").not_equals("x").matches(&d));
	}

	#[rstest]
	fn test_comparisons_and_like() {
		let d = doc(json!({"count": 5, "title": "Hello World"}));
		assert!(Where::field("count").greater_than(4).matches(&d));
		assert!(!Where::field("count").less_than(5).matches(&d));
		assert!(Where::field("count").less_than_equal(5).matches(&d));
		assert!(Where::field("title").like("world").matches(&d));
	}

	#[rstest]
	fn test_and_flattens_and_never_absorbs() {
		let w = Where::field("a")
			.equals(1)
			.and(Where::field("b").equals(2))
			.and(Where::field("c").equals(3));
		match &w {
			Where::And(children) => assert_eq!(children.len(), 3),
			other => panic!("unexpected {other:?}"),
		}
		assert_eq!(w.and(Where::Never), Where::Never);
	}

	#[rstest]
	fn test_or_and_empty_groups() {
		let d = doc(json!({"status": "draft"}));
		let w = Where::Or(vec![
			Where::field("status").equals("published"),
			Where::field("status").equals("draft"),
		]);
		assert!(w.matches(&d));
		assert!(Where::And(vec![]).matches(&d));
		assert!(!Where::Or(vec![]).matches(&d));
	}

	#[rstest]
	fn test_polymorphic_relationship_value_matches_scalar() {
		let d = doc(json!({"author": {"relationTo": "users", "value": "7"}}));
		assert!(Where::field("author").equals("7").matches(&d));
	}

	proptest::proptest! {
		#[test]
		fn prop_in_list_matches_contained_value(n in 0i64..1000, others in proptest::collection::vec(0i64..1000, 0..8)) {
			let d = doc(json!({"n": n}));
			let mut values: Vec<Value> = others.iter().map(|v| json!(v)).collect();
			let expected = others.contains(&n);
			proptest::prop_assert_eq!(Where::field("n").in_list(values.clone()).matches(&d), expected);
			values.push(json!(n.to_string()));
			proptest::prop_assert!(Where::field("n").in_list(values).matches(&d));
		}
	}
}
