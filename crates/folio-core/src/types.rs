//! Document and operation types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A stored or in-flight document: field name to value, shaped like the
/// field schema that produced it
pub type Document = Map<String, Value>;

/// Key holding a document's (or a row's) identity
pub const ID_KEY: &str = "id";

/// Key holding a block row's type discriminator
pub const BLOCK_TYPE_KEY: &str = "blockType";

/// Lifecycle operation being performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
	Create,
	Read,
	Update,
	Delete,
	Refresh,
	Unlock,
}

impl Operation {
	pub fn as_str(&self) -> &'static str {
		match self {
			Operation::Create => "create",
			Operation::Read => "read",
			Operation::Update => "update",
			Operation::Delete => "delete",
			Operation::Refresh => "refresh",
			Operation::Unlock => "unlock",
		}
	}

	/// Whether the operation writes document data
	pub fn is_write(&self) -> bool {
		matches!(self, Operation::Create | Operation::Update)
	}
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Surface that triggered a request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiKind {
	Rest,
	GraphQl,
	#[default]
	Local,
}

/// Canonical string form of an id value, used for cache keys and id matching
///
/// Numbers and strings that print the same are the same id.
///
/// # Examples
///
/// ```
/// use folio_core::types::id_to_string;
/// use serde_json::json;
///
/// assert_eq!(id_to_string(&json!(42)), Some("42".to_string()));
/// assert_eq!(id_to_string(&json!("42")), Some("42".to_string()));
/// assert_eq!(id_to_string(&json!(null)), None);
/// ```
pub fn id_to_string(value: &Value) -> Option<String> {
	match value {
		Value::String(s) if !s.is_empty() => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}

/// Id of a document, if present
pub fn document_id(doc: &Document) -> Option<&Value> {
	doc.get(ID_KEY).filter(|v| !v.is_null())
}

/// Recursively overlay `overlay` onto `base`
///
/// Objects merge key by key; every other value (arrays included) replaces
/// what was there.
///
/// # Examples
///
/// ```
/// use folio_core::types::deep_merge;
/// use serde_json::json;
///
/// let mut base = json!({"meta": {"title": "a", "tags": [1]}, "slug": "x"});
/// deep_merge(&mut base, json!({"meta": {"tags": [2]}}));
/// assert_eq!(base, json!({"meta": {"title": "a", "tags": [2]}, "slug": "x"}));
/// ```
pub fn deep_merge(base: &mut Value, overlay: Value) {
	match (base, overlay) {
		(Value::Object(base_map), Value::Object(overlay_map)) => {
			for (key, value) in overlay_map {
				match base_map.get_mut(&key) {
					Some(existing) => deep_merge(existing, value),
					None => {
						base_map.insert(key, value);
					}
				}
			}
		}
		(base, overlay) => *base = overlay,
	}
}
