//! Localized storage shape
//!
//! A localized field is stored as one map of `locale -> value` at the
//! outermost localized field; everything nested below it is plain data.
//! Reads flatten those maps to the request locale, writes fold the written
//! locale back into the stored map without touching the other locales.

use crate::fields::{Field, FieldKind};
use folio_conf::{ALL_LOCALES, LocalizationSettings};
use folio_core::Document;
use folio_core::types::{BLOCK_TYPE_KEY, ID_KEY, id_to_string};
use serde_json::{Map, Value};

/// Whether `value` is a locale map under `l10n`
fn as_locale_map<'a>(value: &'a Value, l10n: &LocalizationSettings) -> Option<&'a Map<String, Value>> {
	match value {
		Value::Object(map) if !map.is_empty() && map.keys().all(|k| l10n.is_known(k)) => Some(map),
		_ => None,
	}
}

/// Flatten every locale map in `doc` to `locale`, falling back to `fallback`
/// when the locale has no value
///
/// `all` keeps the maps as stored.
pub(crate) fn localize_for_read(
	fields: &[Field],
	doc: &mut Document,
	l10n: &LocalizationSettings,
	locale: Option<&str>,
	fallback: Option<&str>,
) {
	let Some(locale) = locale else {
		return;
	};
	if locale == ALL_LOCALES {
		return;
	}
	flatten_scope(fields, doc, l10n, locale, fallback);
}

fn flatten_scope(
	fields: &[Field],
	scope: &mut Document,
	l10n: &LocalizationSettings,
	locale: &str,
	fallback: Option<&str>,
) {
	for field in fields {
		if let FieldKind::Tabs { tabs } = &field.kind {
			for tab in tabs {
				match &tab.name {
					None => flatten_scope(&tab.fields, scope, l10n, locale, fallback),
					Some(name) => {
						if let Some(Value::Object(nested)) = scope.get_mut(name) {
							flatten_scope(&tab.fields, nested, l10n, locale, fallback);
						}
					}
				}
			}
			continue;
		}

		let name = field.name();
		if field.options.localized {
			let Some(map) = scope.get(name).and_then(|v| as_locale_map(v, l10n)) else {
				continue;
			};
			let picked = map
				.get(locale)
				.filter(|v| !v.is_null())
				.or_else(|| fallback.and_then(|f| map.get(f)).filter(|v| !v.is_null()))
				.cloned();
			match picked {
				Some(value) => {
					scope.insert(name.to_string(), value);
				}
				None => {
					scope.remove(name);
				}
			}
			continue;
		}

		if let Some(value) = scope.get_mut(name) {
			for_each_nested(field, value, |fields, nested| {
				flatten_scope(fields, nested, l10n, locale, fallback)
			});
		}
	}
}

/// Call `f` on every nested scope of a container value
fn for_each_nested<F>(field: &Field, value: &mut Value, mut f: F)
where
	F: FnMut(&[Field], &mut Document),
{
	match (&field.kind, value) {
		(FieldKind::Group { fields }, Value::Object(nested)) => f(fields, nested),
		(FieldKind::Array { fields, .. }, Value::Array(rows)) => {
			for row in rows.iter_mut().filter_map(Value::as_object_mut) {
				f(fields, row);
			}
		}
		(FieldKind::Blocks { blocks, .. }, Value::Array(rows)) => {
			for row in rows.iter_mut().filter_map(Value::as_object_mut) {
				let block = row
					.get(BLOCK_TYPE_KEY)
					.and_then(Value::as_str)
					.and_then(|t| blocks.iter().find(|b| b.slug == t));
				if let Some(block) = block {
					f(&block.fields, row);
				}
			}
		}
		_ => {}
	}
}

/// Fold a flattened write at `locale` into the stored document
///
/// Localized values of `data` become the `locale` entry of the map found in
/// `original`; rows are matched to stored rows by id so localized values
/// nested in rows keep their other locales.
pub(crate) fn merge_for_write(
	fields: &[Field],
	data: &mut Document,
	original: Option<&Document>,
	l10n: &LocalizationSettings,
	locale: &str,
) {
	let locale = if locale == ALL_LOCALES {
		l10n.default_locale.as_str()
	} else {
		locale
	};
	merge_scope(fields, data, original, l10n, locale);
}

fn merge_scope(
	fields: &[Field],
	data: &mut Document,
	original: Option<&Document>,
	l10n: &LocalizationSettings,
	locale: &str,
) {
	for field in fields {
		if let FieldKind::Tabs { tabs } = &field.kind {
			for tab in tabs {
				match &tab.name {
					None => merge_scope(&tab.fields, data, original, l10n, locale),
					Some(name) => {
						let stored = original.and_then(|o| o.get(name)).and_then(Value::as_object);
						if let Some(Value::Object(nested)) = data.get_mut(name) {
							merge_scope(&tab.fields, nested, stored, l10n, locale);
						}
					}
				}
			}
			continue;
		}

		let name = field.name();
		let stored = original.and_then(|o| o.get(name));

		if field.options.localized {
			let mut map = match stored {
				Some(v) => match as_locale_map(v, l10n) {
					Some(map) => map.clone(),
					// stored before the field was localized
					None if !v.is_null() => {
						Map::from_iter([(l10n.default_locale.clone(), v.clone())])
					}
					None => Map::new(),
				},
				None => Map::new(),
			};
			match data.remove(name) {
				Some(value) => {
					map.insert(locale.to_string(), value);
				}
				None if map.is_empty() => continue,
				None => {}
			}
			data.insert(name.to_string(), Value::Object(map));
			continue;
		}

		let Some(value) = data.get_mut(name) else {
			continue;
		};
		match (&field.kind, value) {
			(FieldKind::Group { fields }, Value::Object(nested)) => {
				merge_scope(fields, nested, stored.and_then(Value::as_object), l10n, locale);
			}
			(FieldKind::Array { fields, .. }, Value::Array(rows)) => {
				for row in rows.iter_mut().filter_map(Value::as_object_mut) {
					let stored_row = matching_row(stored, row);
					merge_scope(fields, row, stored_row, l10n, locale);
				}
			}
			(FieldKind::Blocks { blocks, .. }, Value::Array(rows)) => {
				for row in rows.iter_mut().filter_map(Value::as_object_mut) {
					let block = row
						.get(BLOCK_TYPE_KEY)
						.and_then(Value::as_str)
						.and_then(|t| blocks.iter().find(|b| b.slug == t));
					if let Some(block) = block {
						let stored_row = matching_row(stored, row);
						merge_scope(&block.fields, row, stored_row, l10n, locale);
					}
				}
			}
			_ => {}
		}
	}
}

/// The stored row with the same id as `row`
fn matching_row<'a>(stored: Option<&'a Value>, row: &Document) -> Option<&'a Document> {
	let id = row.get(ID_KEY).and_then(id_to_string)?;
	stored?
		.as_array()?
		.iter()
		.filter_map(Value::as_object)
		.find(|candidate| candidate.get(ID_KEY).and_then(id_to_string).as_deref() == Some(id.as_str()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use serde_json::json;

	#[fixture]
	fn l10n() -> LocalizationSettings {
		LocalizationSettings::new(["en", "es", "de"])
	}

	fn doc(value: Value) -> Document {
		value.as_object().cloned().unwrap()
	}

	fn schema() -> Vec<Field> {
		vec![
			Field::text("title").localized(),
			Field::text("slug"),
			Field::array("items", vec![Field::text("label").localized()]),
		]
	}

	#[rstest]
	#[case(Some("es"), None, json!({"title": "Hola", "slug": "s"}))]
	#[case(Some("de"), Some("en"), json!({"title": "Hello", "slug": "s"}))]
	#[case(Some("de"), None, json!({"slug": "s"}))]
	#[case(Some("all"), None, json!({"title": {"en": "Hello", "es": "Hola"}, "slug": "s"}))]
	fn test_localize_for_read(
		l10n: LocalizationSettings,
		#[case] locale: Option<&str>,
		#[case] fallback: Option<&str>,
		#[case] expected: Value,
	) {
		let mut data = doc(json!({"title": {"en": "Hello", "es": "Hola"}, "slug": "s"}));
		localize_for_read(&schema(), &mut data, &l10n, locale, fallback);
		assert_eq!(Value::Object(data), expected);
	}

	#[rstest]
	fn test_localize_nested_in_rows(l10n: LocalizationSettings) {
		let mut data = doc(json!({"items": [{"id": "r1", "label": {"en": "One", "es": "Uno"}}]}));
		localize_for_read(&schema(), &mut data, &l10n, Some("es"), None);
		assert_eq!(data["items"][0]["label"], json!("Uno"));
	}

	#[rstest]
	fn test_merge_keeps_other_locales(l10n: LocalizationSettings) {
		let original = doc(json!({
			"title": {"en": "Hello"},
			"slug": "s",
			"items": [{"id": "r1", "label": {"en": "One"}}],
		}));
		let mut data = doc(json!({
			"title": "Hola",
			"slug": "s",
			"items": [{"id": "r1", "label": "Uno"}, {"id": "r2", "label": "Dos"}],
		}));
		merge_for_write(&schema(), &mut data, Some(&original), &l10n, "es");
		assert_eq!(data["title"], json!({"en": "Hello", "es": "Hola"}));
		assert_eq!(data["items"][0]["label"], json!({"en": "One", "es": "Uno"}));
		assert_eq!(data["items"][1]["label"], json!({"es": "Dos"}));
		assert_eq!(data["slug"], json!("s"));
	}

	#[rstest]
	fn test_merge_wraps_unlocalized_stored_value(l10n: LocalizationSettings) {
		let original = doc(json!({"title": "Legacy"}));
		let mut data = doc(json!({"title": "Neu"}));
		merge_for_write(&schema(), &mut data, Some(&original), &l10n, "de");
		assert_eq!(data["title"], json!({"en": "Legacy", "de": "Neu"}));
	}
}
