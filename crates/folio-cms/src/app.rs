//! Application context
//!
//! [`Folio`] owns the checked configuration, the settings, the message
//! catalogue and the database adapter. It is cheap to clone and is passed
//! by reference into every operation.

use crate::config::{CollectionConfig, ConfigError, GlobalConfig};
use crate::fields::{Field, FieldKind, flatten_scope};
use crate::messages::Messages;
use crate::versions::{DRAFT, PUBLISHED, STATUS_KEY};
use folio_conf::Settings;
use folio_core::{Error, Result};
use folio_db::DatabaseAdapter;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;

struct FolioInner {
	settings: Settings,
	collections: IndexMap<String, CollectionConfig>,
	globals: IndexMap<String, GlobalConfig>,
	db: Arc<dyn DatabaseAdapter>,
	messages: Messages,
	admin_user: Option<String>,
}

/// The configured engine
#[derive(Clone)]
pub struct Folio {
	inner: Arc<FolioInner>,
}

impl std::fmt::Debug for Folio {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Folio")
			.field("collections", &self.inner.collections.keys().collect::<Vec<_>>())
			.field("globals", &self.inner.globals.keys().collect::<Vec<_>>())
			.finish_non_exhaustive()
	}
}

impl Folio {
	pub fn builder() -> FolioBuilder {
		FolioBuilder::default()
	}

	pub fn settings(&self) -> &Settings {
		&self.inner.settings
	}

	pub fn db(&self) -> &dyn DatabaseAdapter {
		self.inner.db.as_ref()
	}

	/// Collection registered under `slug`
	pub fn collection(&self, slug: &str) -> Result<&CollectionConfig> {
		self.inner
			.collections
			.get(slug)
			.ok_or_else(|| Error::Api(format!("Unknown collection '{slug}'")))
	}

	pub fn collections(&self) -> impl Iterator<Item = &CollectionConfig> {
		self.inner.collections.values()
	}

	/// Global registered under `slug`
	pub fn global(&self, slug: &str) -> Result<&GlobalConfig> {
		self.inner
			.globals
			.get(slug)
			.ok_or_else(|| Error::Api(format!("Unknown global '{slug}'")))
	}

	pub fn globals(&self) -> impl Iterator<Item = &GlobalConfig> {
		self.inner.globals.values()
	}

	/// Auth collection whose users may sign in to the admin panel
	pub fn admin_user(&self) -> Option<&CollectionConfig> {
		self.inner
			.admin_user
			.as_deref()
			.and_then(|slug| self.inner.collections.get(slug))
	}

	pub fn messages(&self) -> &Messages {
		&self.inner.messages
	}

	/// Translated message for `key`
	pub fn t(&self, key: &str) -> String {
		self.inner.messages.t(key)
	}
}

/// Builder for [`Folio`]
///
/// # Examples
///
/// ```
/// use folio_cms::prelude::*;
/// use folio_db::MemoryAdapter;
///
/// let folio = Folio::builder()
///     .collection(CollectionConfig::new("users").auth(AuthConfig::default()))
///     .collection(CollectionConfig::new("posts").field(Field::relationship("author", "users")))
///     .database(MemoryAdapter::new())
///     .build()
///     .unwrap();
///
/// // auth collections get their email and lockout fields
/// let users = folio.collection("users").unwrap();
/// assert!(users.fields.iter().any(|f| f.name() == "email"));
///
/// // relationships must point at registered collections
/// let broken = Folio::builder()
///     .collection(CollectionConfig::new("posts").field(Field::relationship("author", "people")))
///     .database(MemoryAdapter::new())
///     .build();
/// assert!(broken.is_err());
/// ```
#[derive(Default)]
pub struct FolioBuilder {
	settings: Settings,
	collections: Vec<CollectionConfig>,
	globals: Vec<GlobalConfig>,
	db: Option<Arc<dyn DatabaseAdapter>>,
	admin_user: Option<String>,
}

impl FolioBuilder {
	pub fn settings(mut self, settings: Settings) -> Self {
		self.settings = settings;
		self
	}

	pub fn collection(mut self, collection: CollectionConfig) -> Self {
		self.collections.push(collection);
		self
	}

	pub fn global(mut self, global: GlobalConfig) -> Self {
		self.globals.push(global);
		self
	}

	pub fn database(self, db: impl DatabaseAdapter + 'static) -> Self {
		self.database_arc(Arc::new(db))
	}

	pub fn database_arc(mut self, db: Arc<dyn DatabaseAdapter>) -> Self {
		self.db = Some(db);
		self
	}

	/// Auth collection used for the admin panel; defaults to the first one
	pub fn admin_user(mut self, slug: impl Into<String>) -> Self {
		self.admin_user = Some(slug.into());
		self
	}

	/// Check the configuration and build the engine
	pub fn build(self) -> std::result::Result<Folio, ConfigError> {
		self.settings.validate().map_err(ConfigError::Settings)?;
		let db = self.db.ok_or(ConfigError::MissingDatabase)?;

		let mut collections = IndexMap::new();
		for collection in self.collections {
			check_slug(&self.settings, &collection.slug)?;
			if collections.contains_key(&collection.slug) {
				return Err(ConfigError::DuplicateSlug(collection.slug));
			}
			collections.insert(collection.slug.clone(), sanitize_collection(collection));
		}

		let mut globals = IndexMap::new();
		for global in self.globals {
			check_slug(&self.settings, &global.slug)?;
			if globals.contains_key(&global.slug) || collections.contains_key(&global.slug) {
				return Err(ConfigError::DuplicateSlug(global.slug));
			}
			globals.insert(global.slug.clone(), sanitize_global(global));
		}

		for collection in collections.values() {
			check_fields(&collection.slug, &collection.fields, &collections)?;
		}
		for global in globals.values() {
			check_fields(&global.slug, &global.fields, &collections)?;
		}

		let admin_user = match self.admin_user {
			Some(slug) => {
				if !collections.get(&slug).is_some_and(CollectionConfig::is_auth) {
					return Err(ConfigError::InvalidAdminUser(slug));
				}
				Some(slug)
			}
			None => collections
				.values()
				.find(|c| c.is_auth())
				.map(|c| c.slug.clone()),
		};

		tracing::debug!(
			collections = collections.len(),
			globals = globals.len(),
			"folio configured"
		);
		let messages = Messages::new(self.settings.messages.clone());
		Ok(Folio {
			inner: Arc::new(FolioInner {
				settings: self.settings,
				collections,
				globals,
				db,
				messages,
				admin_user,
			}),
		})
	}
}

fn check_slug(settings: &Settings, slug: &str) -> std::result::Result<(), ConfigError> {
	if slug.is_empty() || slug.starts_with('_') || slug == settings.preferences_slug {
		return Err(ConfigError::ReservedSlug(slug.to_string()));
	}
	Ok(())
}

/// Add `field` unless the scope already has a field of that name
fn ensure_field(fields: &mut Vec<Field>, field: Field) {
	if !flatten_scope(fields).iter().any(|f| f.name() == field.name()) {
		fields.push(field);
	}
}

fn status_field() -> Field {
	Field::select(STATUS_KEY, [DRAFT, PUBLISHED])
		.default_value(DRAFT)
		.label("Status")
}

fn sanitize_collection(mut collection: CollectionConfig) -> CollectionConfig {
	if collection.is_auth() {
		if !flatten_scope(&collection.fields).iter().any(|f| f.name() == "email") {
			collection.fields.insert(0, Field::email("email").required().save_to_jwt());
		}
		ensure_field(&mut collection.fields, Field::number("loginAttempts").hidden().default_value(0));
		ensure_field(&mut collection.fields, Field::date("lockUntil").hidden());
	}
	if collection.upload.is_some() {
		ensure_field(&mut collection.fields, Field::text("filename"));
		ensure_field(&mut collection.fields, Field::text("mimeType"));
		ensure_field(&mut collection.fields, Field::number("filesize"));
		ensure_field(&mut collection.fields, Field::json("sizes"));
	}
	if collection.drafts_enabled() {
		ensure_field(&mut collection.fields, status_field());
	}
	if collection.timestamps {
		ensure_field(&mut collection.fields, Field::date("createdAt"));
		ensure_field(&mut collection.fields, Field::date("updatedAt"));
	}
	collection
}

fn sanitize_global(mut global: GlobalConfig) -> GlobalConfig {
	if global.drafts_enabled() {
		ensure_field(&mut global.fields, status_field());
	}
	ensure_field(&mut global.fields, Field::date("createdAt"));
	ensure_field(&mut global.fields, Field::date("updatedAt"));
	global
}

fn check_fields(
	entity: &str,
	fields: &[Field],
	collections: &IndexMap<String, CollectionConfig>,
) -> std::result::Result<(), ConfigError> {
	let mut seen = HashSet::new();
	for field in flatten_scope(fields) {
		if !seen.insert(field.name()) {
			return Err(ConfigError::DuplicateField {
				entity: entity.to_string(),
				path: field.name().to_string(),
			});
		}
	}

	for field in fields {
		match &field.kind {
			FieldKind::Relationship { relation_to, .. } => {
				if let Some(target) = relation_to
					.slugs()
					.into_iter()
					.find(|slug| !collections.contains_key(*slug))
				{
					return Err(ConfigError::UnknownRelation {
						entity: entity.to_string(),
						field: field.name().to_string(),
						target: target.to_string(),
					});
				}
			}
			FieldKind::Array {
				min_rows: Some(min),
				max_rows: Some(max),
				..
			}
			| FieldKind::Blocks {
				min_rows: Some(min),
				max_rows: Some(max),
				..
			} if min > max => {
				return Err(ConfigError::InvalidRows {
					entity: entity.to_string(),
					field: field.name().to_string(),
				});
			}
			_ => {}
		}
		if let FieldKind::Blocks { blocks, .. } = &field.kind {
			let mut slugs = HashSet::new();
			for block in blocks {
				if !slugs.insert(block.slug.as_str()) {
					return Err(ConfigError::DuplicateBlock {
						entity: entity.to_string(),
						field: field.name().to_string(),
						block: block.slug.clone(),
					});
				}
			}
		}
		for (scope, nested) in field.child_scopes() {
			let scoped = if scope.is_empty() {
				entity.to_string()
			} else {
				format!("{entity}.{scope}")
			};
			check_fields(&scoped, nested, collections)?;
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{AuthConfig, UploadConfig, VersionsConfig};
	use crate::fields::{Block, Tab};
	use folio_db::MemoryAdapter;
	use rstest::rstest;

	fn build(collections: Vec<CollectionConfig>) -> std::result::Result<Folio, ConfigError> {
		collections
			.into_iter()
			.fold(Folio::builder(), FolioBuilder::collection)
			.database(MemoryAdapter::new())
			.build()
	}

	#[rstest]
	fn test_missing_database() {
		assert!(matches!(Folio::builder().build(), Err(ConfigError::MissingDatabase)));
	}

	#[rstest]
	fn test_duplicate_slug() {
		let result = build(vec![CollectionConfig::new("posts"), CollectionConfig::new("posts")]);
		assert!(matches!(result, Err(ConfigError::DuplicateSlug(slug)) if slug == "posts"));
	}

	#[rstest]
	#[case("_posts_versions")]
	#[case("folio-preferences")]
	fn test_reserved_slugs(#[case] slug: &str) {
		assert!(matches!(
			build(vec![CollectionConfig::new(slug)]),
			Err(ConfigError::ReservedSlug(_))
		));
	}

	#[rstest]
	fn test_duplicate_field_through_unnamed_tab() {
		let posts = CollectionConfig::new("posts").fields([
			Field::text("title"),
			Field::tabs(vec![Tab::unnamed("Main", vec![Field::text("title")])]),
		]);
		assert!(matches!(build(vec![posts]), Err(ConfigError::DuplicateField { .. })));
	}

	#[rstest]
	fn test_same_name_in_different_rows_is_fine() {
		let posts = CollectionConfig::new("posts").fields([
			Field::text("title"),
			Field::array("items", vec![Field::text("title")]),
		]);
		assert!(build(vec![posts]).is_ok());
	}

	#[rstest]
	fn test_invalid_rows_and_blocks() {
		let rows = CollectionConfig::new("posts")
			.field(Field::array("items", vec![]).min_rows(3).max_rows(1));
		assert!(matches!(build(vec![rows]), Err(ConfigError::InvalidRows { .. })));

		let blocks = CollectionConfig::new("pages").field(Field::blocks(
			"layout",
			vec![Block::new("quote", vec![]), Block::new("quote", vec![])],
		));
		assert!(matches!(build(vec![blocks]), Err(ConfigError::DuplicateBlock { .. })));
	}

	#[rstest]
	fn test_nested_relationship_targets_are_checked() {
		let pages = CollectionConfig::new("pages").field(Field::blocks(
			"layout",
			vec![Block::new("image", vec![Field::relationship("media", "media")])],
		));
		assert!(matches!(
			build(vec![pages]),
			Err(ConfigError::UnknownRelation { target, .. }) if target == "media"
		));
	}

	#[rstest]
	fn test_generated_fields() {
		let folio = build(vec![
			CollectionConfig::new("users").auth(AuthConfig::default()),
			CollectionConfig::new("media")
				.upload(UploadConfig::new("media"))
				.versions(VersionsConfig::with_drafts()),
		])
		.unwrap();

		let names = |slug: &str| -> Vec<String> {
			folio
				.collection(slug)
				.unwrap()
				.fields
				.iter()
				.map(|f| f.name().to_string())
				.collect()
		};
		assert_eq!(
			names("users"),
			vec!["email", "loginAttempts", "lockUntil", "createdAt", "updatedAt"]
		);
		assert!(names("media").contains(&"filename".to_string()));
		assert!(names("media").contains(&"_status".to_string()));
		assert_eq!(folio.admin_user().map(|c| c.slug.as_str()), Some("users"));
	}

	#[rstest]
	fn test_unknown_collection_is_api_error() {
		let folio = build(vec![]).unwrap();
		assert!(matches!(folio.collection("nope"), Err(Error::Api(_))));
	}
}
