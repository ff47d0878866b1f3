//! Collection and global configuration
//!
//! Schemas are code: a [`CollectionConfig`] or [`GlobalConfig`] is built with
//! chained methods and handed to [`FolioBuilder`](crate::app::FolioBuilder),
//! which checks the whole configuration before any operation can run.

mod collection;
mod global;

pub use collection::{
	AuthConfig, CollectionAccess, CollectionConfig, CookieConfig, SameSite, UploadConfig,
};
pub use global::{GlobalAccess, GlobalConfig};

/// Version history settings of a collection or global
#[derive(Debug, Clone, Default)]
pub struct VersionsConfig {
	/// Allow saving unpublished drafts
	pub drafts: bool,
}

impl VersionsConfig {
	pub fn with_drafts() -> Self {
		Self { drafts: true }
	}
}

/// Configuration rejected while building a [`Folio`](crate::app::Folio)
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Duplicate slug '{0}'")]
	DuplicateSlug(String),

	#[error("Slug '{0}' is reserved")]
	ReservedSlug(String),

	#[error("Duplicate field '{path}' in '{entity}'")]
	DuplicateField { entity: String, path: String },

	#[error("Field '{field}' of '{entity}' relates to unknown collection '{target}'")]
	UnknownRelation {
		entity: String,
		field: String,
		target: String,
	},

	#[error("Field '{field}' of '{entity}' has min_rows greater than max_rows")]
	InvalidRows { entity: String, field: String },

	#[error("Duplicate block '{block}' in field '{field}' of '{entity}'")]
	DuplicateBlock {
		entity: String,
		field: String,
		block: String,
	},

	#[error("Admin user collection '{0}' is not an auth collection")]
	InvalidAdminUser(String),

	#[error("No database adapter configured")]
	MissingDatabase,

	#[error("Invalid settings: {0}")]
	Settings(String),
}

impl From<ConfigError> for folio_core::Error {
	fn from(err: ConfigError) -> Self {
		folio_core::Error::Api(err.to_string())
	}
}
