//! # Folio Configuration
//!
//! Layered settings for Folio applications. Values come from built-in
//! defaults, an optional TOML file and `FOLIO_*` environment variables,
//! merged by source priority and deserialized into [`Settings`].
//!
//! The content schema itself (collections, globals, fields, hooks) is code and
//! lives in `folio-cms`.

pub mod builder;
pub mod settings;
pub mod sources;

pub use builder::{SettingsBuilder, SettingsError};
pub use settings::{ALL_LOCALES, LocalizationSettings, RouteSettings, Settings};
