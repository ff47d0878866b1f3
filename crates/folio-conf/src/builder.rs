//! Merging configuration sources into [`Settings`]

use crate::settings::Settings;
use crate::sources::{ConfigSource, EnvSource, SourceError, TomlFileSource, merge_values};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Errors raised while building settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("Failed to load {source_name}: {error}")]
	Source {
		source_name: String,
		#[source]
		error: SourceError,
	},

	#[error("Invalid settings: {0}")]
	Invalid(String),

	#[error("Failed to deserialize settings: {0}")]
	Deserialize(#[from] serde_json::Error),
}

/// Builder merging configuration sources by priority
///
/// # Examples
///
/// ```
/// use folio_conf::{SettingsBuilder, sources::DefaultSource};
/// use serde_json::json;
///
/// let settings = SettingsBuilder::new()
///     .add_source(DefaultSource::new().with_value("secret", json!("dev")))
///     .build()
///     .unwrap();
///
/// assert_eq!(settings.secret, "dev");
/// assert_eq!(settings.default_depth, 2);
/// ```
#[derive(Default)]
pub struct SettingsBuilder {
	sources: Vec<Box<dyn ConfigSource>>,
}

impl SettingsBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a source; order of registration does not matter, priority does
	pub fn add_source<S: ConfigSource + 'static>(mut self, source: S) -> Self {
		self.sources.push(Box::new(source));
		self
	}

	/// The usual stack: `path` as TOML, overridden by `FOLIO_*` variables
	pub fn standard(path: impl Into<PathBuf>) -> Self {
		Self::new()
			.add_source(TomlFileSource::new(path))
			.add_source(EnvSource::folio())
	}

	/// Merge every source and deserialize the result
	pub fn build(mut self) -> Result<Settings, SettingsError> {
		self.sources.sort_by_key(|s| s.priority());

		let mut merged = Value::Object(Map::new());
		for source in &self.sources {
			let values = source.load().map_err(|error| SettingsError::Source {
				source_name: source.description(),
				error,
			})?;
			tracing::debug!(
				source = %source.description(),
				keys = values.len(),
				"loaded settings source"
			);
			let overlay: Map<String, Value> = values.into_iter().collect();
			merge_values(&mut merged, Value::Object(overlay));
		}

		let settings: Settings = serde_json::from_value(merged)?;
		settings.validate().map_err(SettingsError::Invalid)?;
		Ok(settings)
	}
}
