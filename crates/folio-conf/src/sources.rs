//! Configuration sources for layered settings
//!
//! Sources are merged in priority order (environment variables > config files >
//! defaults) by [`SettingsBuilder`](crate::builder::SettingsBuilder).

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fs;
use std::path::PathBuf;

/// Prefix recognised by [`EnvSource::folio`]
pub const ENV_PREFIX: &str = "FOLIO_";

/// Separator between nested keys in environment variable names
pub const ENV_NESTING_SEPARATOR: &str = "__";

/// Trait for configuration sources
pub trait ConfigSource: Send + Sync {
	/// Load configuration from this source
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError>;

	/// Get the priority of this source (higher = more important)
	fn priority(&self) -> u8;

	/// Get a description of this source
	fn description(&self) -> String;
}

/// Error type for configuration sources
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Parse error: {0}")]
	Parse(String),

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

/// Environment variable configuration source
///
/// `FOLIO_LOCALIZATION__DEFAULT_LOCALE=es` becomes
/// `{"localization": {"default_locale": "es"}}`. Values that parse as JSON
/// (numbers, booleans, arrays) keep their type; everything else is a string.
pub struct EnvSource {
	prefix: String,
}

impl EnvSource {
	/// Create a source reading variables that start with `prefix`
	///
	/// # Examples
	///
	/// ```
	/// use folio_conf::sources::EnvSource;
	///
	/// let source = EnvSource::new("APP_");
	/// ```
	pub fn new(prefix: impl Into<String>) -> Self {
		Self {
			prefix: prefix.into(),
		}
	}

	/// Source reading `FOLIO_*` variables
	pub fn folio() -> Self {
		Self::new(ENV_PREFIX)
	}

	fn parse_value(raw: &str) -> Value {
		match serde_json::from_str::<Value>(raw) {
			Ok(value @ (Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Null)) => {
				value
			}
			_ => Value::String(raw.to_string()),
		}
	}
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::folio()
	}
}

impl ConfigSource for EnvSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		let mut config = IndexMap::new();

		for (key, value) in std::env::vars() {
			let Some(stripped) = key.strip_prefix(&self.prefix) else {
				continue;
			};
			let lower_key = stripped.to_lowercase();
			let mut segments = lower_key.split(ENV_NESTING_SEPARATOR);
			let Some(head) = segments.next().filter(|s| !s.is_empty()) else {
				continue;
			};
			let rest: Vec<&str> = segments.collect();

			let parsed = Self::parse_value(&value);
			let nested = rest.iter().rev().fold(parsed, |inner, segment| {
				let mut map = Map::new();
				map.insert((*segment).to_string(), inner);
				Value::Object(map)
			});

			match config.get_mut(head) {
				Some(existing) => merge_values(existing, nested),
				None => {
					config.insert(head.to_string(), nested);
				}
			}
		}

		Ok(config)
	}

	fn priority(&self) -> u8 {
		100
	}

	fn description(&self) -> String {
		format!("Environment variables (prefix: {})", self.prefix)
	}
}

/// TOML file configuration source
///
/// A missing file yields no values.
pub struct TomlFileSource {
	path: PathBuf,
}

impl TomlFileSource {
	/// Create a new TOML file configuration source
	///
	/// # Examples
	///
	/// ```
	/// use folio_conf::sources::TomlFileSource;
	///
	/// let source = TomlFileSource::new("folio.toml");
	/// ```
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}
}

impl ConfigSource for TomlFileSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		if !self.path.exists() {
			return Ok(IndexMap::new());
		}

		let content = fs::read_to_string(&self.path)?;
		let toml_value: toml::Value = toml::from_str(&content)?;
		let json_value = serde_json::to_value(toml_value)?;

		let map = json_value
			.as_object()
			.ok_or_else(|| SourceError::Parse("Expected table at root".to_string()))?;

		Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
	}

	fn priority(&self) -> u8 {
		50
	}

	fn description(&self) -> String {
		format!("TOML file: {}", self.path.display())
	}
}

/// Default values configuration source
pub struct DefaultSource {
	values: IndexMap<String, Value>,
}

impl DefaultSource {
	/// Create an empty default values source
	pub fn new() -> Self {
		Self {
			values: IndexMap::new(),
		}
	}

	/// Add a default value for a configuration key
	///
	/// # Examples
	///
	/// ```
	/// use folio_conf::sources::DefaultSource;
	/// use serde_json::Value;
	///
	/// let source = DefaultSource::new()
	///     .with_value("default_depth", Value::Number(1.into()));
	/// ```
	pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
		self.values.insert(key.into(), value);
		self
	}
}

impl Default for DefaultSource {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigSource for DefaultSource {
	fn load(&self) -> Result<IndexMap<String, Value>, SourceError> {
		Ok(self.values.clone())
	}

	fn priority(&self) -> u8 {
		0
	}

	fn description(&self) -> String {
		"Default values".to_string()
	}
}

/// Overlay `overlay` onto `base`, merging nested tables key by key
pub(crate) fn merge_values(base: &mut Value, overlay: Value) {
	match (base, overlay) {
		(Value::Object(base_map), Value::Object(overlay_map)) => {
			for (key, value) in overlay_map {
				match base_map.get_mut(&key) {
					Some(existing) => merge_values(existing, value),
					None => {
						base_map.insert(key, value);
					}
				}
			}
		}
		(base, overlay) => *base = overlay,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;
	use serial_test::serial;
	use std::io::Write;
	use tempfile::TempDir;

	#[rstest]
	#[serial]
	fn test_env_source_nests_and_parses() {
		// SAFETY: env mutation is serialized by #[serial]
		unsafe {
			std::env::set_var("FOLIOTEST_DEFAULT_DEPTH", "3");
			std::env::set_var("FOLIOTEST_LOCALIZATION__DEFAULT_LOCALE", "es");
			std::env::set_var("FOLIOTEST_LOCALIZATION__LOCALES", r#"["en","es"]"#);
		}

		let config = EnvSource::new("FOLIOTEST_").load().unwrap();

		assert_eq!(config.get("default_depth"), Some(&json!(3)));
		assert_eq!(
			config.get("localization"),
			Some(&json!({"default_locale": "es", "locales": ["en", "es"]}))
		);

		// SAFETY: env mutation is serialized by #[serial]
		unsafe {
			std::env::remove_var("FOLIOTEST_DEFAULT_DEPTH");
			std::env::remove_var("FOLIOTEST_LOCALIZATION__DEFAULT_LOCALE");
			std::env::remove_var("FOLIOTEST_LOCALIZATION__LOCALES");
		}
	}

	#[rstest]
	#[case("true", json!(true))]
	#[case("12", json!(12))]
	#[case("hello", json!("hello"))]
	#[case(r#"{"a":1}"#, json!(r#"{"a":1}"#))]
	fn test_env_value_parsing(#[case] raw: &str, #[case] expected: Value) {
		assert_eq!(EnvSource::parse_value(raw), expected);
	}

	#[rstest]
	fn test_toml_source() {
		let temp_dir = TempDir::new().unwrap();
		let config_path = temp_dir.path().join("folio.toml");
		let mut file = fs::File::create(&config_path).unwrap();
		writeln!(file, "secret = \"s3cr3t\"\n[routes]\napi = \"/v1\"").unwrap();

		let config = TomlFileSource::new(&config_path).load().unwrap();

		assert_eq!(config.get("secret"), Some(&json!("s3cr3t")));
		assert_eq!(config.get("routes"), Some(&json!({"api": "/v1"})));
	}

	#[rstest]
	fn test_missing_toml_file_is_empty() {
		let config = TomlFileSource::new("/nonexistent/folio.toml").load().unwrap();
		assert!(config.is_empty());
	}
}
