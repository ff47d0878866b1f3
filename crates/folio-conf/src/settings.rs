//! Runtime settings for a Folio application

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Locale value that requests every locale at once
pub const ALL_LOCALES: &str = "all";

/// Top-level settings
///
/// Every field has a default, so a partial source (or none) still produces a
/// usable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	/// Secret used to sign authentication tokens
	pub secret: String,
	/// Base directory; upload `static_dir`s are resolved against it
	pub config_dir: PathBuf,
	/// Population depth used when a read does not specify one
	pub default_depth: u32,
	/// Upper bound on any requested population depth
	pub max_depth: u32,
	/// Prefix for cookies described by auth operations
	pub cookie_prefix: String,
	/// Slug of the built-in preferences collection
	pub preferences_slug: String,
	pub routes: RouteSettings,
	pub localization: Option<LocalizationSettings>,
	/// Translation overrides, keyed like `error:deletingFile`
	pub messages: HashMap<String, String>,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			secret: String::new(),
			config_dir: PathBuf::from("."),
			default_depth: 2,
			max_depth: 10,
			cookie_prefix: "folio".to_string(),
			preferences_slug: "folio-preferences".to_string(),
			routes: RouteSettings::default(),
			localization: None,
			messages: HashMap::new(),
		}
	}
}

impl Settings {
	/// Name of the auth token cookie
	///
	/// # Examples
	///
	/// ```
	/// use folio_conf::Settings;
	///
	/// assert_eq!(Settings::default().token_cookie_name(), "folio-token");
	/// ```
	pub fn token_cookie_name(&self) -> String {
		format!("{}-token", self.cookie_prefix)
	}

	/// Clamp a requested population depth to `max_depth`, defaulting when absent
	pub fn effective_depth(&self, requested: Option<u32>) -> u32 {
		requested.unwrap_or(self.default_depth).min(self.max_depth)
	}

	/// Check cross-field consistency
	pub fn validate(&self) -> Result<(), String> {
		if self.default_depth > self.max_depth {
			return Err(format!(
				"default_depth ({}) exceeds max_depth ({})",
				self.default_depth, self.max_depth
			));
		}
		if let Some(localization) = &self.localization {
			localization.validate()?;
		}
		Ok(())
	}
}

/// Route prefixes used by transports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteSettings {
	pub api: String,
	pub graphql: String,
}

impl Default for RouteSettings {
	fn default() -> Self {
		Self {
			api: "/api".to_string(),
			graphql: "/graphql".to_string(),
		}
	}
}

/// Locales known to the application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizationSettings {
	pub locales: Vec<String>,
	pub default_locale: String,
	/// Whether reads fall back to the default locale when a value is missing
	#[serde(default = "default_fallback")]
	pub fallback: bool,
}

fn default_fallback() -> bool {
	true
}

impl LocalizationSettings {
	/// Create localization settings; the first locale is the default
	///
	/// # Examples
	///
	/// ```
	/// use folio_conf::LocalizationSettings;
	///
	/// let l10n = LocalizationSettings::new(["en", "es"]);
	/// assert_eq!(l10n.default_locale, "en");
	/// assert!(l10n.is_known("es"));
	/// ```
	pub fn new<I, S>(locales: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let locales: Vec<String> = locales.into_iter().map(Into::into).collect();
		let default_locale = locales.first().cloned().unwrap_or_default();
		Self {
			locales,
			default_locale,
			fallback: true,
		}
	}

	pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
		self.default_locale = locale.into();
		self
	}

	pub fn with_fallback(mut self, fallback: bool) -> Self {
		self.fallback = fallback;
		self
	}

	pub fn is_known(&self, locale: &str) -> bool {
		self.locales.iter().any(|l| l == locale)
	}

	fn validate(&self) -> Result<(), String> {
		if self.locales.is_empty() {
			return Err("localization requires at least one locale".to_string());
		}
		if !self.is_known(&self.default_locale) {
			return Err(format!(
				"default locale '{}' is not one of the configured locales",
				self.default_locale
			));
		}
		Ok(())
	}
}
