//! User-visible message catalogue
//!
//! English defaults, overridable through `Settings::messages`. Messages may
//! carry `{{name}}` placeholders filled in by [`Messages::t_with`].

use std::collections::HashMap;
use std::sync::Arc;

const DEFAULTS: &[(&str, &str)] = &[
	("error:deletingFile", "There was an error deleting file."),
	("error:uploadingFile", "There was an error while uploading the file."),
	("error:notAllowedToPerformAction", "You are not allowed to perform this action."),
	("error:unauthorized", "Unauthorized, you must be logged in to make this request."),
	("error:notFound", "The requested resource was not found."),
	("error:missingEmail", "Missing email."),
	("error:missingWhere", "Missing 'where' query of documents to delete."),
	("error:invalidToken", "The provided token is invalid or has expired."),
	("validation:required", "This field is required."),
	("validation:requiresAtLeast", "This field requires at least {{count}} {{label}}."),
	("validation:requiresNoMoreThan", "This field requires no more than {{count}} {{label}}."),
	("validation:enterNumber", "Please enter a valid number."),
	("validation:lessThanMin", "\"{{value}}\" is less than the min allowed value of {{min}}."),
	("validation:greaterThanMax", "\"{{value}}\" is greater than the max allowed value of {{max}}."),
	("validation:emailAddress", "Please enter a valid email address."),
	("validation:notValidDate", "\"{{value}}\" is not a valid date."),
	("validation:trueOrFalse", "This field can only be equal to true or false."),
	("validation:invalidSelection", "This field has an invalid selection."),
	("validation:invalidSelections", "This field has the following invalid selections:"),
	("validation:invalidRelationship", "This relationship field has the following invalid relationships:"),
	("validation:invalidInput", "This field has an invalid input."),
	("general:row", "row"),
	("general:rows", "rows"),
];

/// Message lookup with overrides
///
/// # Examples
///
/// ```
/// use folio_cms::messages::Messages;
/// use std::collections::HashMap;
///
/// let messages = Messages::new(HashMap::new());
/// assert_eq!(messages.t("validation:required"), "This field is required.");
/// assert_eq!(
///     messages.t_with("validation:requiresAtLeast", &[("count", "2"), ("label", "rows")]),
///     "This field requires at least 2 rows."
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct Messages {
	overrides: Arc<HashMap<String, String>>,
}

impl Messages {
	pub fn new(overrides: HashMap<String, String>) -> Self {
		Self {
			overrides: Arc::new(overrides),
		}
	}

	/// Message for `key`; unknown keys are returned unchanged
	pub fn t(&self, key: &str) -> String {
		if let Some(message) = self.overrides.get(key) {
			return message.clone();
		}
		DEFAULTS
			.iter()
			.find(|(k, _)| *k == key)
			.map(|(_, v)| (*v).to_string())
			.unwrap_or_else(|| key.to_string())
	}

	/// Message for `key` with `{{name}}` placeholders replaced
	pub fn t_with(&self, key: &str, vars: &[(&str, &str)]) -> String {
		vars.iter().fold(self.t(key), |message, (name, value)| {
			message.replace(&format!("{{{{{name}}}}}"), value)
		})
	}

	/// `row` or `rows` depending on `count`
	pub(crate) fn rows_label(&self, count: usize) -> String {
		if count == 1 {
			self.t("general:row")
		} else {
			self.t("general:rows")
		}
	}
}
