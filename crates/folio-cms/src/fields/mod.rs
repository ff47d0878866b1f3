//! Field schema
//!
//! A [`Field`] is a closed tagged variant over field kinds plus the options
//! every kind shares. Arrays, blocks, groups and tabs nest further fields,
//! so a schema is an arbitrarily deep tree.

pub(crate) mod phases;
pub(crate) mod traverse;
pub mod validate;

use crate::access::Access;
use crate::hooks::{FieldHook, FieldHookArgs, FieldHooks, Hook};
use crate::messages::Messages;
use crate::request::Request;
use folio_core::{Document, Operation, Result};
use futures::future::BoxFuture;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Admin condition: `(data, sibling_data) -> visible`
pub type Condition = Arc<dyn Fn(&Document, &Document) -> bool + Send + Sync>;

type ValidateFn =
	Arc<dyn Fn(Value, ValidateContext) -> BoxFuture<'static, std::result::Result<(), String>> + Send + Sync>;

/// Context handed to validators
#[derive(Debug, Clone)]
pub struct ValidateContext {
	/// Dot-joined path of the field
	pub path: String,
	/// The whole in-flight document
	pub data: Document,
	/// Data of the field's enclosing scope
	pub sibling_data: Document,
	pub operation: Operation,
	pub required: bool,
	pub min_rows: Option<usize>,
	pub max_rows: Option<usize>,
	pub req: Request,
	pub messages: Messages,
}

/// Target(s) of a relationship field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationTo {
	One(String),
	/// Polymorphic; values are `{relationTo, value}`
	Many(Vec<String>),
}

impl RelationTo {
	pub fn slugs(&self) -> Vec<&str> {
		match self {
			RelationTo::One(slug) => vec![slug.as_str()],
			RelationTo::Many(slugs) => slugs.iter().map(String::as_str).collect(),
		}
	}

	pub fn is_polymorphic(&self) -> bool {
		matches!(self, RelationTo::Many(_))
	}
}

impl From<&str> for RelationTo {
	fn from(value: &str) -> Self {
		RelationTo::One(value.to_string())
	}
}

impl From<String> for RelationTo {
	fn from(value: String) -> Self {
		RelationTo::One(value)
	}
}

impl<const N: usize> From<[&str; N]> for RelationTo {
	fn from(value: [&str; N]) -> Self {
		RelationTo::Many(value.iter().map(|s| s.to_string()).collect())
	}
}

/// One block type of a blocks field
#[derive(Debug, Clone)]
pub struct Block {
	pub slug: String,
	pub fields: Vec<Field>,
}

impl Block {
	pub fn new(slug: impl Into<String>, fields: Vec<Field>) -> Self {
		Self {
			slug: slug.into(),
			fields,
		}
	}
}

/// One tab of a tabs field; named tabs nest their data like a group
#[derive(Debug, Clone)]
pub struct Tab {
	pub name: Option<String>,
	pub label: String,
	pub fields: Vec<Field>,
}

impl Tab {
	/// A tab whose fields live in the enclosing scope
	pub fn unnamed(label: impl Into<String>, fields: Vec<Field>) -> Self {
		Self {
			name: None,
			label: label.into(),
			fields,
		}
	}

	/// A tab whose fields live under `name`
	pub fn named(name: impl Into<String>, fields: Vec<Field>) -> Self {
		let name = name.into();
		Self {
			label: name.clone(),
			name: Some(name),
			fields,
		}
	}
}

#[derive(Debug, Clone)]
pub enum FieldKind {
	Text,
	Textarea,
	Email,
	Code,
	Json,
	Number {
		min: Option<f64>,
		max: Option<f64>,
	},
	Checkbox,
	Date,
	Select {
		options: Vec<String>,
		has_many: bool,
	},
	Relationship {
		relation_to: RelationTo,
		has_many: bool,
		max_depth: Option<u32>,
	},
	RichText {
		max_depth: Option<u32>,
	},
	Array {
		fields: Vec<Field>,
		min_rows: Option<usize>,
		max_rows: Option<usize>,
	},
	Blocks {
		blocks: Vec<Block>,
		min_rows: Option<usize>,
		max_rows: Option<usize>,
	},
	Group {
		fields: Vec<Field>,
	},
	/// Presentational container; carries no value of its own
	Tabs {
		tabs: Vec<Tab>,
	},
}

impl FieldKind {
	pub fn type_name(&self) -> &'static str {
		match self {
			FieldKind::Text => "text",
			FieldKind::Textarea => "textarea",
			FieldKind::Email => "email",
			FieldKind::Code => "code",
			FieldKind::Json => "json",
			FieldKind::Number { .. } => "number",
			FieldKind::Checkbox => "checkbox",
			FieldKind::Date => "date",
			FieldKind::Select { .. } => "select",
			FieldKind::Relationship { .. } => "relationship",
			FieldKind::RichText { .. } => "richText",
			FieldKind::Array { .. } => "array",
			FieldKind::Blocks { .. } => "blocks",
			FieldKind::Group { .. } => "group",
			FieldKind::Tabs { .. } => "tabs",
		}
	}

	/// Row bounds of arrays and blocks
	pub fn row_bounds(&self) -> Option<(Option<usize>, Option<usize>)> {
		match self {
			FieldKind::Array {
				min_rows, max_rows, ..
			}
			| FieldKind::Blocks {
				min_rows, max_rows, ..
			} => Some((*min_rows, *max_rows)),
			_ => None,
		}
	}
}

/// Field-level access rules; `None` means unrestricted
#[derive(Debug, Clone, Default)]
pub struct FieldAccess {
	pub read: Option<Access>,
	pub create: Option<Access>,
	pub update: Option<Access>,
}

/// Options shared by every field kind
#[derive(Clone, Default)]
pub struct FieldOptions {
	pub name: String,
	pub label: Option<String>,
	pub required: bool,
	pub localized: bool,
	/// Stripped from reads unless hidden fields are requested
	pub hidden: bool,
	pub save_to_jwt: bool,
	pub default_value: Option<Value>,
	pub condition: Option<Condition>,
	pub validate: Option<ValidateFn>,
	pub access: FieldAccess,
	pub hooks: FieldHooks,
}

impl std::fmt::Debug for FieldOptions {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FieldOptions")
			.field("name", &self.name)
			.field("required", &self.required)
			.field("localized", &self.localized)
			.field("hidden", &self.hidden)
			.field("default_value", &self.default_value)
			.field("has_condition", &self.condition.is_some())
			.field("has_validate", &self.validate.is_some())
			.finish_non_exhaustive()
	}
}

/// A schema field
///
/// # Examples
///
/// ```
/// use folio_cms::fields::{Block, Field};
///
/// let layout = Field::blocks(
///     "layout",
///     vec![
///         Block::new("quote", vec![Field::text("text").required()]),
///         Block::new("image", vec![Field::relationship("image", "media")]),
///     ],
/// )
/// .min_rows(1)
/// .localized();
///
/// assert_eq!(layout.name(), "layout");
/// assert!(layout.options.localized);
/// ```
#[derive(Debug, Clone)]
pub struct Field {
	pub options: FieldOptions,
	pub kind: FieldKind,
}

impl Field {
	pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
		Self {
			options: FieldOptions {
				name: name.into(),
				..Default::default()
			},
			kind,
		}
	}

	pub fn text(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::Text)
	}

	pub fn textarea(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::Textarea)
	}

	pub fn email(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::Email)
	}

	pub fn code(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::Code)
	}

	pub fn json(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::Json)
	}

	pub fn number(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::Number {
			min: None,
			max: None,
		})
	}

	pub fn checkbox(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::Checkbox)
	}

	pub fn date(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::Date)
	}

	pub fn select<I, S>(name: impl Into<String>, options: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self::new(name, FieldKind::Select {
			options: options.into_iter().map(Into::into).collect(),
			has_many: false,
		})
	}

	pub fn relationship(name: impl Into<String>, relation_to: impl Into<RelationTo>) -> Self {
		Self::new(name, FieldKind::Relationship {
			relation_to: relation_to.into(),
			has_many: false,
			max_depth: None,
		})
	}

	pub fn rich_text(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::RichText { max_depth: None })
	}

	pub fn array(name: impl Into<String>, fields: Vec<Field>) -> Self {
		Self::new(name, FieldKind::Array {
			fields,
			min_rows: None,
			max_rows: None,
		})
	}

	pub fn blocks(name: impl Into<String>, blocks: Vec<Block>) -> Self {
		Self::new(name, FieldKind::Blocks {
			blocks,
			min_rows: None,
			max_rows: None,
		})
	}

	pub fn group(name: impl Into<String>, fields: Vec<Field>) -> Self {
		Self::new(name, FieldKind::Group { fields })
	}

	pub fn tabs(tabs: Vec<Tab>) -> Self {
		Self::new("", FieldKind::Tabs { tabs })
	}

	pub fn name(&self) -> &str {
		&self.options.name
	}

	/// Whether the field stores a value under its name
	pub fn has_data(&self) -> bool {
		!matches!(self.kind, FieldKind::Tabs { .. })
	}

	/// Fields nested directly under this one, for schema checks
	pub(crate) fn child_scopes(&self) -> Vec<(String, &[Field])> {
		match &self.kind {
			FieldKind::Array { fields, .. } | FieldKind::Group { fields } => {
				vec![(self.name().to_string(), fields.as_slice())]
			}
			FieldKind::Blocks { blocks, .. } => blocks
				.iter()
				.map(|b| (format!("{}.{}", self.name(), b.slug), b.fields.as_slice()))
				.collect(),
			FieldKind::Tabs { tabs } => tabs
				.iter()
				.map(|t| (t.name.clone().unwrap_or_default(), t.fields.as_slice()))
				.collect(),
			_ => Vec::new(),
		}
	}

	pub fn label(mut self, label: impl Into<String>) -> Self {
		self.options.label = Some(label.into());
		self
	}

	pub fn required(mut self) -> Self {
		self.options.required = true;
		self
	}

	pub fn localized(mut self) -> Self {
		self.options.localized = true;
		self
	}

	pub fn hidden(mut self) -> Self {
		self.options.hidden = true;
		self
	}

	pub fn save_to_jwt(mut self) -> Self {
		self.options.save_to_jwt = true;
		self
	}

	pub fn default_value(mut self, value: impl Into<Value>) -> Self {
		self.options.default_value = Some(value.into());
		self
	}

	/// Allow several values (relationships and selects)
	pub fn has_many(mut self) -> Self {
		match &mut self.kind {
			FieldKind::Relationship { has_many, .. } | FieldKind::Select { has_many, .. } => {
				*has_many = true;
			}
			_ => {}
		}
		self
	}

	pub fn min_rows(mut self, n: usize) -> Self {
		if let FieldKind::Array { min_rows, .. } | FieldKind::Blocks { min_rows, .. } =
			&mut self.kind
		{
			*min_rows = Some(n);
		}
		self
	}

	pub fn max_rows(mut self, n: usize) -> Self {
		if let FieldKind::Array { max_rows, .. } | FieldKind::Blocks { max_rows, .. } =
			&mut self.kind
		{
			*max_rows = Some(n);
		}
		self
	}

	/// Cap population depth for this field (relationships and rich text)
	pub fn max_depth(mut self, depth: u32) -> Self {
		if let FieldKind::Relationship { max_depth, .. } | FieldKind::RichText { max_depth } =
			&mut self.kind
		{
			*max_depth = Some(depth);
		}
		self
	}

	pub fn min(mut self, value: f64) -> Self {
		if let FieldKind::Number { min, .. } = &mut self.kind {
			*min = Some(value);
		}
		self
	}

	pub fn max(mut self, value: f64) -> Self {
		if let FieldKind::Number { max, .. } = &mut self.kind {
			*max = Some(value);
		}
		self
	}

	/// Show the field only when `f(data, sibling_data)` holds
	pub fn condition<F>(mut self, f: F) -> Self
	where
		F: Fn(&Document, &Document) -> bool + Send + Sync + 'static,
	{
		self.options.condition = Some(Arc::new(f));
		self
	}

	/// Replace the built-in validation of this field
	///
	/// `Err(message)` fails validation with `message`.
	pub fn validate<F, Fut>(mut self, f: F) -> Self
	where
		F: Fn(Value, ValidateContext) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = std::result::Result<(), String>> + Send + 'static,
	{
		self.options.validate = Some(Arc::new(move |value, cx| Box::pin(f(value, cx))));
		self
	}

	pub fn read_access(mut self, access: impl Into<Access>) -> Self {
		self.options.access.read = Some(access.into());
		self
	}

	pub fn create_access(mut self, access: impl Into<Access>) -> Self {
		self.options.access.create = Some(access.into());
		self
	}

	pub fn update_access(mut self, access: impl Into<Access>) -> Self {
		self.options.access.update = Some(access.into());
		self
	}

	pub fn before_validate<F, Fut>(mut self, f: F) -> Self
	where
		F: Fn(FieldHookArgs) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
	{
		self.options.hooks.before_validate.push(Hook::new(f));
		self
	}

	pub fn before_change<F, Fut>(mut self, f: F) -> Self
	where
		F: Fn(FieldHookArgs) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
	{
		self.options.hooks.before_change.push(Hook::new(f));
		self
	}

	pub fn after_change<F, Fut>(mut self, f: F) -> Self
	where
		F: Fn(FieldHookArgs) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
	{
		self.options.hooks.after_change.push(Hook::new(f));
		self
	}

	pub fn after_read<F, Fut>(mut self, f: F) -> Self
	where
		F: Fn(FieldHookArgs) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Option<Value>>> + Send + 'static,
	{
		self.options.hooks.after_read.push(Hook::new(f));
		self
	}

	pub(crate) fn hook_list(&self, phase: HookPhase) -> &[FieldHook] {
		let hooks = &self.options.hooks;
		match phase {
			HookPhase::BeforeValidate => &hooks.before_validate,
			HookPhase::BeforeChange => &hooks.before_change,
			HookPhase::AfterChange => &hooks.after_change,
			HookPhase::AfterRead => &hooks.after_read,
		}
	}
}

/// Field hook phase selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HookPhase {
	BeforeValidate,
	BeforeChange,
	AfterChange,
	AfterRead,
}

impl HookPhase {
	pub(crate) fn as_str(&self) -> &'static str {
		match self {
			HookPhase::BeforeValidate => "beforeValidate",
			HookPhase::BeforeChange => "beforeChange",
			HookPhase::AfterChange => "afterChange",
			HookPhase::AfterRead => "afterRead",
		}
	}
}

/// Look up a data-bearing field by name, looking through unnamed tabs
pub fn find_field<'a>(fields: &'a [Field], name: &str) -> Option<&'a Field> {
	fields.iter().find_map(|field| match &field.kind {
		FieldKind::Tabs { tabs } => tabs
			.iter()
			.filter(|tab| tab.name.is_none())
			.find_map(|tab| find_field(&tab.fields, name)),
		_ if field.name() == name => Some(field),
		_ => None,
	})
}

/// Every data-bearing field of a scope, flattening unnamed tabs
pub(crate) fn flatten_scope(fields: &[Field]) -> Vec<&Field> {
	let mut out = Vec::new();
	for field in fields {
		match &field.kind {
			FieldKind::Tabs { tabs } => {
				for tab in tabs {
					if tab.name.is_none() {
						out.extend(flatten_scope(&tab.fields));
					}
				}
			}
			_ => out.push(field),
		}
	}
	out
}
