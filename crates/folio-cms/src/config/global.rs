use super::VersionsConfig;
use crate::access::Access;
use crate::fields::Field;
use crate::hooks::{
	AfterChangeArgs, AfterReadArgs, BeforeChangeArgs, BeforeReadArgs, GlobalHooks, Hook,
};
use folio_core::{Document, Result};
use std::future::Future;

#[derive(Debug, Clone, Default)]
pub struct GlobalAccess {
	pub read: Access,
	pub update: Access,
}

/// A global: a singleton document
#[derive(Debug, Clone)]
pub struct GlobalConfig {
	pub slug: String,
	pub fields: Vec<Field>,
	pub access: GlobalAccess,
	pub hooks: GlobalHooks,
	pub versions: Option<VersionsConfig>,
}

impl GlobalConfig {
	pub fn new(slug: impl Into<String>) -> Self {
		Self {
			slug: slug.into(),
			fields: Vec::new(),
			access: GlobalAccess::default(),
			hooks: GlobalHooks::default(),
			versions: None,
		}
	}

	pub fn field(mut self, field: Field) -> Self {
		self.fields.push(field);
		self
	}

	pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
		self.fields.extend(fields);
		self
	}

	pub fn versions(mut self, versions: VersionsConfig) -> Self {
		self.versions = Some(versions);
		self
	}

	pub fn read_access(mut self, access: impl Into<Access>) -> Self {
		self.access.read = access.into();
		self
	}

	pub fn update_access(mut self, access: impl Into<Access>) -> Self {
		self.access.update = access.into();
		self
	}

	pub fn drafts_enabled(&self) -> bool {
		self.versions.as_ref().is_some_and(|v| v.drafts)
	}

	pub fn before_validate<F, Fut>(mut self, f: F) -> Self
	where
		F: Fn(BeforeChangeArgs) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Option<Document>>> + Send + 'static,
	{
		self.hooks.before_validate.push(Hook::new(f));
		self
	}

	pub fn before_change<F, Fut>(mut self, f: F) -> Self
	where
		F: Fn(BeforeChangeArgs) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Option<Document>>> + Send + 'static,
	{
		self.hooks.before_change.push(Hook::new(f));
		self
	}

	pub fn after_change<F, Fut>(mut self, f: F) -> Self
	where
		F: Fn(AfterChangeArgs) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Option<Document>>> + Send + 'static,
	{
		self.hooks.after_change.push(Hook::new(f));
		self
	}

	pub fn before_read<F, Fut>(mut self, f: F) -> Self
	where
		F: Fn(BeforeReadArgs) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Option<Document>>> + Send + 'static,
	{
		self.hooks.before_read.push(Hook::new(f));
		self
	}

	pub fn after_read<F, Fut>(mut self, f: F) -> Self
	where
		F: Fn(AfterReadArgs) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Option<Document>>> + Send + 'static,
	{
		self.hooks.after_read.push(Hook::new(f));
		self
	}
}
