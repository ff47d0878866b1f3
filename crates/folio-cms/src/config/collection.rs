use super::VersionsConfig;
use crate::access::Access;
use crate::fields::Field;
use crate::hooks::{
	AfterChangeArgs, AfterDeleteArgs, AfterOperationArgs, AfterReadArgs, AfterRefreshArgs,
	BeforeChangeArgs, BeforeDeleteArgs, BeforeOperationArgs, BeforeReadArgs, CollectionHooks, Hook,
	OperationArgs, OperationResult,
};
use crate::operations::auth::RefreshResult;
use folio_core::{Document, Result};
use std::future::Future;
use std::path::PathBuf;

/// Operation-level access rules of a collection
#[derive(Debug, Clone, Default)]
pub struct CollectionAccess {
	pub create: Access,
	pub read: Access,
	pub update: Access,
	pub delete: Access,
	/// Auth collections only
	pub unlock: Access,
	/// Whether users of this auth collection may use the admin panel
	pub admin: Option<Access>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SameSite {
	Strict,
	#[default]
	Lax,
	None,
}

impl SameSite {
	pub fn as_str(&self) -> &'static str {
		match self {
			SameSite::Strict => "Strict",
			SameSite::Lax => "Lax",
			SameSite::None => "None",
		}
	}
}

/// Attributes of the token cookie
#[derive(Debug, Clone, Default)]
pub struct CookieConfig {
	pub secure: bool,
	pub same_site: SameSite,
	pub domain: Option<String>,
}

/// Makes a collection an auth collection
#[derive(Debug, Clone)]
pub struct AuthConfig {
	/// Token lifetime in seconds
	pub token_expiration: i64,
	/// Population depth of the user on refresh
	pub depth: u32,
	pub max_login_attempts: u32,
	/// Lock duration in milliseconds after too many failed logins
	pub lock_time: i64,
	pub remove_token_from_responses: bool,
	pub cookies: CookieConfig,
}

impl Default for AuthConfig {
	fn default() -> Self {
		Self {
			token_expiration: 7200,
			depth: 0,
			max_login_attempts: 5,
			lock_time: 600_000,
			remove_token_from_responses: false,
			cookies: CookieConfig::default(),
		}
	}
}

impl AuthConfig {
	pub fn with_token_expiration(mut self, seconds: i64) -> Self {
		self.token_expiration = seconds;
		self
	}

	pub fn with_depth(mut self, depth: u32) -> Self {
		self.depth = depth;
		self
	}

	pub fn with_remove_token_from_responses(mut self) -> Self {
		self.remove_token_from_responses = true;
		self
	}

	pub fn with_cookies(mut self, cookies: CookieConfig) -> Self {
		self.cookies = cookies;
		self
	}
}

/// Makes a collection an upload collection
#[derive(Debug, Clone)]
pub struct UploadConfig {
	/// Directory for stored files, relative to `Settings::config_dir`
	pub static_dir: PathBuf,
}

impl UploadConfig {
	pub fn new(static_dir: impl Into<PathBuf>) -> Self {
		Self {
			static_dir: static_dir.into(),
		}
	}
}

/// A collection: many documents sharing one schema
///
/// # Examples
///
/// ```
/// use folio_cms::prelude::*;
///
/// let posts = CollectionConfig::new("posts")
///     .field(Field::text("title").required().localized())
///     .field(Field::relationship("author", "users"))
///     .read_access(Access::allow())
///     .before_change(|mut args: BeforeChangeArgs| async move {
///         args.data.insert("reviewed".into(), false.into());
///         Ok(Some(args.data))
///     });
///
/// assert_eq!(posts.slug, "posts");
/// assert_eq!(posts.fields.len(), 2);
/// assert_eq!(posts.hooks.before_change.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct CollectionConfig {
	pub slug: String,
	pub fields: Vec<Field>,
	pub access: CollectionAccess,
	pub hooks: CollectionHooks,
	pub auth: Option<AuthConfig>,
	pub upload: Option<UploadConfig>,
	pub versions: Option<VersionsConfig>,
	/// Maintain `createdAt` and `updatedAt`
	pub timestamps: bool,
}

impl CollectionConfig {
	pub fn new(slug: impl Into<String>) -> Self {
		Self {
			slug: slug.into(),
			fields: Vec::new(),
			access: CollectionAccess::default(),
			hooks: CollectionHooks::default(),
			auth: None,
			upload: None,
			versions: None,
			timestamps: true,
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

	pub fn auth(mut self, auth: AuthConfig) -> Self {
		self.auth = Some(auth);
		self
	}

	pub fn upload(mut self, upload: UploadConfig) -> Self {
		self.upload = Some(upload);
		self
	}

	pub fn versions(mut self, versions: VersionsConfig) -> Self {
		self.versions = Some(versions);
		self
	}

	pub fn without_timestamps(mut self) -> Self {
		self.timestamps = false;
		self
	}

	pub fn create_access(mut self, access: impl Into<Access>) -> Self {
		self.access.create = access.into();
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

	pub fn delete_access(mut self, access: impl Into<Access>) -> Self {
		self.access.delete = access.into();
		self
	}

	pub fn unlock_access(mut self, access: impl Into<Access>) -> Self {
		self.access.unlock = access.into();
		self
	}

	pub fn admin_access(mut self, access: impl Into<Access>) -> Self {
		self.access.admin = Some(access.into());
		self
	}

	pub fn is_auth(&self) -> bool {
		self.auth.is_some()
	}

	pub fn drafts_enabled(&self) -> bool {
		self.versions.as_ref().is_some_and(|v| v.drafts)
	}

	pub fn before_operation<F, Fut>(mut self, f: F) -> Self
	where
		F: Fn(BeforeOperationArgs) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Option<OperationArgs>>> + Send + 'static,
	{
		self.hooks.before_operation.push(Hook::new(f));
		self
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

	pub fn before_delete<F, Fut>(mut self, f: F) -> Self
	where
		F: Fn(BeforeDeleteArgs) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Option<()>>> + Send + 'static,
	{
		self.hooks.before_delete.push(Hook::new(f));
		self
	}

	pub fn after_delete<F, Fut>(mut self, f: F) -> Self
	where
		F: Fn(AfterDeleteArgs) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Option<Document>>> + Send + 'static,
	{
		self.hooks.after_delete.push(Hook::new(f));
		self
	}

	pub fn after_operation<F, Fut>(mut self, f: F) -> Self
	where
		F: Fn(AfterOperationArgs) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Option<OperationResult>>> + Send + 'static,
	{
		self.hooks.after_operation.push(Hook::new(f));
		self
	}

	pub fn after_refresh<F, Fut>(mut self, f: F) -> Self
	where
		F: Fn(AfterRefreshArgs) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Option<RefreshResult>>> + Send + 'static,
	{
		self.hooks.after_refresh.push(Hook::new(f));
		self
	}
}
