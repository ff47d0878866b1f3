//! # Folio CMS
//!
//! The content engine. Collections and globals are declared as code; every
//! operation on them runs one shared pipeline:
//!
//! - a field-tree walker dispatching per field kind over arbitrarily nested
//!   groups, arrays, blocks and tabs
//! - access control resolving to allow/deny or a query constraint
//! - entity and field hooks run strictly in registration order
//! - relationship population through a request-scoped, deduplicating loader
//! - localization of stored locale maps
//! - a request context carrying the transaction shared by nested operations
//!
//! ## Example
//!
//! ```
//! use folio_cms::prelude::*;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let folio = Folio::builder()
//!     .collection(
//!         CollectionConfig::new("posts")
//!             .field(Field::text("title").required())
//!             .field(Field::relationship("related", "posts"))
//!             .create_access(Access::allow())
//!             .read_access(Access::allow()),
//!     )
//!     .database(folio_db::MemoryAdapter::new())
//!     .build()
//!     .unwrap();
//!
//! let req = Request::builder(&folio).build();
//! let first = folio
//!     .create(&req, "posts", CreateArgs::new(json!({"title": "One"}).as_object().cloned().unwrap()))
//!     .await
//!     .unwrap();
//! let data = json!({"title": "Two", "related": first["id"]}).as_object().cloned().unwrap();
//! let second = folio.create(&req, "posts", CreateArgs::new(data)).await.unwrap();
//!
//! let read = folio
//!     .find_by_id(&req, "posts", FindByIdArgs::new(second["id"].clone()).with_depth(1))
//!     .await
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(read["related"]["title"], json!("One"));
//! # });
//! ```

pub mod access;
pub mod app;
pub mod config;
pub mod fields;
pub mod hooks;
pub mod loader;
pub(crate) mod localization;
pub mod messages;
pub mod operations;
pub(crate) mod populate;
pub mod request;
pub mod transaction;
pub mod versions;

pub use app::{Folio, FolioBuilder};
pub use config::ConfigError;

/// Commonly used types
pub mod prelude {
	pub use crate::access::{Access, AccessArgs, AccessResult};
	pub use crate::app::{Folio, FolioBuilder};
	pub use crate::config::{
		AuthConfig, CollectionConfig, CookieConfig, GlobalConfig, SameSite, UploadConfig,
		VersionsConfig,
	};
	pub use crate::fields::{Block, Field, FieldKind, RelationTo, Tab, ValidateContext};
	pub use crate::hooks::{
		AfterChangeArgs, AfterDeleteArgs, AfterOperationArgs, AfterReadArgs, AfterRefreshArgs,
		BeforeChangeArgs, BeforeDeleteArgs, BeforeOperationArgs, BeforeReadArgs, FieldHookArgs,
		Hook, OperationArgs, OperationResult,
	};
	pub use crate::operations::auth::{RefreshResult, TokenCookie, UnlockArgs};
	pub use crate::operations::collections::{
		BulkError, BulkOperationResult, CreateArgs, DeleteArgs, FindByIdArgs, FindOptions,
		UpdateArgs,
	};
	pub use crate::operations::globals::{FindGlobalArgs, UpdateGlobalArgs};
	pub use crate::request::{Request, UploadedFile, User};
	pub use folio_core::{ApiKind, Document, Error, Operation, Where};
}
