//! # Folio
//!
//! A configuration-driven headless CMS engine. Collections and globals are
//! declared as code and every create, read, update and delete runs through
//! one pipeline of field hooks, access control, localization and
//! relationship population.
//!
//! ## Feature Flags
//!
//! ### Presets
//!
//! - `minimal` - The engine over a user-supplied [`DatabaseAdapter`](db::DatabaseAdapter)
//! - `standard` (default) - Adds layered settings loading and the in-memory adapter
//! - `full` - All features enabled
//!
//! ### Fine-grained Control
//!
//! - `cms` - Collections, globals, fields, hooks and operations
//! - `conf` - Settings loading from TOML files and the environment
//! - `memory-db` - [`MemoryAdapter`](db::MemoryAdapter) with staged transactions
//!
//! ## Quick Example
//!
//! ```
//! # #[cfg(all(feature = "cms", feature = "memory-db"))]
//! # tokio_test::block_on(async {
//! use folio::prelude::*;
//! use serde_json::json;
//!
//! let folio = Folio::builder()
//!     .collection(
//!         CollectionConfig::new("posts")
//!             .field(Field::text("title").required())
//!             .create_access(Access::allow())
//!             .read_access(Access::allow()),
//!     )
//!     .database(MemoryAdapter::new())
//!     .build()
//!     .unwrap();
//!
//! let req = Request::builder(&folio).build();
//! let data = json!({"title": "Hello"}).as_object().cloned().unwrap();
//! let post = folio.create(&req, "posts", CreateArgs::new(data)).await.unwrap();
//! assert_eq!(post["title"], json!("Hello"));
//! # });
//! ```

pub mod core;
pub mod db;

#[cfg(feature = "conf")]
pub mod conf;

#[cfg(feature = "cms")]
pub use folio_cms::{ConfigError, Folio, FolioBuilder};

pub use folio_core::{Document, Error, Result, Where};

/// Commonly used types
pub mod prelude {
	pub use folio_core::{ApiKind, Document, Error, Operation, Where};
	pub use folio_db::DatabaseAdapter;

	#[cfg(feature = "memory-db")]
	pub use folio_db::MemoryAdapter;

	#[cfg(feature = "cms")]
	pub use folio_cms::prelude::*;

	#[cfg(feature = "conf")]
	pub use folio_conf::{LocalizationSettings, Settings};
}
