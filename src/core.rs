//! Shared document, query and error types.
//!
//! # Examples
//!
//! ```
//! use folio::core::Where;
//! use serde_json::json;
//!
//! let doc = json!({"status": "published"}).as_object().cloned().unwrap();
//! assert!(Where::field("status").equals("published").matches(&doc));
//! ```

pub use folio_core::*;
