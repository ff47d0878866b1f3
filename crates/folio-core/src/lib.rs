//! # Folio Core
//!
//! Shared building blocks for the Folio content engine: the error taxonomy,
//! the dynamic document type and the query constraint language used by
//! access control and database adapters.

pub mod exception;
pub mod query;
pub mod types;

pub use exception::{Error, FieldError, Result, ValidationErrors};
pub use query::{Operator, Where};
pub use types::{ApiKind, Document, Operation};
