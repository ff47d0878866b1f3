//! # Folio DB
//!
//! The storage boundary of Folio. The engine talks to storage only through
//! [`DatabaseAdapter`]; [`MemoryAdapter`] is a transactional in-process
//! implementation used for embedding and tests.

pub mod adapter;
pub mod error;
#[cfg(feature = "memory")]
pub mod memory;
pub mod transaction;

pub use adapter::{DatabaseAdapter, FindArgs, GlobalArgs, PaginatedDocs, Sort};
pub use error::{DbError, DbResult};
#[cfg(feature = "memory")]
pub use memory::MemoryAdapter;
pub use transaction::TransactionId;
