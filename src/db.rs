//! Storage adapter contract and the bundled adapters.

pub use folio_db::*;
