//! Settings and their layered loading.
//!
//! # Examples
//!
//! ```rust,no_run
//! # #[cfg(feature = "conf")]
//! use folio::conf::Settings;
//! ```

#[cfg(feature = "conf")]
pub use folio_conf::*;
