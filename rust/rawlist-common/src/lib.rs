//! Core definitions (error types and verification helpers), relied upon by all rawlist-* crates.

pub mod error;
pub mod result;

pub use error::{Error, ErrorKind};
pub use result::Result;
