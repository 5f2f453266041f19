//! Core types for the Muster rules-dataset pipeline.
//!
//! Holds the table catalogue, the per-column converter registry and the
//! read-side store trait. Free of HTTP and database dependencies; every other
//! crate in the workspace depends on it.

pub mod convert;
pub mod error;
pub mod model;
pub mod store;
pub mod tables;
pub mod value;

pub use error::{Error, Result};
pub use value::Value;
