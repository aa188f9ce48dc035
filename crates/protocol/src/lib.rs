//! Wire types for the Recap upload API.
//!
//! The dashboard consumes these records as JSON, so field names are
//! camelCase on the wire. This crate carries no engine logic, only the
//! shapes both sides agree on.

mod types;

pub use types::{ChunkFailure, UploadProgress};
