//! Foundation types for docvault.
//!
//! Every other docvault crate depends on `docvault-types`. The only shared
//! vocabulary is the object identifier: blobs are addressed by the SHA-1
//! digest of their bytes, written as 40 lowercase hex digits.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Content-addressed identifier (SHA-1 digest)
//! - [`TypeError`] -- Parse failures for identifiers

pub mod error;
pub mod object;

pub use error::TypeError;
pub use object::ObjectId;
