//! Core types shared by every BangFS crate: strongly-typed IDs, the opaque
//! version token handed out by metadata writes, and the error type with its
//! POSIX errno projection.

#[macro_use]
pub mod strong_type;

pub mod error;
pub mod ids;
pub mod token;

pub use error::{FsError, Result};
pub use ids::*;
pub use token::VersionToken;
