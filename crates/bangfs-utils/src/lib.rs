//! Small utilities with no dependencies on the rest of BangFS:
//! FNV-1a hashing and the composite unique-ID generator.

pub mod fnv;
pub mod idgen;

pub use fnv::{fnv32, fnv64};
pub use idgen::IdGenerator;
