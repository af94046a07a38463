//! The metadata record stored per inode number, plus mode decoding and the
//! kernel-facing attribute projection.

pub mod attr;
pub mod mode;
pub mod record;

pub use attr::{project_attrs, AttrOut};
pub use record::{unix_now_ns, ChildEntry, ChunkRef, InodeRecord};
