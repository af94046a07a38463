//! Composite 64-bit unique-ID issuance, used for inode numbers and chunk
//! keys.
//!
//! Each ID packs three fields:
//!
//! - low 13 bits: current milliseconds since epoch (a wrap-tolerant coarse
//!   clock),
//! - middle 14 bits: a per-process monotonic sequence number,
//! - high 37 bits: a process-local identifier.
//!
//! The process-local identifier is derived, in priority order, from a
//! configured client-id string (FNV-64), the hostname (FNV-32,
//! zero-extended), or a random value. Cross-process collisions require two
//! processes with the same local-id hash allocating in the same millisecond
//! with the same sequence value, which is negligible here.

use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::fnv::{fnv32, fnv64};

const TIME_BITS: u32 = 13;
const SEQ_BITS: u32 = 14;

const TIME_MASK: u64 = (1 << TIME_BITS) - 1;
const SEQ_MASK: u64 = (1 << SEQ_BITS) - 1;

/// Issues u64 IDs unique within one process, across concurrent callers.
///
/// Use one generator per ID space (the mount context keeps separate
/// generators for inode numbers and chunk keys so the two never share
/// sequence numbers).
#[derive(Debug)]
pub struct IdGenerator {
    local_id: u64,
    seq: Mutex<u64>,
}

impl IdGenerator {
    /// Create a generator, deriving the process-local identifier from the
    /// given client id if present, otherwise from the hostname, otherwise
    /// from a random value.
    pub fn new(client_id: Option<&str>) -> Self {
        let local_id = match client_id {
            Some(id) if !id.is_empty() => fnv64(id.as_bytes()),
            _ => match hostname() {
                Some(host) => fnv32(host.as_bytes()) as u64,
                None => rand::random::<u64>(),
            },
        };
        Self {
            local_id,
            seq: Mutex::new(0),
        }
    }

    /// Issue the next unique ID.
    pub fn next_id(&self) -> u64 {
        let seq = {
            let mut guard = self.seq.lock();
            let s = *guard;
            *guard = guard.wrapping_add(1);
            s
        };
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        (ms & TIME_MASK) | ((seq & SEQ_MASK) << TIME_BITS) | (self.local_id << (TIME_BITS + SEQ_BITS))
    }

    /// The process-local identifier embedded in the high bits.
    pub fn local_id(&self) -> u64 {
        self.local_id
    }
}

/// Split an ID into its (millis, sequence, local-id) fields.
pub fn extract_components(id: u64) -> (u64, u64, u64) {
    (
        id & TIME_MASK,
        (id >> TIME_BITS) & SEQ_MASK,
        id >> (TIME_BITS + SEQ_BITS),
    )
}

fn hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if rc != 0 {
        return None;
    }
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8(buf[..len].to_vec()).ok()
}
