/// Opaque version token returned by every successful metadata write.
///
/// The caller holds it and presents it on the next conditional update or
/// delete to request compare-and-swap. Callers must never interpret the
/// bytes; the encoding belongs to the backend that issued the token. An
/// empty token means "no prior version known".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionToken(Vec<u8>);

impl VersionToken {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The "no prior version known" token.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for VersionToken {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for VersionToken {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl AsRef<[u8]> for VersionToken {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
