use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use sha1::{Digest, Sha1};

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("invalid object id: {0:?}")]
    InvalidId(String),
    #[error("unknown object type: {0:?}")]
    UnknownType(String),
    #[error("corrupt object: {0}")]
    Corrupt(String),
}

/// A 20-byte SHA-1 object id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 20]);

impl ObjectId {
    /// The all-zero id the wire protocol uses for "no object".
    pub const ZERO: ObjectId = ObjectId([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        ObjectId(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, GitError> {
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| GitError::InvalidId(hex::encode(bytes)))?;
        Ok(ObjectId(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self)
    }
}

impl FromStr for ObjectId {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| GitError::InvalidId(s.to_string()))?;
        Self::from_slice(&bytes)
    }
}

/// Object types, including the two delta representations some transports
/// carry. Deltas never reach storage; they must be resolved into full
/// objects first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Commit,
    Tree,
    Blob,
    Tag,
    OfsDelta,
    RefDelta,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Commit => "commit",
            ObjectKind::Tree => "tree",
            ObjectKind::Blob => "blob",
            ObjectKind::Tag => "tag",
            ObjectKind::OfsDelta => "ofs-delta",
            ObjectKind::RefDelta => "ref-delta",
        }
    }

    pub fn is_delta(&self) -> bool {
        matches!(self, ObjectKind::OfsDelta | ObjectKind::RefDelta)
    }

    /// Pack-format type code (git numbering).
    pub fn type_byte(&self) -> u8 {
        match self {
            ObjectKind::Commit => 1,
            ObjectKind::Tree => 2,
            ObjectKind::Blob => 3,
            ObjectKind::Tag => 4,
            ObjectKind::OfsDelta => 6,
            ObjectKind::RefDelta => 7,
        }
    }

    pub fn from_type_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(ObjectKind::Commit),
            2 => Some(ObjectKind::Tree),
            3 => Some(ObjectKind::Blob),
            4 => Some(ObjectKind::Tag),
            6 => Some(ObjectKind::OfsDelta),
            7 => Some(ObjectKind::RefDelta),
            _ => None,
        }
    }
}

impl FromStr for ObjectKind {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "commit" => Ok(ObjectKind::Commit),
            "tree" => Ok(ObjectKind::Tree),
            "blob" => Ok(ObjectKind::Blob),
            "tag" => Ok(ObjectKind::Tag),
            other => Err(GitError::UnknownType(other.to_string())),
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fully-materialized object: kind plus raw payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Object {
    kind: ObjectKind,
    data: Bytes,
}

impl Object {
    pub fn new(kind: ObjectKind, data: impl Into<Bytes>) -> Self {
        Object {
            kind,
            data: data.into(),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// The object's id: SHA-1 over the header-framed payload.
    pub fn id(&self) -> ObjectId {
        let mut hasher = Sha1::new();
        hasher.update(self.header());
        hasher.update(&self.data);
        ObjectId(hasher.finalize().into())
    }

    fn header(&self) -> Vec<u8> {
        format!("{} {}\0", self.kind.as_str(), self.data.len()).into_bytes()
    }

    /// Header-framed form, as stored: `"<kind> <len>\0"` + payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.header();
        out.extend_from_slice(&self.data);
        out
    }

    /// Parse the header-framed form, verifying the declared length against
    /// the bytes actually present.
    pub fn decode(bytes: &[u8]) -> Result<Object, GitError> {
        let nul = bytes
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| GitError::Corrupt("missing header terminator".to_string()))?;
        let header = std::str::from_utf8(&bytes[..nul])
            .map_err(|_| GitError::Corrupt("header is not utf-8".to_string()))?;
        let (kind, len) = header
            .split_once(' ')
            .ok_or_else(|| GitError::Corrupt("malformed header".to_string()))?;
        let kind: ObjectKind = kind.parse()?;
        let len: usize = len
            .parse()
            .map_err(|_| GitError::Corrupt("malformed header length".to_string()))?;

        let payload = &bytes[nul + 1..];
        if payload.len() != len {
            return Err(GitError::Corrupt(format!(
                "declared length {} but read {}",
                len,
                payload.len()
            )));
        }

        Ok(Object::new(kind, payload.to_vec()))
    }
}
