use std::fmt;
use std::str::FromStr;

use cid::Cid;
use multihash::Multihash;
use serde::{Deserialize, Serialize};

use super::{Hash, LD_BLAKE3_HASH, LD_RAW_CODEC};

#[derive(Debug, thiserror::Error)]
pub enum CidError {
    #[error("invalid cid: {0}")]
    Parse(#[from] cid::Error),
    #[error("invalid hash hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("unsupported multihash code: {0:#x}")]
    UnsupportedMultihash(u64),
    #[error("invalid digest length: {0}")]
    InvalidDigest(usize),
}

/// A content link: CIDv1 with a codec tag and a BLAKE3 multihash.
///
/// Serializes as a real IPLD link (dag-cbor tag 42), so links embedded in
/// encoded blocks are visible to generic IPLD traversal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Link(Cid);

impl Link {
    pub fn new(codec: u64, hash: Hash) -> Self {
        let mh = Multihash::<64>::wrap(LD_BLAKE3_HASH, hash.as_bytes())
            .expect("32-byte digest always fits a multihash");
        Link(Cid::new_v1(codec, mh))
    }

    pub fn cid(&self) -> &Cid {
        &self.0
    }

    pub fn codec(&self) -> u64 {
        self.0.codec()
    }

    pub fn hash(&self) -> Hash {
        let digest = self.0.hash().digest();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest[..32]);
        Hash::from_bytes(bytes)
    }
}

impl Default for Link {
    fn default() -> Self {
        Link::new(LD_RAW_CODEC, Hash::from_bytes([0u8; 32]))
    }
}

impl TryFrom<Cid> for Link {
    type Error = CidError;

    fn try_from(cid: Cid) -> Result<Self, Self::Error> {
        if cid.hash().code() != LD_BLAKE3_HASH {
            return Err(CidError::UnsupportedMultihash(cid.hash().code()));
        }
        if cid.hash().digest().len() != 32 {
            return Err(CidError::InvalidDigest(cid.hash().digest().len()));
        }
        Ok(Link(cid))
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Link({})", self.0)
    }
}

impl FromStr for Link {
    type Err = CidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cid = Cid::try_from(s)?;
        Link::try_from(cid)
    }
}
