use std::fmt;
use std::str::FromStr;

use super::CidError;

/// A 32-byte BLAKE3 digest naming a block's content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Hash the given bytes.
    pub fn new(data: impl AsRef<[u8]>) -> Self {
        Hash(*blake3::hash(data.as_ref()).as_bytes())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self)
    }
}

impl FromStr for Hash {
    type Err = CidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| CidError::InvalidDigest(v.len()))?;
        Ok(Hash(bytes))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_hash_hex_roundtrip() {
        let hash = Hash::new(b"hello world");
        let parsed: Hash = hash.to_string().parse().unwrap();
        assert_eq!(hash, parsed);
    }

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(Hash::new(b"abc"), Hash::new(b"abc"));
        assert_ne!(Hash::new(b"abc"), Hash::new(b"abd"));
    }

    #[test]
    fn test_hash_rejects_short_hex() {
        assert!("00112233".parse::<Hash>().is_err());
    }
}
