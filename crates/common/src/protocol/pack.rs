//! The pack transport format: how object batches ride inside upload-pack
//! and receive-pack bodies.
//!
//! Layout: `PACK` magic, a version word, an entry count; then per entry a
//! kind byte, varint uncompressed/compressed sizes, the zstd-compressed
//! payload, and a crc32 of the compressed bytes; finally a SHA-1 trailer
//! over everything before it. Delta entries are representable on the wire
//! but storage refuses them, so a conformant sender resolves deltas first.

use sha1::{Digest, Sha1};

use crate::git::{Object, ObjectKind};

pub const PACK_MAGIC: &[u8; 4] = b"PACK";
pub const PACK_VERSION: u32 = 2;

const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("corrupt pack: {0}")]
    Corrupt(String),
    #[error("compression error: {0}")]
    Compression(String),
    #[error("entry checksum mismatch at offset {0}")]
    EntryChecksum(usize),
    #[error("pack checksum mismatch")]
    ChecksumMismatch,
}

/// Builds a pack from fully-materialized objects.
#[derive(Debug, Default)]
pub struct PackWriter {
    entries: Vec<(ObjectKind, Vec<u8>)>,
}

impl PackWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object(&mut self, object: &Object) {
        self.entries.push((object.kind(), object.data().to_vec()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn finish(self) -> Result<Vec<u8>, PackError> {
        let mut out = Vec::new();
        out.extend_from_slice(PACK_MAGIC);
        out.extend_from_slice(&PACK_VERSION.to_be_bytes());
        out.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());

        for (kind, data) in &self.entries {
            out.push(kind.type_byte());

            let compressed = zstd::encode_all(data.as_slice(), ZSTD_LEVEL)
                .map_err(|e| PackError::Compression(e.to_string()))?;

            encode_varint(&mut out, data.len() as u64);
            encode_varint(&mut out, compressed.len() as u64);
            out.extend_from_slice(&compressed);
            out.extend_from_slice(&crc32fast::hash(&compressed).to_be_bytes());
        }

        let mut hasher = Sha1::new();
        hasher.update(&out);
        out.extend_from_slice(&hasher.finalize());
        Ok(out)
    }
}

/// Parses a pack back into `(kind, payload)` entries, verifying per-entry
/// crc32s and the SHA-1 trailer.
pub struct PackReader;

impl PackReader {
    pub fn parse(data: &[u8]) -> Result<Vec<(ObjectKind, Vec<u8>)>, PackError> {
        // an absent pack (e.g. a delete-only push) carries no bytes at all
        if data.is_empty() {
            return Ok(Vec::new());
        }
        if data.len() < 12 + 20 {
            return Err(PackError::Corrupt("shorter than header + trailer".to_string()));
        }

        let (body, trailer) = data.split_at(data.len() - 20);
        let mut hasher = Sha1::new();
        hasher.update(body);
        if hasher.finalize().as_slice() != trailer {
            return Err(PackError::ChecksumMismatch);
        }

        if &body[..4] != PACK_MAGIC {
            return Err(PackError::Corrupt("bad magic".to_string()));
        }
        let version = u32::from_be_bytes(
            body[4..8]
                .try_into()
                .map_err(|_| PackError::Corrupt("short header".to_string()))?,
        );
        if version != PACK_VERSION {
            return Err(PackError::Corrupt(format!("unsupported version {}", version)));
        }
        let count = u32::from_be_bytes(
            body[8..12]
                .try_into()
                .map_err(|_| PackError::Corrupt("short header".to_string()))?,
        ) as usize;

        let mut entries = Vec::with_capacity(count);
        let mut rest = &body[12..];
        for _ in 0..count {
            let offset = body.len() - rest.len();

            let (&kind_byte, after) = rest
                .split_first()
                .ok_or_else(|| PackError::Corrupt("truncated entry".to_string()))?;
            let kind = ObjectKind::from_type_byte(kind_byte)
                .ok_or_else(|| PackError::Corrupt(format!("unknown entry kind {}", kind_byte)))?;
            rest = after;

            let (uncompressed_len, used) = decode_varint(rest)?;
            rest = &rest[used..];
            let (compressed_len, used) = decode_varint(rest)?;
            rest = &rest[used..];

            let compressed_len = compressed_len as usize;
            if rest.len() < compressed_len + 4 {
                return Err(PackError::Corrupt("truncated entry payload".to_string()));
            }
            let compressed = &rest[..compressed_len];
            let crc = u32::from_be_bytes(
                rest[compressed_len..compressed_len + 4]
                    .try_into()
                    .map_err(|_| PackError::Corrupt("truncated entry crc".to_string()))?,
            );
            rest = &rest[compressed_len + 4..];

            if crc32fast::hash(compressed) != crc {
                return Err(PackError::EntryChecksum(offset));
            }

            let data = zstd::decode_all(compressed)
                .map_err(|e| PackError::Compression(e.to_string()))?;
            if data.len() as u64 != uncompressed_len {
                return Err(PackError::Corrupt(format!(
                    "declared size {} but inflated {}",
                    uncompressed_len,
                    data.len()
                )));
            }

            entries.push((kind, data));
        }

        if !rest.is_empty() {
            return Err(PackError::Corrupt("trailing bytes after entries".to_string()));
        }

        Ok(entries)
    }
}

fn encode_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

fn decode_varint(data: &[u8]) -> Result<(u64, usize), PackError> {
    let mut value: u64 = 0;
    let mut shift = 0;
    for (i, &byte) in data.iter().enumerate() {
        value |= ((byte & 0x7f) as u64) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        if shift >= 64 {
            return Err(PackError::Corrupt("varint overflow".to_string()));
        }
    }
    Err(PackError::Corrupt("truncated varint".to_string()))
}
