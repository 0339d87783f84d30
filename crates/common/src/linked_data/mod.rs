//! Linked-data primitives: hashes, links, and block codecs.
//!
//! Everything stored in the block store is addressed by a [`Link`] -- a
//! CIDv1 carrying a codec tag and a BLAKE3 digest. Structured blocks are
//! dag-cbor encoded through [`BlockEncoded`], so links embedded in them
//! round-trip as real IPLD links and stay discoverable by generic
//! traversal (which is what recursive pinning relies on).

mod block;
mod hash;
mod link;

pub use block::{BlockCodec, BlockEncoded, CodecError, DagCborCodec};
pub use hash::Hash;
pub use link::{CidError, Link};

pub use cid::Cid;

/// Multicodec for raw byte blocks.
pub const LD_RAW_CODEC: u64 = 0x55;
/// Multicodec for dag-cbor blocks.
pub const LD_CBOR_CODEC: u64 = 0x71;
/// Multihash code for BLAKE3.
pub const LD_BLAKE3_HASH: u64 = 0x1e;
