use serde::de::DeserializeOwned;
use serde::Serialize;

use super::LD_CBOR_CODEC;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// A codec a block type can be framed with.
pub trait BlockCodec {
    const CODE: u64;

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError>;
    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError>;
}

/// dag-cbor, the only structured codec the block store speaks.
pub struct DagCborCodec;

impl BlockCodec for DagCborCodec {
    const CODE: u64 = LD_CBOR_CODEC;

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
        serde_ipld_dagcbor::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
        serde_ipld_dagcbor::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// Marker trait for types stored as encoded blocks.
///
/// Implementors pick up `encode`/`decode` and their codec tag for free:
///
/// ```ignore
/// impl BlockEncoded<DagCborCodec> for Node {}
/// ```
pub trait BlockEncoded<C: BlockCodec>: Serialize + DeserializeOwned {
    fn codec(&self) -> u64 {
        C::CODE
    }

    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        C::encode(self)
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        C::decode(bytes)
    }
}
