use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};

use crate::linked_data::{
    BlockEncoded, CidError, CodecError, DagCborCodec, Hash, Link, LD_CBOR_CODEC, LD_RAW_CODEC,
};

mod gc;

pub use gc::PinLock;

#[derive(Debug, thiserror::Error)]
pub enum BlockStoreError {
    #[error("block not found: {0}")]
    NotFound(Link),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("cid error: {0}")]
    Cid(#[from] CidError),
}

/// Content-addressed store of immutable blocks.
///
/// Blocks go in, links come out; identical content always yields the same
/// link. Nothing is ever rewritten in place -- the only way data leaves the
/// store is [`BlockStore::sweep`], which spares pinned blocks and runs
/// behind the exclusive side of the gate [`BlockStore::pin_lock`] guards.
///
/// Safe to share across tasks; all methods take `&self`.
#[derive(Clone, Debug)]
pub struct BlockStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    blocks: RwLock<HashMap<Hash, Bytes>>,
    pins: Mutex<HashSet<Hash>>,
    gate: Arc<tokio::sync::RwLock<()>>,
}

impl BlockStore {
    /// A fresh, empty in-memory store.
    pub fn memory() -> Self {
        Self {
            inner: Arc::new(Inner {
                blocks: RwLock::new(HashMap::new()),
                pins: Mutex::new(HashSet::new()),
                gate: Arc::new(tokio::sync::RwLock::new(())),
            }),
        }
    }

    /// Get a block's bytes.
    pub async fn get(&self, link: &Link) -> Result<Bytes, BlockStoreError> {
        let blocks = self.inner.blocks.read();
        blocks
            .get(&link.hash())
            .cloned()
            .ok_or(BlockStoreError::NotFound(*link))
    }

    /// Get a dag-cbor block, decoded.
    pub async fn get_cbor<T: BlockEncoded<DagCborCodec>>(
        &self,
        link: &Link,
    ) -> Result<T, BlockStoreError> {
        let bytes = self.get(link).await?;
        Ok(T::decode(&bytes)?)
    }

    /// Store raw bytes, returning a raw-codec link.
    pub async fn put(&self, data: Vec<u8>) -> Result<Link, BlockStoreError> {
        Ok(self.insert(LD_RAW_CODEC, Bytes::from(data)))
    }

    /// Encode a value as dag-cbor and store it.
    pub async fn put_cbor<T: BlockEncoded<DagCborCodec>>(
        &self,
        value: &T,
    ) -> Result<Link, BlockStoreError> {
        let bytes = value.encode()?;
        Ok(self.insert(LD_CBOR_CODEC, Bytes::from(bytes)))
    }

    /// Whether a block is present.
    pub async fn has(&self, link: &Link) -> Result<bool, BlockStoreError> {
        Ok(self.inner.blocks.read().contains_key(&link.hash()))
    }

    /// Number of blocks held.
    pub fn len(&self) -> usize {
        self.inner.blocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.blocks.read().is_empty()
    }

    fn insert(&self, codec: u64, bytes: Bytes) -> Link {
        let hash = Hash::new(&bytes);
        self.inner.blocks.write().entry(hash).or_insert(bytes);
        Link::new(codec, hash)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get() {
        let store = BlockStore::memory();
        let link = store.put(b"hello blocks".to_vec()).await.unwrap();
        let bytes = store.get(&link).await.unwrap();
        assert_eq!(bytes.as_ref(), b"hello blocks");
    }

    #[tokio::test]
    async fn test_put_twice_same_link() {
        let store = BlockStore::memory();
        let a = store.put(b"xyz".to_vec()).await.unwrap();
        let b = store.put(b"xyz".to_vec()).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = BlockStore::memory();
        let link = Link::new(LD_RAW_CODEC, Hash::new(b"nope"));
        assert!(matches!(
            store.get(&link).await,
            Err(BlockStoreError::NotFound(_))
        ));
        assert!(!store.has(&link).await.unwrap());
    }
}
