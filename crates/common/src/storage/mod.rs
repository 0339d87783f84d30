//! The full storage contract a git engine needs, mapped onto a mount.
//!
//! - **[`ObjectStorage`]**: content-addressed objects under `objects/`
//! - **[`ReferenceStorage`]**: refs as leaf files, compare-and-swap guarded
//! - **[`ModuleStorage`]**: lazily-provisioned nested storage per submodule
//! - **[`Storage`]**: the composite, plus in-memory config/index/shallow
//!
//! The composite's whole value is uniformity: a git engine can treat the
//! content-addressed substrate exactly like any other backend, with no
//! special-casing anywhere else.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::blocks::BlockStore;
use crate::git::{GitError, ObjectId, ObjectKind, Reference, HEAD};
use crate::linked_data::Link;
use crate::mount::{Mount, MountError};

mod modules;
mod objects;
mod refs;

pub use modules::ModuleStorage;
pub use objects::{ObjectIds, ObjectIter, ObjectStorage};
pub use refs::ReferenceStorage;

/// Top-level directory for objects.
pub const OBJECTS_PATH: &str = "objects";
/// Top-level directory for refs.
pub const REFS_PATH: &str = "refs";
/// Side-channel directory some tools drop under `objects/`; skipped.
pub const INFO_PATH: &str = "info";

/// Default branch a fresh repository's HEAD points at.
pub const DEFAULT_BRANCH: &str = "refs/heads/main";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),
    #[error("reference not found: {0:?}")]
    ReferenceNotFound(String),
    #[error("reference has changed")]
    ReferenceChanged,
    #[error("unsupported object type: {0}")]
    UnsupportedObjectType(ObjectKind),
    #[error("git error: {0}")]
    Git(#[from] GitError),
    #[error("mount error: {0}")]
    Mount(#[from] MountError),
}

/// In-memory repository config: `section.key = value`, last writer wins.
/// Never written to the DAG; it lives and dies with the storage instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl Config {
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(String::as_str)
    }

    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }
}

/// In-memory index, version 2 by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    pub version: u32,
    pub entries: Vec<IndexEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub path: String,
    pub id: ObjectId,
    pub mode: u32,
}

impl Default for Index {
    fn default() -> Self {
        Index {
            version: 2,
            entries: Vec::new(),
        }
    }
}

/// The composite storage backend: objects + refs + modules over one mount,
/// plus transient config/shallow/index state.
///
/// One instance per request; callers serialize access to a given instance.
#[derive(Clone)]
pub struct Storage {
    fs: Mount,
    objects: ObjectStorage,
    refs: ReferenceStorage,
    modules: ModuleStorage,
    config: Arc<Mutex<Option<Config>>>,
    shallow: Arc<Mutex<Vec<ObjectId>>>,
    index: Arc<Mutex<Option<Index>>>,
}

impl Storage {
    /// Create storage over a fresh, empty repository: `objects/`, `refs/`,
    /// and a symbolic HEAD at the default branch.
    pub async fn init(blocks: &BlockStore) -> Result<Self, StorageError> {
        let fs = Mount::init(blocks).await?;
        fs.mkdir(OBJECTS_PATH).await?;
        fs.mkdir(REFS_PATH).await?;
        let storage = Self::open(fs);
        storage
            .refs()
            .set(&Reference::new_symbolic(HEAD, DEFAULT_BRANCH))
            .await?;
        Ok(storage)
    }

    /// Wrap storage around an existing repository tree.
    pub fn open(fs: Mount) -> Self {
        Storage {
            objects: ObjectStorage::new(fs.clone()),
            refs: ReferenceStorage::new(fs.clone()),
            modules: ModuleStorage::new(fs.blocks()),
            fs,
            config: Arc::new(Mutex::new(None)),
            shallow: Arc::new(Mutex::new(Vec::new())),
            index: Arc::new(Mutex::new(None)),
        }
    }

    pub fn objects(&self) -> &ObjectStorage {
        &self.objects
    }

    pub fn refs(&self) -> &ReferenceStorage {
        &self.refs
    }

    pub fn modules(&self) -> &ModuleStorage {
        &self.modules
    }

    pub fn mount(&self) -> &Mount {
        &self.fs
    }

    /// Persist the repository tree, returning the new root link. Nothing
    /// here decides when to call this; that is the session's job.
    pub async fn flush(&self) -> Result<Link, StorageError> {
        Ok(self.fs.save().await?)
    }

    pub async fn config(&self) -> Config {
        self.config.lock().await.clone().unwrap_or_default()
    }

    pub async fn set_config(&self, config: Config) {
        *self.config.lock().await = Some(config);
    }

    pub async fn shallow(&self) -> Vec<ObjectId> {
        self.shallow.lock().await.clone()
    }

    pub async fn set_shallow(&self, ids: Vec<ObjectId>) {
        *self.shallow.lock().await = ids;
    }

    pub async fn index(&self) -> Index {
        self.index.lock().await.clone().unwrap_or_default()
    }

    pub async fn set_index(&self, index: Index) {
        *self.index.lock().await = Some(index);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::git::Object;

    #[tokio::test]
    async fn test_init_writes_skeleton() {
        let blocks = BlockStore::memory();
        let storage = Storage::init(&blocks).await.unwrap();

        let head = storage.refs().get(HEAD).await.unwrap();
        assert_eq!(head.symbolic_target(), Some(DEFAULT_BRANCH));

        // refs/ exists and is empty, so listing yields just HEAD
        let refs = storage.refs().list().await.unwrap();
        assert_eq!(refs.len(), 1);
    }

    #[tokio::test]
    async fn test_flush_then_open_roundtrip() {
        let blocks = BlockStore::memory();
        let storage = Storage::init(&blocks).await.unwrap();

        let id = storage
            .objects()
            .put(&Object::new(ObjectKind::Blob, b"hello".to_vec()))
            .await
            .unwrap();
        storage
            .refs()
            .set(&Reference::new_hash(DEFAULT_BRANCH, id))
            .await
            .unwrap();

        let link = storage.flush().await.unwrap();

        let reopened = Storage::open(Mount::load(&link, &blocks).await.unwrap());
        assert!(reopened.objects().has(&id).await.unwrap());
        let object = reopened.objects().get(&id, None).await.unwrap();
        assert_eq!(object.data().as_ref(), b"hello");
        assert_eq!(
            reopened.refs().get(DEFAULT_BRANCH).await.unwrap().hash(),
            Some(id)
        );
        assert_eq!(
            reopened.refs().get(HEAD).await.unwrap().symbolic_target(),
            Some(DEFAULT_BRANCH)
        );
    }

    #[tokio::test]
    async fn test_config_index_shallow_defaults() {
        let blocks = BlockStore::memory();
        let storage = Storage::init(&blocks).await.unwrap();

        assert_eq!(storage.config().await, Config::default());
        assert_eq!(storage.index().await.version, 2);
        assert!(storage.shallow().await.is_empty());

        let mut config = Config::default();
        config.set("core", "bare", "true");
        storage.set_config(config.clone()).await;
        assert_eq!(storage.config().await, config);

        storage
            .set_shallow(vec![ObjectId::from_bytes([7u8; 20])])
            .await;
        assert_eq!(storage.shallow().await.len(), 1);
    }
}
