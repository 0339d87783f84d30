use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::sync::Mutex;

use crate::blocks::{BlockStore, BlockStoreError};
use crate::linked_data::{CodecError, Link};

use super::node::{Node, NodeLink};
use super::pins::Pins;

#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error("path not found: {0}")]
    PathNotFound(String),
    #[error("path is not a directory: {0}")]
    NotADirectory(String),
    #[error("path already exists: {0}")]
    PathAlreadyExists(String),
    #[error("invalid path: {0:?}")]
    InvalidPath(String),
    #[error("block store error: {0}")]
    Blocks(#[from] BlockStoreError),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Split a path into its components. Paths are `/`-delimited and
/// root-relative; a leading `/` is stripped. Empty paths and empty
/// components are errors.
fn split_path(path: &str) -> Result<Vec<String>, MountError> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return Err(MountError::InvalidPath(path.to_string()));
    }
    let parts: Vec<String> = trimmed.split('/').map(str::to_string).collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(MountError::InvalidPath(path.to_string()));
    }
    Ok(parts)
}

struct MountInner {
    // link of the current root node, as last persisted
    root: Link,
    // the loaded root node
    entry: Node,
    // every block hash written through this mount
    pins: Pins,
}

/// Mutable-filesystem view over one immutable directory tree.
///
/// A mount wraps the link of a current root node. Every write or remove
/// rebuilds the touched path bottom-up, persisting each rebuilt node and
/// rebinding the root to the newly persisted top -- the old root stays
/// valid and unchanged, which is what gives concurrent readers and nested
/// mounts snapshot isolation.
///
/// Operations on one mount are serialized internally; share a mount across
/// tasks only if that is the ordering you want.
#[derive(Clone)]
pub struct Mount {
    inner: Arc<Mutex<MountInner>>,
    blocks: BlockStore,
}

impl Mount {
    /// Create a mount over a fresh, empty root.
    pub async fn init(blocks: &BlockStore) -> Result<Self, MountError> {
        let entry = Node::default();
        let root = blocks.put_cbor(&entry).await?;
        let mut pins = Pins::new();
        pins.insert(root.hash());
        Ok(Mount {
            inner: Arc::new(Mutex::new(MountInner { root, entry, pins })),
            blocks: blocks.clone(),
        })
    }

    /// Open a mount over an existing root link.
    pub async fn load(link: &Link, blocks: &BlockStore) -> Result<Self, MountError> {
        let entry: Node = blocks.get_cbor(link).await?;
        Ok(Mount {
            inner: Arc::new(Mutex::new(MountInner {
                root: *link,
                entry,
                pins: Pins::new(),
            })),
            blocks: blocks.clone(),
        })
    }

    pub fn blocks(&self) -> BlockStore {
        self.blocks.clone()
    }

    /// The current root link.
    pub async fn root(&self) -> Link {
        self.inner.lock().await.root
    }

    /// Hashes written through this mount since it was opened.
    pub async fn pins(&self) -> Pins {
        self.inner.lock().await.pins.clone()
    }

    /// Persist the current root and return its link.
    ///
    /// Everything below the root was already persisted by the operation
    /// that produced it, so this pins nothing new -- it hands the caller
    /// the identifier that makes the writes reachable.
    pub async fn save(&self) -> Result<Link, MountError> {
        let mut inner = self.inner.lock().await;
        let root = self.blocks.put_cbor(&inner.entry).await?;
        inner.pins.insert(root.hash());
        inner.root = root;
        tracing::debug!("mount saved as {}", root);
        Ok(root)
    }

    /// Find the link at a path.
    pub async fn find(&self, path: &str) -> Result<NodeLink, MountError> {
        let parts = split_path(path)?;
        let inner = self.inner.lock().await;
        let entry = inner.entry.clone();
        drop(inner);
        self.resolve(&entry, &parts).await
    }

    /// Read the file at a path.
    pub async fn read(&self, path: &str) -> Result<Bytes, MountError> {
        match self.find(path).await? {
            NodeLink::Data { link, .. } => Ok(self.blocks.get(&link).await?),
            // directories have no byte content
            NodeLink::Dir { .. } => Err(MountError::PathNotFound(path.to_string())),
        }
    }

    /// Write a file at a path, creating missing intermediate directories.
    pub async fn write(&self, path: &str, data: &[u8]) -> Result<(), MountError> {
        let parts = split_path(path)?;
        let mut inner = self.inner.lock().await;
        let MountInner { root, entry, pins } = &mut *inner;

        let data_link = self.blocks.put(data.to_vec()).await?;
        pins.insert(data_link.hash());
        let child = NodeLink::new_data(data_link, data.len() as u64);

        let (node, link) = self.set_path(entry.clone(), &parts, child, pins).await?;
        *entry = node;
        *root = link;
        Ok(())
    }

    /// Create an empty directory at a path.
    pub async fn mkdir(&self, path: &str) -> Result<(), MountError> {
        let parts = split_path(path)?;
        let mut inner = self.inner.lock().await;
        let MountInner { root, entry, pins } = &mut *inner;

        if self.resolve(entry, &parts).await.is_ok() {
            return Err(MountError::PathAlreadyExists(path.to_string()));
        }

        let dir_link = self.blocks.put_cbor(&Node::new()).await?;
        pins.insert(dir_link.hash());

        let (node, link) = self
            .set_path(entry.clone(), &parts, NodeLink::new_dir(dir_link), pins)
            .await?;
        *entry = node;
        *root = link;
        Ok(())
    }

    /// Remove the entry at a path. Removing an absent path is a no-op;
    /// missing intermediate directories are never created here.
    pub async fn remove(&self, path: &str) -> Result<(), MountError> {
        let parts = split_path(path)?;
        let mut inner = self.inner.lock().await;
        let MountInner { root, entry, pins } = &mut *inner;

        match self.remove_path(entry.clone(), &parts, pins).await? {
            None => Ok(()),
            Some((node, link)) => {
                *entry = node;
                *root = link;
                Ok(())
            }
        }
    }

    /// Start a lazy, depth-first, pre-order traversal of everything at or
    /// below `path`. The cursor runs against the tree as it was when the
    /// walk began; later mutations of the mount do not show up.
    pub async fn walk(&self, path: &str) -> Result<Walk, MountError> {
        let inner = self.inner.lock().await;
        let entry = inner.entry.clone();
        drop(inner);

        let (prefix, node) = if path.is_empty() || path == "/" {
            (String::new(), entry)
        } else {
            let parts = split_path(path)?;
            match self.resolve(&entry, &parts).await? {
                NodeLink::Dir { link } => (parts.join("/"), self.blocks.get_cbor(&link).await?),
                NodeLink::Data { .. } => return Err(MountError::NotADirectory(path.to_string())),
            }
        };

        Ok(Walk::new(self.blocks.clone(), prefix, &node))
    }

    async fn resolve(&self, entry: &Node, parts: &[String]) -> Result<NodeLink, MountError> {
        let mut node = entry.clone();
        for (i, name) in parts.iter().enumerate() {
            let link = node
                .get_link(name)
                .cloned()
                .ok_or_else(|| MountError::PathNotFound(parts.join("/")))?;
            if i + 1 == parts.len() {
                return Ok(link);
            }
            match &link {
                NodeLink::Dir { link } => node = self.blocks.get_cbor(link).await?,
                NodeLink::Data { .. } => {
                    return Err(MountError::PathNotFound(parts.join("/")))
                }
            }
        }
        Err(MountError::InvalidPath(parts.join("/")))
    }

    // Resolve-then-rebuild: descend along `parts`, then persist every
    // visited directory node bottom-up with the modified child link.
    // Returns the rebuilt node and its new link for the caller to relink.
    fn set_path<'a>(
        &'a self,
        node: Node,
        parts: &'a [String],
        child: NodeLink,
        pins: &'a mut Pins,
    ) -> BoxFuture<'a, Result<(Node, Link), MountError>> {
        Box::pin(async move {
            let (name, rest) = parts
                .split_first()
                .ok_or_else(|| MountError::InvalidPath(String::new()))?;
            let mut node = node;

            let new_child = if rest.is_empty() {
                child
            } else {
                let sub = match node.get_link(name) {
                    Some(NodeLink::Dir { link }) => self.blocks.get_cbor(link).await?,
                    Some(NodeLink::Data { .. }) => {
                        return Err(MountError::NotADirectory(name.clone()))
                    }
                    // missing intermediates become empty directories
                    None => Node::new(),
                };
                let (_, link) = self.set_path(sub, rest, child, pins).await?;
                NodeLink::new_dir(link)
            };

            node.insert(name.clone(), new_child);
            let link = self.blocks.put_cbor(&node).await?;
            pins.insert(link.hash());
            Ok((node, link))
        })
    }

    // Same shape as set_path, dropping the leaf instead of replacing it.
    // Returns None if the path was absent, leaving the tree untouched.
    fn remove_path<'a>(
        &'a self,
        node: Node,
        parts: &'a [String],
        pins: &'a mut Pins,
    ) -> BoxFuture<'a, Result<Option<(Node, Link)>, MountError>> {
        Box::pin(async move {
            let (name, rest) = parts
                .split_first()
                .ok_or_else(|| MountError::InvalidPath(String::new()))?;
            let mut node = node;

            if rest.is_empty() {
                if node.del(name).is_none() {
                    return Ok(None);
                }
            } else {
                let sub = match node.get_link(name) {
                    Some(NodeLink::Dir { link }) => self.blocks.get_cbor(link).await?,
                    _ => return Ok(None),
                };
                match self.remove_path(sub, rest, pins).await? {
                    None => return Ok(None),
                    Some((_, link)) => {
                        node.insert(name.clone(), NodeLink::new_dir(link));
                    }
                }
            }

            let link = self.blocks.put_cbor(&node).await?;
            pins.insert(link.hash());
            Ok(Some((node, link)))
        })
    }
}

/// Cursor over a depth-first, pre-order traversal.
///
/// Consumers pull one entry at a time; the cursor descends into directory
/// links and never past data links. Exhaustion is `Ok(None)`.
pub struct Walk {
    blocks: BlockStore,
    stack: Vec<(String, std::vec::IntoIter<(String, NodeLink)>)>,
}

impl Walk {
    fn new(blocks: BlockStore, prefix: String, node: &Node) -> Self {
        let entries: Vec<(String, NodeLink)> = node
            .links()
            .iter()
            .map(|(n, l)| (n.clone(), l.clone()))
            .collect();
        Walk {
            blocks,
            stack: vec![(prefix, entries.into_iter())],
        }
    }

    /// The next entry, or `None` once the traversal is exhausted.
    pub async fn next(&mut self) -> Result<Option<(String, NodeLink)>, MountError> {
        loop {
            let top = match self.stack.last_mut() {
                None => return Ok(None),
                Some((prefix, iter)) => iter.next().map(|entry| (prefix.clone(), entry)),
            };
            match top {
                None => {
                    self.stack.pop();
                }
                Some((prefix, (name, link))) => {
                    let path = if prefix.is_empty() {
                        name
                    } else {
                        format!("{}/{}", prefix, name)
                    };
                    if let NodeLink::Dir { link: dir } = &link {
                        let node: Node = self.blocks.get_cbor(dir).await?;
                        let entries: Vec<(String, NodeLink)> = node
                            .links()
                            .iter()
                            .map(|(n, l)| (n.clone(), l.clone()))
                            .collect();
                        self.stack.push((path.clone(), entries.into_iter()));
                    }
                    return Ok(Some((path, link)));
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_write_then_read() {
        let blocks = BlockStore::memory();
        let mount = Mount::init(&blocks).await.unwrap();

        mount.write("a/b/c.txt", b"hello").await.unwrap();
        let bytes = mount.read("a/b/c.txt").await.unwrap();
        assert_eq!(bytes.as_ref(), b"hello");
    }

    #[tokio::test]
    async fn test_every_write_rebinds_root() {
        let blocks = BlockStore::memory();
        let mount = Mount::init(&blocks).await.unwrap();
        let empty_root = mount.root().await;

        mount.write("file", b"one").await.unwrap();
        let root_one = mount.root().await;
        assert_ne!(empty_root, root_one);

        // the old root is still loadable and unchanged
        let old = Mount::load(&empty_root, &blocks).await.unwrap();
        assert!(matches!(
            old.read("file").await,
            Err(MountError::PathNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_same_write_same_root() {
        let blocks = BlockStore::memory();
        let a = Mount::init(&blocks).await.unwrap();
        let b = Mount::init(&blocks).await.unwrap();

        a.write("dir/file", b"payload").await.unwrap();
        b.write("dir/file", b"payload").await.unwrap();

        assert_eq!(a.root().await, b.root().await);
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let blocks = BlockStore::memory();
        let mount = Mount::init(&blocks).await.unwrap();
        let root = mount.root().await;

        mount.remove("not/there").await.unwrap();
        assert_eq!(mount.root().await, root);
    }

    #[tokio::test]
    async fn test_remove_then_find() {
        let blocks = BlockStore::memory();
        let mount = Mount::init(&blocks).await.unwrap();

        mount.write("a/b", b"x").await.unwrap();
        mount.remove("a/b").await.unwrap();
        assert!(matches!(
            mount.find("a/b").await,
            Err(MountError::PathNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_paths() {
        let blocks = BlockStore::memory();
        let mount = Mount::init(&blocks).await.unwrap();

        assert!(matches!(
            mount.write("", b"x").await,
            Err(MountError::InvalidPath(_))
        ));
        assert!(matches!(
            mount.write("a//b", b"x").await,
            Err(MountError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_walk_preorder() {
        let blocks = BlockStore::memory();
        let mount = Mount::init(&blocks).await.unwrap();

        mount.write("top/a/x", b"1").await.unwrap();
        mount.write("top/b", b"2").await.unwrap();

        let mut walk = mount.walk("top").await.unwrap();
        let mut seen = Vec::new();
        while let Some((path, _)) = walk.next().await.unwrap() {
            seen.push(path);
        }
        assert_eq!(seen, vec!["top/a", "top/a/x", "top/b"]);
    }

    #[tokio::test]
    async fn test_walk_missing_path() {
        let blocks = BlockStore::memory();
        let mount = Mount::init(&blocks).await.unwrap();
        assert!(mount.walk("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let blocks = BlockStore::memory();
        let mount = Mount::init(&blocks).await.unwrap();
        mount.write("refs/heads/main", b"abc").await.unwrap();
        let link = mount.save().await.unwrap();

        let reloaded = Mount::load(&link, &blocks).await.unwrap();
        assert_eq!(
            reloaded.read("refs/heads/main").await.unwrap().as_ref(),
            b"abc"
        );
    }
}
