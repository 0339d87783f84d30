use crate::git::{Reference, HEAD};
use crate::mount::{Mount, MountError};

use super::{StorageError, REFS_PATH};

/// Reference storage over a mount: one leaf file per ref, named by the
/// ref's own hierarchical name.
#[derive(Clone)]
pub struct ReferenceStorage {
    fs: Mount,
}

impl ReferenceStorage {
    pub fn new(fs: Mount) -> Self {
        ReferenceStorage { fs }
    }

    /// Write a ref unconditionally.
    pub async fn set(&self, reference: &Reference) -> Result<(), StorageError> {
        self.fs
            .write(reference.name(), reference.encode().as_bytes())
            .await?;
        Ok(())
    }

    /// Write `new`, but only if the stored value for `old`'s name is still
    /// `old`. With no `old` this is an unconditional set.
    ///
    /// This is the only optimistic-concurrency guard in the system: any
    /// mismatch -- including the ref having vanished -- fails with
    /// [`StorageError::ReferenceChanged`] and leaves storage untouched.
    /// There is no retry here; that is the caller's policy.
    pub async fn check_and_set(
        &self,
        new: &Reference,
        old: Option<&Reference>,
    ) -> Result<(), StorageError> {
        let Some(old) = old else {
            return self.set(new).await;
        };

        let current = match self.get(old.name()).await {
            Ok(current) => current,
            Err(StorageError::ReferenceNotFound(_)) => return Err(StorageError::ReferenceChanged),
            Err(err) => return Err(err),
        };
        if current.hash() != old.hash() {
            return Err(StorageError::ReferenceChanged);
        }

        self.set(new).await
    }

    /// Read a ref by name.
    pub async fn get(&self, name: &str) -> Result<Reference, StorageError> {
        let bytes = match self.fs.read(name).await {
            Ok(bytes) => bytes,
            Err(MountError::PathNotFound(_)) => {
                return Err(StorageError::ReferenceNotFound(name.to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| StorageError::ReferenceNotFound(name.to_string()))?;
        Ok(Reference::decode(name, content)?)
    }

    /// Every ref: HEAD first when present, then each leaf under `refs/`
    /// in traversal order.
    pub async fn list(&self) -> Result<Vec<Reference>, StorageError> {
        let mut refs = Vec::new();

        match self.get(HEAD).await {
            Ok(head) => refs.push(head),
            Err(StorageError::ReferenceNotFound(_)) => {}
            Err(err) => return Err(err),
        }

        let mut walk = self.fs.walk(REFS_PATH).await?;
        while let Some((path, link)) = walk.next().await? {
            if link.is_dir() {
                continue;
            }
            refs.push(self.get(&path).await?);
        }

        Ok(refs)
    }

    /// Remove a ref. Removing an absent ref succeeds.
    pub async fn remove(&self, name: &str) -> Result<(), StorageError> {
        self.fs.remove(name).await?;
        Ok(())
    }

    pub async fn count_loose(&self) -> Result<usize, StorageError> {
        Ok(self.list().await?.len())
    }

    /// Packing refs is meaningless here: the substrate has no loose/packed
    /// distinction, so this deliberately does nothing.
    pub fn pack_refs(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::blocks::BlockStore;
    use crate::git::ObjectId;

    async fn setup() -> ReferenceStorage {
        let blocks = BlockStore::memory();
        let fs = Mount::init(&blocks).await.unwrap();
        fs.mkdir(REFS_PATH).await.unwrap();
        ReferenceStorage::new(fs)
    }

    fn id(byte: u8) -> ObjectId {
        ObjectId::from_bytes([byte; 20])
    }

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let refs = setup().await;
        let main = Reference::new_hash("refs/heads/main", id(1));

        refs.set(&main).await.unwrap();
        assert_eq!(refs.get("refs/heads/main").await.unwrap(), main);
    }

    #[tokio::test]
    async fn test_check_and_set_without_old_sets() {
        let refs = setup().await;
        let main = Reference::new_hash("refs/heads/main", id(1));
        refs.check_and_set(&main, None).await.unwrap();
        assert_eq!(refs.get("refs/heads/main").await.unwrap(), main);
    }

    #[tokio::test]
    async fn test_check_and_set_conflict_leaves_value() {
        let refs = setup().await;
        let stored = Reference::new_hash("refs/heads/main", id(1));
        refs.set(&stored).await.unwrap();

        let stale = Reference::new_hash("refs/heads/main", id(2));
        let update = Reference::new_hash("refs/heads/main", id(3));
        let err = refs.check_and_set(&update, Some(&stale)).await.unwrap_err();
        assert!(matches!(err, StorageError::ReferenceChanged));

        // the stored value is unchanged
        assert_eq!(refs.get("refs/heads/main").await.unwrap(), stored);
    }

    #[tokio::test]
    async fn test_check_and_set_absent_ref_is_conflict() {
        let refs = setup().await;
        let old = Reference::new_hash("refs/heads/gone", id(1));
        let new = Reference::new_hash("refs/heads/gone", id(2));
        assert!(matches!(
            refs.check_and_set(&new, Some(&old)).await,
            Err(StorageError::ReferenceChanged)
        ));
    }

    #[tokio::test]
    async fn test_list_head_first() {
        let refs = setup().await;
        refs.set(&Reference::new_symbolic(HEAD, "refs/heads/main"))
            .await
            .unwrap();
        refs.set(&Reference::new_hash("refs/heads/main", id(1)))
            .await
            .unwrap();
        refs.set(&Reference::new_hash("refs/tags/v1", id(2)))
            .await
            .unwrap();

        let listed = refs.list().await.unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].name(), HEAD);
        assert_eq!(refs.count_loose().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_remove_idempotent() {
        let refs = setup().await;
        refs.set(&Reference::new_hash("refs/heads/dev", id(1)))
            .await
            .unwrap();

        refs.remove("refs/heads/dev").await.unwrap();
        refs.remove("refs/heads/dev").await.unwrap();
        assert!(matches!(
            refs.get("refs/heads/dev").await,
            Err(StorageError::ReferenceNotFound(_))
        ));
    }
}
