use crate::git::{Object, ObjectId, ObjectKind};
use crate::mount::{Mount, MountError, Walk};

use super::{StorageError, INFO_PATH, OBJECTS_PATH};

/// Object id to tree path: two-level fan-out, `objects/<aa>/<rest>`,
/// keeping any one directory node from growing with the repository.
fn object_path(id: &ObjectId) -> String {
    let hex = id.to_string();
    format!("{}/{}/{}", OBJECTS_PATH, &hex[..2], &hex[2..])
}

/// Object storage over a mount.
///
/// Objects are stored fully materialized, header-framed, one file per id.
/// The two delta representations are rejected up front: the substrate has
/// no notion of "apply this against a base", so deltas must be resolved
/// before they get here.
#[derive(Clone)]
pub struct ObjectStorage {
    fs: Mount,
}

impl ObjectStorage {
    pub fn new(fs: Mount) -> Self {
        ObjectStorage { fs }
    }

    /// Store an object, returning its id.
    pub async fn put(&self, object: &Object) -> Result<ObjectId, StorageError> {
        if object.kind().is_delta() {
            return Err(StorageError::UnsupportedObjectType(object.kind()));
        }
        let id = object.id();
        self.fs.write(&object_path(&id), &object.encode()).await?;
        Ok(id)
    }

    /// Whether an object exists.
    pub async fn has(&self, id: &ObjectId) -> Result<bool, StorageError> {
        match self.fs.find(&object_path(id)).await {
            Ok(_) => Ok(true),
            Err(MountError::PathNotFound(_)) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Payload length of a stored object.
    pub async fn size(&self, id: &ObjectId) -> Result<u64, StorageError> {
        Ok(self.read(id).await?.size())
    }

    /// Get an object by id, optionally requiring a kind. A kind mismatch
    /// reads as absence, matching how callers probe for "a commit with
    /// this id".
    pub async fn get(
        &self,
        id: &ObjectId,
        kind: Option<ObjectKind>,
    ) -> Result<Object, StorageError> {
        let object = self.read(id).await?;
        if let Some(kind) = kind {
            if object.kind() != kind {
                return Err(StorageError::ObjectNotFound(*id));
            }
        }
        Ok(object)
    }

    /// Lazy cursor over every stored object id.
    pub async fn ids(&self) -> Result<ObjectIds, StorageError> {
        Ok(ObjectIds {
            walk: self.fs.walk(OBJECTS_PATH).await?,
        })
    }

    /// Lazy cursor over stored objects of one kind (or all of them).
    ///
    /// Ids whose object has vanished between listing and read are skipped,
    /// not surfaced as errors.
    pub async fn iter(&self, kind: Option<ObjectKind>) -> Result<ObjectIter, StorageError> {
        Ok(ObjectIter {
            store: self.clone(),
            kind,
            ids: self.ids().await?,
        })
    }

    async fn read(&self, id: &ObjectId) -> Result<Object, StorageError> {
        let bytes = match self.fs.read(&object_path(id)).await {
            Ok(bytes) => bytes,
            Err(MountError::PathNotFound(_)) => return Err(StorageError::ObjectNotFound(*id)),
            Err(err) => return Err(err.into()),
        };
        Ok(Object::decode(&bytes)?)
    }
}

/// Cursor over stored object ids, reconstructed from the two fan-out path
/// segments. The side-channel `info/` directory is skipped.
pub struct ObjectIds {
    walk: Walk,
}

impl ObjectIds {
    pub async fn next(&mut self) -> Result<Option<ObjectId>, StorageError> {
        while let Some((path, link)) = self.walk.next().await? {
            if link.is_dir() {
                continue;
            }
            let mut parts = path.split('/');
            let (_, prefix, rest) = (parts.next(), parts.next(), parts.next());
            let (Some(prefix), Some(rest)) = (prefix, rest) else {
                continue;
            };
            if prefix == INFO_PATH {
                continue;
            }
            if let Ok(id) = format!("{}{}", prefix, rest).parse() {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }
}

/// Cursor over stored objects, re-reading each id as it is pulled.
pub struct ObjectIter {
    store: ObjectStorage,
    kind: Option<ObjectKind>,
    ids: ObjectIds,
}

impl ObjectIter {
    pub async fn next(&mut self) -> Result<Option<Object>, StorageError> {
        while let Some(id) = self.ids.next().await? {
            match self.store.get(&id, self.kind).await {
                Ok(object) => return Ok(Some(object)),
                // vanished or of another kind; holes are tolerated
                Err(StorageError::ObjectNotFound(_)) => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(None)
    }
}
