use crate::blocks::{BlockStore, BlockStoreError};
use crate::git::{Object, Reference};
use crate::linked_data::Link;
use crate::mount::Mount;
use crate::storage::{Storage, StorageError};

use super::closure::minimal_closure;
use super::messages::{
    encode_advertisement, ReceivePackRequest, RefResult, RefUpdate, ReportStatus, Service,
    UploadPackRequest,
};
use super::pack::{PackError, PackReader, PackWriter};
use super::pktline::{PktEncoder, WireError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("repository not found")]
    RepositoryNotFound,
    #[error("unknown service: {0:?}")]
    UnknownService(String),
    #[error("wire error: {0}")]
    Wire(#[from] WireError),
    #[error("pack error: {0}")]
    Pack(#[from] PackError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("block store error: {0}")]
    Blocks(#[from] BlockStoreError),
}

/// Resolves a repository's content identifier to a [`Storage`].
///
/// The identifier travels in the request path; a bad identifier or a
/// missing root node both read as "repository not found". Where the
/// identifier comes from and where a new one goes after a push is the
/// surrounding catalog's business, not ours.
#[derive(Clone)]
pub struct Loader {
    blocks: BlockStore,
}

impl Loader {
    pub fn new(blocks: BlockStore) -> Self {
        Loader { blocks }
    }

    pub fn blocks(&self) -> &BlockStore {
        &self.blocks
    }

    pub async fn load(&self, id: &str) -> Result<Storage, SessionError> {
        let link: Link = id.parse().map_err(|_| SessionError::RepositoryNotFound)?;
        let mount = Mount::load(&link, &self.blocks)
            .await
            .map_err(|_| SessionError::RepositoryNotFound)?;
        Ok(Storage::open(mount))
    }
}

/// Outcome of a receive-pack: the report-status body for the client and
/// the repository's new root link for the catalog layer to record.
#[derive(Debug)]
pub struct ReceivePackOutcome {
    pub report: Vec<u8>,
    pub root: Link,
}

/// One protocol exchange against one repository.
///
/// Sessions hold no cross-request state: everything is loaded fresh from
/// the root link the request named, and everything a push produces is
/// reported back out through [`ReceivePackOutcome`].
pub struct Session {
    blocks: BlockStore,
    storage: Storage,
}

impl Session {
    pub fn new(storage: Storage) -> Self {
        Session {
            blocks: storage.mount().blocks(),
            storage,
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// The reference advertisement for a service.
    pub async fn advertised_refs(&self, service: Service) -> Result<Vec<u8>, SessionError> {
        let mut advertised = Vec::new();
        for reference in self.storage.refs().list().await? {
            match reference {
                Reference::Hash { name, target } => advertised.push((name, target)),
                Reference::Symbolic { name, target } => {
                    // advertise resolved symbolic refs; an unresolvable one
                    // (fresh repository) is simply not advertised
                    match self.storage.refs().get(&target).await {
                        Ok(resolved) => {
                            if let Some(id) = resolved.hash() {
                                advertised.push((name, id));
                            }
                        }
                        Err(StorageError::ReferenceNotFound(_)) => {}
                        Err(err) => return Err(err.into()),
                    }
                }
            }
        }
        tracing::debug!(
            service = service.name(),
            refs = advertised.len(),
            "advertising refs"
        );
        Ok(encode_advertisement(service, &advertised))
    }

    /// Serve a fetch: decode wants/haves, compute the minimal closure,
    /// answer with a pack-bearing response. Read-only, so no locking.
    pub async fn upload_pack(&self, body: &[u8]) -> Result<Vec<u8>, SessionError> {
        let request = UploadPackRequest::decode(body)?;
        let objects =
            minimal_closure(self.storage.objects(), &request.wants, &request.haves).await?;

        let mut pack = PackWriter::new();
        for object in &objects {
            pack.add_object(object);
        }
        tracing::debug!(objects = objects.len(), "upload-pack closure computed");

        let mut response = PktEncoder::new();
        response.write("NAK\n");
        response.write_raw(&pack.finish()?);
        Ok(response.into_bytes())
    }

    /// Apply a push: unpack objects, apply each ref command, flush the
    /// tree to a new root and pin it.
    ///
    /// The collector gate is held for the whole operation so a concurrent
    /// sweep cannot reclaim blocks written but not yet pinned; the guard
    /// drops on every exit path. A ref losing its compare-and-swap is
    /// reported in the per-ref results and does not abort its siblings;
    /// everything else aborts the request, leaving only unpinned garbage
    /// behind for the sweeper.
    pub async fn receive_pack(&self, body: &[u8]) -> Result<ReceivePackOutcome, SessionError> {
        let _gate = self.blocks.pin_lock().await;

        let request = ReceivePackRequest::decode(body)?;
        let entries = PackReader::parse(&request.pack)?;

        // objects land before any ref can point at them
        for (kind, data) in entries {
            self.storage.objects().put(&Object::new(kind, data)).await?;
        }

        let mut report = ReportStatus::default();
        for update in &request.updates {
            let error = match self.apply_update(update).await {
                Ok(()) => None,
                Err(err @ StorageError::ReferenceChanged) => Some(err.to_string()),
                Err(err) => return Err(err.into()),
            };
            report.results.push(RefResult {
                name: update.name.clone(),
                error,
            });
        }

        // the flush happens strictly after all ref updates, so the link we
        // hand back names a self-consistent tree
        let root = self.storage.flush().await?;
        self.blocks.pin(&root, true).await?;
        tracing::info!(root = %root, "receive-pack committed");

        Ok(ReceivePackOutcome {
            report: report.encode(),
            root,
        })
    }

    async fn apply_update(&self, update: &RefUpdate) -> Result<(), StorageError> {
        if update.new.is_zero() {
            return self.storage.refs().remove(&update.name).await;
        }
        let new = Reference::new_hash(&update.name, update.new);
        let old = if update.old.is_zero() {
            None
        } else {
            Some(Reference::new_hash(&update.name, update.old))
        };
        self.storage.refs().check_and_set(&new, old.as_ref()).await
    }
}
