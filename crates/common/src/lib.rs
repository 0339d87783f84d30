/**
 * Internal wrapper around IPLD, renamed to
 *  something a little more down-to-earth.
 * Handles CIDs, links, and dag-cbor codecs
 *  for linked data.
 */
pub mod linked_data;
/**
 * Content-addressed block store.
 *  The immutable substrate everything else is
 *  built on: blocks go in, links come out, and
 *  pins keep the sweeper away from live data.
 */
pub mod blocks;
/**
 * Mutable-filesystem view over immutable blocks.
 * Represents the contents of a repository at a
 *  given version; every mutation rebuilds the
 *  path up to a brand-new root link.
 */
pub mod mount;
/**
 * The git object model: object ids, kinds,
 *  header framing, refs, and just enough
 *  commit/tree/tag parsing to walk closures.
 */
pub mod git;
/**
 * Storage adapter mapping every git storage
 *  concern (objects, refs, config, index,
 *  shallow, submodules) onto a mount.
 */
pub mod storage;
/**
 * Smart-HTTP protocol session: pktline framing,
 *  pack transport, reference advertisement,
 *  upload-pack and receive-pack.
 */
pub mod protocol;

pub mod prelude {
    pub use crate::blocks::{BlockStore, BlockStoreError};
    pub use crate::git::{ObjectId, ObjectKind, Reference};
    pub use crate::linked_data::{Cid, CidError, Hash, Link};
    pub use crate::mount::{Mount, MountError};
    pub use crate::protocol::{Loader, Service, Session, SessionError};
    pub use crate::storage::Storage;
}
