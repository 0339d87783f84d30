//! The smart-HTTP synchronization protocol against a
//! [`Storage`](crate::storage::Storage).
//!
//! Three terminal operations per request, no state carried between them:
//! reference advertisement, upload-pack (fetch), receive-pack (push).
//! [`Loader`] resolves the repository identifier a request names;
//! [`Session`] runs the operation; a push reports the repository's new
//! root link back out for the caller to record.

mod closure;
mod messages;
mod pack;
mod pktline;
mod session;

pub use messages::{
    decode_advertisement, encode_advertisement, ReceivePackRequest, RefResult, RefUpdate,
    ReportStatus, Service, UploadPackRequest,
};
pub use pack::{PackError, PackReader, PackWriter, PACK_MAGIC, PACK_VERSION};
pub use pktline::{Pkt, PktEncoder, PktScanner, WireError, MAX_PKT_PAYLOAD};
pub use session::{Loader, ReceivePackOutcome, Session, SessionError};
