//! The git object model, as far as storage and transport need it.
//!
//! Objects are content-addressed by the SHA-1 of `"<kind> <len>\0"` plus
//! the payload, exactly as git computes them, so ids pushed by a client
//! and ids computed here always agree. Parsing goes only as deep as
//! closure computation requires: commits yield their tree and parents,
//! trees yield their entries, tags yield the object they peel to.

mod object;
mod parse;
mod reference;

pub use object::{GitError, Object, ObjectId, ObjectKind};
pub use parse::{commit_links, tag_target, tree_entries, TreeEntry};
pub use reference::{Reference, HEAD};
