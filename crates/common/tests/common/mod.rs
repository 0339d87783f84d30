//! Shared test utilities for storage and protocol integration tests
#![allow(dead_code)]

use common::blocks::BlockStore;
use common::git::{Object, ObjectId, ObjectKind};
use common::protocol::{PackWriter, ReceivePackRequest, RefUpdate};
use common::storage::Storage;

/// Set up a block store with a fresh empty repository.
pub async fn setup_repo() -> (BlockStore, Storage) {
    let blocks = BlockStore::memory();
    let storage = Storage::init(&blocks).await.unwrap();
    (blocks, storage)
}

pub fn blob(data: &[u8]) -> Object {
    Object::new(ObjectKind::Blob, data.to_vec())
}

/// A single-entry tree pointing a name at a blob.
pub fn tree(name: &str, blob_id: ObjectId) -> Object {
    let mut payload = Vec::new();
    payload.extend_from_slice(format!("100644 {}\0", name).as_bytes());
    payload.extend_from_slice(blob_id.as_bytes());
    Object::new(ObjectKind::Tree, payload)
}

pub fn commit(tree_id: ObjectId, parents: &[ObjectId], message: &str) -> Object {
    let mut payload = format!("tree {}\n", tree_id);
    for parent in parents {
        payload.push_str(&format!("parent {}\n", parent));
    }
    payload.push_str("author t <t@example.com> 0 +0000\n");
    payload.push_str("committer t <t@example.com> 0 +0000\n");
    payload.push('\n');
    payload.push_str(message);
    payload.push('\n');
    Object::new(ObjectKind::Commit, payload.into_bytes())
}

/// Blob + tree + commit for one file, returning the objects and the
/// commit id.
pub fn single_file_commit(
    name: &str,
    content: &[u8],
    parents: &[ObjectId],
) -> (Vec<Object>, ObjectId) {
    let b = blob(content);
    let t = tree(name, b.id());
    let c = commit(t.id(), parents, "test commit");
    let id = c.id();
    (vec![b, t, c], id)
}

/// Encode a push body: one update command plus a pack with the given
/// objects.
pub fn push_body(name: &str, old: ObjectId, new: ObjectId, objects: &[Object]) -> Vec<u8> {
    let mut pack = PackWriter::new();
    for object in objects {
        pack.add_object(object);
    }
    ReceivePackRequest {
        updates: vec![RefUpdate {
            old,
            new,
            name: name.to_string(),
        }],
        pack: pack.finish().unwrap(),
    }
    .encode()
}
