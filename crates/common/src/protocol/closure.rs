//! Object selection for a fetch: the minimal closure of the client's
//! wants, cut off at everything already reachable from its haves.

use std::collections::HashSet;

use crate::git::{commit_links, tag_target, tree_entries, Object, ObjectId, ObjectKind};
use crate::storage::{ObjectStorage, StorageError};

/// Compute the objects a pack for `wants` must carry.
///
/// Commits walk their parents, trees their entries, tags peel to their
/// target; gitlink entries point outside this repository and are never
/// followed. A missing want is an error; anything else missing along the
/// way (shallow history, vanished objects) is skipped.
pub(crate) async fn minimal_closure(
    objects: &ObjectStorage,
    wants: &[ObjectId],
    haves: &[ObjectId],
) -> Result<Vec<Object>, StorageError> {
    let mut excluded = HashSet::new();
    for have in haves {
        mark_reachable(objects, *have, &mut excluded).await?;
    }

    let want_set: HashSet<ObjectId> = wants.iter().copied().collect();
    let mut included = HashSet::new();
    let mut out = Vec::new();
    let mut stack: Vec<ObjectId> = wants.to_vec();

    while let Some(id) = stack.pop() {
        if included.contains(&id) || excluded.contains(&id) {
            continue;
        }
        let object = match objects.get(&id, None).await {
            Ok(object) => object,
            Err(StorageError::ObjectNotFound(_)) if !want_set.contains(&id) => continue,
            Err(err) => return Err(err),
        };

        push_links(&object, &mut stack)?;
        included.insert(id);
        out.push(object);
    }

    Ok(out)
}

/// Mark everything reachable from `id` as already held. Missing objects
/// are fine here: the client can have history we never saw.
async fn mark_reachable(
    objects: &ObjectStorage,
    id: ObjectId,
    seen: &mut HashSet<ObjectId>,
) -> Result<(), StorageError> {
    let mut stack = vec![id];
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        let object = match objects.get(&id, None).await {
            Ok(object) => object,
            Err(StorageError::ObjectNotFound(_)) => continue,
            Err(err) => return Err(err),
        };
        push_links(&object, &mut stack)?;
    }
    Ok(())
}

fn push_links(object: &Object, stack: &mut Vec<ObjectId>) -> Result<(), StorageError> {
    match object.kind() {
        ObjectKind::Commit => {
            let (tree, parents) = commit_links(object.data())?;
            stack.push(tree);
            stack.extend(parents);
        }
        ObjectKind::Tree => {
            for entry in tree_entries(object.data())? {
                if !entry.is_gitlink() {
                    stack.push(entry.id);
                }
            }
        }
        ObjectKind::Tag => {
            stack.push(tag_target(object.data())?);
        }
        ObjectKind::Blob => {}
        kind => return Err(StorageError::UnsupportedObjectType(kind)),
    }
    Ok(())
}
