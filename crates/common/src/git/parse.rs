//! Payload parsers for closure traversal.
//!
//! These stop at exactly what a pack negotiation needs: which objects an
//! object points at. Everything else in the payloads (authors, messages,
//! file modes beyond the directory/gitlink distinction) passes through
//! untouched.

use super::object::{GitError, ObjectId};

const GITLINK_MODE: u32 = 0o160000;
const TREE_MODE: u32 = 0o40000;

/// Tree and parent ids out of a commit payload.
pub fn commit_links(data: &[u8]) -> Result<(ObjectId, Vec<ObjectId>), GitError> {
    let mut tree = None;
    let mut parents = Vec::new();

    // headers end at the first blank line; the message after it may not
    // be utf-8 and is never parsed
    for line in data.split(|&b| b == b'\n') {
        if line.is_empty() {
            break;
        }
        let line = std::str::from_utf8(line)
            .map_err(|_| GitError::Corrupt("commit header is not utf-8".to_string()))?;
        if let Some(hex) = line.strip_prefix("tree ") {
            tree = Some(hex.parse()?);
        } else if let Some(hex) = line.strip_prefix("parent ") {
            parents.push(hex.parse()?);
        }
    }

    let tree = tree.ok_or_else(|| GitError::Corrupt("commit has no tree".to_string()))?;
    Ok((tree, parents))
}

/// One entry of a tree payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: u32,
    pub name: String,
    pub id: ObjectId,
}

impl TreeEntry {
    pub fn is_tree(&self) -> bool {
        self.mode == TREE_MODE
    }

    /// Gitlink entries point at commits in other repositories; closure
    /// traversal must not follow them.
    pub fn is_gitlink(&self) -> bool {
        self.mode == GITLINK_MODE
    }
}

/// Entries of a tree payload: `<octal mode> <name>\0<20-byte id>`, repeated.
pub fn tree_entries(data: &[u8]) -> Result<Vec<TreeEntry>, GitError> {
    let mut entries = Vec::new();
    let mut rest = data;

    while !rest.is_empty() {
        let space = rest
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| GitError::Corrupt("tree entry missing mode".to_string()))?;
        let mode = std::str::from_utf8(&rest[..space])
            .ok()
            .and_then(|s| u32::from_str_radix(s, 8).ok())
            .ok_or_else(|| GitError::Corrupt("tree entry has bad mode".to_string()))?;
        rest = &rest[space + 1..];

        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| GitError::Corrupt("tree entry missing name terminator".to_string()))?;
        let name = std::str::from_utf8(&rest[..nul])
            .map_err(|_| GitError::Corrupt("tree entry name is not utf-8".to_string()))?
            .to_string();
        rest = &rest[nul + 1..];

        if rest.len() < 20 {
            return Err(GitError::Corrupt("tree entry truncated id".to_string()));
        }
        let id = ObjectId::from_slice(&rest[..20])?;
        rest = &rest[20..];

        entries.push(TreeEntry { mode, name, id });
    }

    Ok(entries)
}

/// The object a tag payload points at.
pub fn tag_target(data: &[u8]) -> Result<ObjectId, GitError> {
    for line in data.split(|&b| b == b'\n') {
        if line.is_empty() {
            break;
        }
        if let Ok(line) = std::str::from_utf8(line) {
            if let Some(hex) = line.strip_prefix("object ") {
                return hex.parse();
            }
        }
    }
    Err(GitError::Corrupt("tag has no object".to_string()))
}

#[cfg(test)]
mod test {
    use super::*;

    const ID_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const ID_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    #[test]
    fn test_commit_links() {
        let payload = format!(
            "tree {}\nparent {}\nauthor a <a@b> 0 +0000\n\nmessage\n",
            ID_A, ID_B
        );
        let (tree, parents) = commit_links(payload.as_bytes()).unwrap();
        assert_eq!(tree.to_string(), ID_A);
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].to_string(), ID_B);
    }

    #[test]
    fn test_commit_without_tree_is_corrupt() {
        assert!(commit_links(b"author a <a@b> 0 +0000\n\nhi\n").is_err());
    }

    #[test]
    fn test_tree_entries() {
        let id: ObjectId = ID_A.parse().unwrap();
        let mut payload = Vec::new();
        payload.extend_from_slice(b"100644 file.txt\0");
        payload.extend_from_slice(id.as_bytes());
        payload.extend_from_slice(b"40000 sub\0");
        payload.extend_from_slice(id.as_bytes());
        payload.extend_from_slice(b"160000 vendored\0");
        payload.extend_from_slice(id.as_bytes());

        let entries = tree_entries(&payload).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(!entries[0].is_tree());
        assert!(entries[1].is_tree());
        assert!(entries[2].is_gitlink());
        assert_eq!(entries[0].name, "file.txt");
    }

    #[test]
    fn test_tag_target() {
        let payload = format!("object {}\ntype commit\ntag v1\n\nnotes\n", ID_A);
        assert_eq!(tag_target(payload.as_bytes()).unwrap().to_string(), ID_A);
    }
}
