use super::object::{GitError, ObjectId};

/// Name of the symbolic head reference.
pub const HEAD: &str = "HEAD";

/// A named reference: either a direct hash or a symbolic pointer at
/// another reference. Refs are the only mutable entity in the repository
/// model, which is why the store guards them with compare-and-swap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reference {
    Hash { name: String, target: ObjectId },
    Symbolic { name: String, target: String },
}

impl Reference {
    pub fn new_hash(name: impl Into<String>, target: ObjectId) -> Self {
        Reference::Hash {
            name: name.into(),
            target,
        }
    }

    pub fn new_symbolic(name: impl Into<String>, target: impl Into<String>) -> Self {
        Reference::Symbolic {
            name: name.into(),
            target: target.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Reference::Hash { name, .. } => name,
            Reference::Symbolic { name, .. } => name,
        }
    }

    /// The hash target, if this is a direct ref.
    pub fn hash(&self) -> Option<ObjectId> {
        match self {
            Reference::Hash { target, .. } => Some(*target),
            Reference::Symbolic { .. } => None,
        }
    }

    /// The symbolic target, if this is a symbolic ref.
    pub fn symbolic_target(&self) -> Option<&str> {
        match self {
            Reference::Hash { .. } => None,
            Reference::Symbolic { target, .. } => Some(target),
        }
    }

    /// Stored file form: the hex hash, or `ref: <target>`.
    pub fn encode(&self) -> String {
        match self {
            Reference::Hash { target, .. } => target.to_string(),
            Reference::Symbolic { target, .. } => format!("ref: {}", target),
        }
    }

    /// Parse the stored file form back into a reference named `name`.
    pub fn decode(name: &str, content: &str) -> Result<Reference, GitError> {
        let content = content.trim_end();
        if let Some(target) = content.strip_prefix("ref: ") {
            Ok(Reference::new_symbolic(name, target))
        } else {
            Ok(Reference::new_hash(name, content.parse()?))
        }
    }
}
