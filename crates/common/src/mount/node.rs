use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::linked_data::{BlockEncoded, DagCborCodec, Link};

/**
 * Nodes
 * =====
 * Nodes are the building blocks of a repository's file structure.
 * A node is just a description of links to other blocks, which fall
 *  into two categories:
 *  - Data links: links to terminal raw blocks, i.e. actual files
 *  - Dir links: links to other nodes, i.e. directories
 * Nodes are always dag-cbor encoded.
 */

/// A link from a directory node to one of its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeLink {
    Data { link: Link, size: u64 },
    Dir { link: Link },
}

impl NodeLink {
    pub fn new_data(link: Link, size: u64) -> Self {
        NodeLink::Data { link, size }
    }

    pub fn new_dir(link: Link) -> Self {
        NodeLink::Dir { link }
    }

    pub fn link(&self) -> &Link {
        match self {
            NodeLink::Data { link, .. } => link,
            NodeLink::Dir { link } => link,
        }
    }

    /// Byte length of the file a data link points at; zero for directories.
    pub fn size(&self) -> u64 {
        match self {
            NodeLink::Data { size, .. } => *size,
            NodeLink::Dir { .. } => 0,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, NodeLink::Dir { .. })
    }

    pub fn is_data(&self) -> bool {
        matches!(self, NodeLink::Data { .. })
    }
}

// A node is a map of names to links. When traversing the DAG, path names
//  are just /-joined names of links in nodes. The map is ordered, which is
//  what makes rebuilt trees deterministic: the same content always encodes
//  to the same block, and so to the same link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Node {
    links: BTreeMap<String, NodeLink>,
}

impl BlockEncoded<DagCborCodec> for Node {}

impl Node {
    pub fn new() -> Self {
        Node {
            links: BTreeMap::new(),
        }
    }

    pub fn get_link(&self, name: &str) -> Option<&NodeLink> {
        self.links.get(name)
    }

    pub fn insert(&mut self, name: String, link: NodeLink) -> Option<NodeLink> {
        self.links.insert(name, link)
    }

    pub fn del(&mut self, name: &str) -> Option<NodeLink> {
        self.links.remove(name)
    }

    pub fn links(&self) -> &BTreeMap<String, NodeLink> {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_node_encode_decode() {
        let mut node = Node::default();
        node.insert(
            "example".to_string(),
            NodeLink::new_data(Link::default(), 42),
        );

        let encoded = node.encode().unwrap();
        let decoded = Node::decode(&encoded).unwrap();

        assert_eq!(node, decoded);
    }

    #[test]
    fn test_node_encoding_deterministic() {
        let mut a = Node::default();
        a.insert("b".to_string(), NodeLink::new_dir(Link::default()));
        a.insert("a".to_string(), NodeLink::new_data(Link::default(), 1));

        let mut b = Node::default();
        b.insert("a".to_string(), NodeLink::new_data(Link::default(), 1));
        b.insert("b".to_string(), NodeLink::new_dir(Link::default()));

        assert_eq!(a.encode().unwrap(), b.encode().unwrap());
    }
}
