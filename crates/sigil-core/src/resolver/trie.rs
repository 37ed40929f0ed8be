//! Prefix trie over concept sequences.
//!
//! Nodes live in a dense `Vec` and refer to each other by index handle; the
//! root is always handle 0. Children are kept in a `BTreeMap` so traversal
//! order is deterministic.

use std::collections::BTreeMap;

use crate::symbol::Concept;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeHandle(usize);

const ROOT: NodeHandle = NodeHandle(0);

#[derive(Debug, Clone, Default)]
struct TrieNode {
    children: BTreeMap<Concept, NodeHandle>,
    /// Index of the combo terminating here, in registration order.
    combo: Option<usize>,
}

/// Trie keyed on concept sequences, terminal nodes carry combo indices.
#[derive(Debug, Clone)]
pub(crate) struct ComboTrie {
    nodes: Vec<TrieNode>,
}

impl ComboTrie {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
        }
    }

    /// Inserts a sequence. If the sequence is already terminal the earlier
    /// combo is kept and its index returned as `Err`.
    pub(crate) fn insert(&mut self, concepts: &[Concept], combo: usize) -> Result<(), usize> {
        let mut node = ROOT;
        for &concept in concepts {
            node = match self.nodes[node.0].children.get(&concept) {
                Some(&child) => child,
                None => {
                    let child = NodeHandle(self.nodes.len());
                    self.nodes.push(TrieNode::default());
                    self.nodes[node.0].children.insert(concept, child);
                    child
                }
            };
        }
        match self.nodes[node.0].combo {
            Some(existing) => Err(existing),
            None => {
                self.nodes[node.0].combo = Some(combo);
                Ok(())
            }
        }
    }

    fn walk(&self, concepts: &[Concept]) -> Option<&TrieNode> {
        let mut node = ROOT;
        for concept in concepts {
            node = *self.nodes[node.0].children.get(concept)?;
        }
        Some(&self.nodes[node.0])
    }

    /// Combo registered for exactly this sequence.
    pub(crate) fn exact(&self, concepts: &[Concept]) -> Option<usize> {
        self.walk(concepts).and_then(|node| node.combo)
    }

    /// Returns true if some registered combo strictly extends this sequence.
    pub(crate) fn has_extension(&self, concepts: &[Concept]) -> bool {
        self.walk(concepts)
            .is_some_and(|node| !node.children.is_empty())
    }

    /// Longest registered prefix of `concepts`, as `(length, combo)`.
    pub(crate) fn longest_match(&self, concepts: &[Concept]) -> Option<(usize, usize)> {
        let mut node = ROOT;
        let mut best = self.nodes[ROOT.0].combo.map(|combo| (0, combo));
        for (depth, concept) in concepts.iter().enumerate() {
            let Some(&child) = self.nodes[node.0].children.get(concept) else {
                break;
            };
            node = child;
            if let Some(combo) = self.nodes[node.0].combo {
                best = Some((depth + 1, combo));
            }
        }
        best
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Concept::{Bloom, Flame, Gale, Stone};

    #[test]
    fn exact_lookup() {
        let mut trie = ComboTrie::new();
        trie.insert(&[Flame, Gale], 0).unwrap();
        trie.insert(&[Flame, Stone], 1).unwrap();
        assert_eq!(trie.exact(&[Flame, Gale]), Some(0));
        assert_eq!(trie.exact(&[Flame, Stone]), Some(1));
        assert_eq!(trie.exact(&[Flame]), None);
        assert_eq!(trie.exact(&[Gale, Flame]), None);
    }

    #[test]
    fn shared_prefixes_share_nodes() {
        let mut trie = ComboTrie::new();
        trie.insert(&[Flame, Gale], 0).unwrap();
        trie.insert(&[Flame, Stone], 1).unwrap();
        // root + Flame + Gale + Stone
        assert_eq!(trie.node_count(), 4);
    }

    #[test]
    fn duplicate_keeps_earliest() {
        let mut trie = ComboTrie::new();
        trie.insert(&[Bloom, Bloom], 0).unwrap();
        assert_eq!(trie.insert(&[Bloom, Bloom], 3), Err(0));
        assert_eq!(trie.exact(&[Bloom, Bloom]), Some(0));
    }

    #[test]
    fn extension_detection() {
        let mut trie = ComboTrie::new();
        trie.insert(&[Flame, Gale], 0).unwrap();
        trie.insert(&[Flame, Gale, Stone], 1).unwrap();
        assert!(trie.has_extension(&[Flame]));
        assert!(trie.has_extension(&[Flame, Gale]));
        assert!(!trie.has_extension(&[Flame, Gale, Stone]));
        assert!(!trie.has_extension(&[Stone]));
    }

    #[test]
    fn longest_match_prefers_deepest_terminal() {
        let mut trie = ComboTrie::new();
        trie.insert(&[Flame, Gale], 0).unwrap();
        trie.insert(&[Flame, Gale, Stone], 1).unwrap();
        assert_eq!(trie.longest_match(&[Flame, Gale, Bloom]), Some((2, 0)));
        assert_eq!(trie.longest_match(&[Flame, Gale, Stone, Bloom]), Some((3, 1)));
        assert_eq!(trie.longest_match(&[Flame, Bloom]), None);
        assert_eq!(trie.longest_match(&[]), None);
    }
}
