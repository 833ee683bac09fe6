//! Huffman tree construction and code derivation.
//!
//! # Tree building
//!
//! Nodes sit in a min-heap ordered by `(frequency, sequence)`. Leaves get
//! sequence numbers `0..n` in ascending byte order; every merged node takes
//! the next number. Equal frequencies therefore resolve first-inserted
//! first, and a freshly merged node queues behind existing nodes of the same
//! frequency. The two lowest nodes are popped, the first becoming the left
//! child, until one root remains.
//!
//! # Code derivation
//!
//! A depth-first walk (explicit stack, left before right) records the path to
//! each leaf: 0 for left, 1 for right. The i-th step of the path is stored
//! in bit i of the code, so the first bit the encoder emits is bit 0. This
//! matches the LSB-first payload order and lets the decoder compare its
//! accumulator against recorded codes without reversing bits.
//!
//! A table with a single symbol yields a root that is itself a leaf. That
//! symbol is given the one-bit code `0` so every symbol occupies at least
//! one payload bit.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::{HuffmanError, Result};
use crate::scan::FrequencyTable;
use crate::table::{CodeEntry, EncodeTable};

/// Longest path a u64 code can hold.
const MAX_DEPTH: u32 = u64::BITS;

/// A node of the transient Huffman tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Leaf {
        byte: u8,
        frequency: u64,
    },
    Internal {
        frequency: u64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    pub fn frequency(&self) -> u64 {
        match self {
            TreeNode::Leaf { frequency, .. } => *frequency,
            TreeNode::Internal { frequency, .. } => *frequency,
        }
    }

    /// Join two nodes under a new parent; `left` is the node popped first.
    fn merge(left: TreeNode, right: TreeNode) -> TreeNode {
        TreeNode::Internal {
            frequency: left.frequency() + right.frequency(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

/// Heap entry carrying the tie-break sequence.
#[derive(Debug)]
struct QueuedNode {
    sequence: u64,
    node: TreeNode,
}

impl QueuedNode {
    fn key(&self) -> (u64, u64) {
        (self.node.frequency(), self.sequence)
    }
}

impl PartialEq for QueuedNode {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for QueuedNode {}

impl PartialOrd for QueuedNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (lowest frequency, then oldest, first)
        other.key().cmp(&self.key())
    }
}

/// Build the Huffman tree for `frequencies`.
///
/// # Errors
/// Returns `HuffmanError::EmptyFrequencyTable` if no byte was observed.
pub fn build_tree(frequencies: &FrequencyTable) -> Result<TreeNode> {
    let mut heap: BinaryHeap<QueuedNode> = frequencies
        .iter()
        .enumerate()
        .map(|(sequence, (byte, frequency))| QueuedNode {
            sequence: sequence as u64,
            node: TreeNode::Leaf { byte, frequency },
        })
        .collect();
    let mut next_sequence = heap.len() as u64;

    loop {
        let first = heap.pop().ok_or(HuffmanError::EmptyFrequencyTable)?;
        let Some(second) = heap.pop() else {
            return Ok(first.node);
        };

        heap.push(QueuedNode {
            sequence: next_sequence,
            node: TreeNode::merge(first.node, second.node),
        });
        next_sequence += 1;
    }
}

/// Derive the code for every leaf of `root`.
///
/// Entries are inserted in left-first depth-first order. A lone leaf root
/// gets the one-bit code `0`.
///
/// # Errors
/// Returns `HuffmanError::CodeLengthTooLong` if a leaf is deeper than 64.
pub fn derive_codes(root: &TreeNode) -> Result<EncodeTable> {
    let mut table = EncodeTable::new();

    if let TreeNode::Leaf { byte, .. } = root {
        table.insert(*byte, CodeEntry::new(1, 0));
        return Ok(table);
    }

    // (node, depth, code so far)
    let mut stack: Vec<(&TreeNode, u32, u64)> = vec![(root, 0, 0)];

    while let Some((node, depth, code)) = stack.pop() {
        match node {
            TreeNode::Leaf { byte, .. } => {
                table.insert(*byte, CodeEntry::new(depth, code));
            }
            TreeNode::Internal { left, right, .. } => {
                if depth >= MAX_DEPTH {
                    return Err(HuffmanError::CodeLengthTooLong {
                        length: depth as usize + 1,
                    }
                    .into());
                }
                // Right is pushed first so the left subtree is walked first.
                stack.push((right, depth + 1, code | 1 << depth));
                stack.push((left, depth + 1, code));
            }
        }
    }

    Ok(table)
}

/// Build the tree for `frequencies` and derive its encode table.
pub fn build_encode_table(frequencies: &FrequencyTable) -> Result<EncodeTable> {
    let root = build_tree(frequencies)?;
    derive_codes(&root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use proptest::prelude::*;

    fn eight_symbol_frequencies() -> FrequencyTable {
        [
            (b'a', 19),
            (b'b', 21),
            (b'c', 2),
            (b'd', 3),
            (b'e', 6),
            (b'f', 7),
            (b'g', 10),
            (b'h', 32),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_eight_symbol_codes() {
        let table = build_encode_table(&eight_symbol_frequencies()).unwrap();
        assert_eq!(table.len(), 8);

        let expected = [
            (b'a', 2, 0b00),
            (b'b', 2, 0b10),
            (b'c', 5, 0b00001),
            (b'd', 5, 0b10001),
            (b'e', 4, 0b1001),
            (b'f', 4, 0b0101),
            (b'g', 4, 0b1101),
            (b'h', 2, 0b11),
        ];
        for (byte, bit_length, code) in expected {
            assert_eq!(
                table.get(byte),
                Some(CodeEntry::new(bit_length, code)),
                "code for {}",
                byte as char
            );
        }
    }

    #[test]
    fn test_depth_first_insertion_order() {
        let table = build_encode_table(&eight_symbol_frequencies()).unwrap();
        let order: Vec<u8> = table.iter().map(|(byte, _)| byte).collect();
        assert_eq!(order, b"abcdefgh".to_vec());
    }

    #[test]
    fn test_root_frequency_is_total() {
        let frequencies = eight_symbol_frequencies();
        let root = build_tree(&frequencies).unwrap();
        assert_eq!(root.frequency(), frequencies.total());
    }

    #[test]
    fn test_equal_frequencies_follow_insertion_order() {
        let frequencies: FrequencyTable = [(b'x', 1), (b'y', 1), (b'z', 1), (b'w', 1)]
            .into_iter()
            .collect();
        let root = build_tree(&frequencies).unwrap();

        // w,x merge first (ascending byte order), then y,z; both subtrees
        // tie at 2 and join oldest-first.
        let TreeNode::Internal { left, right, .. } = root else {
            panic!("expected internal root");
        };
        let TreeNode::Internal { left: ll, right: lr, .. } = *left else {
            panic!("expected internal left");
        };
        let TreeNode::Internal { left: rl, right: rr, .. } = *right else {
            panic!("expected internal right");
        };
        assert_eq!(*ll, TreeNode::Leaf { byte: b'w', frequency: 1 });
        assert_eq!(*lr, TreeNode::Leaf { byte: b'x', frequency: 1 });
        assert_eq!(*rl, TreeNode::Leaf { byte: b'y', frequency: 1 });
        assert_eq!(*rr, TreeNode::Leaf { byte: b'z', frequency: 1 });
    }

    #[test]
    fn test_single_symbol_gets_one_bit() {
        let frequencies: FrequencyTable = [(b'q', 42)].into_iter().collect();
        let root = build_tree(&frequencies).unwrap();
        assert!(matches!(root, TreeNode::Leaf { byte: b'q', .. }));

        let table = derive_codes(&root).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(b'q'), Some(CodeEntry::new(1, 0)));
    }

    #[test]
    fn test_two_symbols() {
        let frequencies: FrequencyTable = [(0, 5), (255, 1)].into_iter().collect();
        let table = build_encode_table(&frequencies).unwrap();

        assert_eq!(table.get(255), Some(CodeEntry::new(1, 0)));
        assert_eq!(table.get(0), Some(CodeEntry::new(1, 1)));
    }

    #[test]
    fn test_empty_table() {
        let result = build_encode_table(&FrequencyTable::new());
        assert!(matches!(
            result,
            Err(Error::Huffman(HuffmanError::EmptyFrequencyTable))
        ));
    }

    #[test]
    fn test_skewed_tree_depth() {
        // Fibonacci weights produce the deepest possible tree.
        let mut frequencies = FrequencyTable::new();
        let (mut a, mut b) = (1u64, 1u64);
        for byte in 0..20u8 {
            frequencies.set(byte, a);
            (a, b) = (b, a + b);
        }
        let table = build_encode_table(&frequencies).unwrap();

        assert_eq!(table.max_bit_length(), 19);
        assert_eq!(table.get(19).map(|e| e.bit_length), Some(1));
    }

    #[test]
    fn test_depth_limit() {
        let mut node = TreeNode::Leaf { byte: 0, frequency: 1 };
        for byte in 1..=65u8 {
            node = TreeNode::merge(node, TreeNode::Leaf { byte, frequency: 1 });
        }
        let result = derive_codes(&node);
        assert!(matches!(
            result,
            Err(Error::Huffman(HuffmanError::CodeLengthTooLong { length: 65 }))
        ));
    }

    fn arb_frequencies() -> impl Strategy<Value = FrequencyTable> {
        prop::collection::btree_map(any::<u8>(), 1u64..10_000, 2..64)
            .prop_map(|counts| counts.into_iter().collect())
    }

    proptest! {
        #[test]
        fn prop_prefix_free(frequencies in arb_frequencies()) {
            let table = build_encode_table(&frequencies).unwrap();
            prop_assert_eq!(table.len(), frequencies.distinct());

            let entries: Vec<_> = table.iter().collect();
            for (i, (a_byte, a)) in entries.iter().enumerate() {
                for (b_byte, b) in entries.iter().skip(i + 1) {
                    prop_assert!(!a.is_prefix_of(b), "{a_byte} prefixes {b_byte}");
                    prop_assert!(!b.is_prefix_of(a), "{b_byte} prefixes {a_byte}");
                }
            }
        }

        #[test]
        fn prop_kraft_equality(frequencies in arb_frequencies()) {
            let table = build_encode_table(&frequencies).unwrap();
            let max = table.max_bit_length();
            let sum: u128 = table
                .iter()
                .map(|(_, entry)| 1u128 << (max - entry.bit_length))
                .sum();
            prop_assert_eq!(sum, 1u128 << max);
        }

        #[test]
        fn prop_higher_frequency_never_longer(frequencies in arb_frequencies()) {
            let table = build_encode_table(&frequencies).unwrap();
            for (a, fa) in frequencies.iter() {
                for (b, fb) in frequencies.iter() {
                    if fa > fb {
                        let la = table.get(a).unwrap().bit_length;
                        let lb = table.get(b).unwrap().bit_length;
                        prop_assert!(la <= lb, "{a} ({fa}) has {la} bits, {b} ({fb}) has {lb}");
                    }
                }
            }
        }

        #[test]
        fn prop_unique_minimum_is_deepest(frequencies in arb_frequencies()) {
            let min = frequencies.iter().map(|(_, f)| f).min().unwrap();
            let rarest: Vec<u8> = frequencies.iter().filter(|&(_, f)| f == min).map(|(b, _)| b).collect();
            prop_assume!(rarest.len() == 1);

            let table = build_encode_table(&frequencies).unwrap();
            let rare_len = table.get(rarest[0]).unwrap().bit_length;
            prop_assert_eq!(rare_len, table.max_bit_length());
        }
    }
}
