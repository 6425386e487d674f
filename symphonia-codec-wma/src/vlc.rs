// Symphonia
// Copyright (c) 2019-2024 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Canonical Huffman (variable-length code) table construction and decoding.
//!
//! `symphonia_core::io::bit::huffman` only supports tables backed by `&'static` data, which is
//! unsuitable here: the exponent and coefficient tables used by the WMA decoder are built at
//! decoder-construction time from a per-stream code-length table, and every decoder instance must
//! own its tables so that dropping a decoder releases them (see the memory discipline invariant).
//! This module builds a small binary trie instead, walked one bit at a time with
//! [`ReadBitsLtr::read_bit`]. It trades the upstream table's multi-level jump performance for an
//! implementation that owns its storage without `unsafe`.

use symphonia_core::errors::{decode_error, Result};
use symphonia_core::io::bit::ReadBitsLtr;

const NONE: u32 = u32::MAX;

#[derive(Clone, Copy)]
enum Node {
    /// An internal node: `(child_for_bit_0, child_for_bit_1)`, each either a node index or
    /// [`NONE`] if that branch hasn't been populated yet.
    Branch(u32, u32),
    /// A leaf holding the decoded symbol.
    Leaf(u32),
}

/// An owned canonical Huffman decode table.
///
/// Built once from an array of per-symbol code lengths (a length of `0` means the symbol is
/// unused) and then used to decode a prefix-free bitstream one symbol at a time.
pub struct VlcTable {
    nodes: Vec<Node>,
}

impl VlcTable {
    /// Build a canonical Huffman table from per-symbol code lengths.
    ///
    /// Symbols are assigned codes in order of increasing length, and, for equal lengths, in
    /// order of increasing symbol index (the standard canonical Huffman construction). A symbol
    /// with a length of `0` is absent from the table.
    pub fn new(lengths: &[u8]) -> Result<VlcTable> {
        let mut symbols: Vec<(u8, u32)> = lengths
            .iter()
            .enumerate()
            .filter(|&(_, &len)| len > 0)
            .map(|(sym, &len)| (len, sym as u32))
            .collect();

        if symbols.is_empty() {
            return decode_error("wma: empty huffman code length table");
        }

        symbols.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut table = VlcTable { nodes: vec![Node::Branch(NONE, NONE)] };

        let mut code: u32 = 0;
        let mut prev_len: u8 = 0;

        for (len, sym) in symbols {
            if len > 31 {
                return decode_error("wma: huffman code too long");
            }

            code <<= len - prev_len;
            table.insert(code, len, sym)?;
            code += 1;
            prev_len = len;
        }

        Ok(table)
    }

    fn insert(&mut self, code: u32, len: u8, sym: u32) -> Result<()> {
        let mut node = 0usize;

        for i in (0..len).rev() {
            let bit = (code >> i) & 1;

            let (zero, one) = match self.nodes[node] {
                Node::Branch(zero, one) => (zero, one),
                Node::Leaf(_) => return decode_error("wma: huffman codes are not prefix-free"),
            };

            let next = if bit == 0 { zero } else { one };

            if i == 0 {
                if next != NONE {
                    return decode_error("wma: huffman codes are not prefix-free");
                }

                self.nodes.push(Node::Leaf(sym));
                let leaf = (self.nodes.len() - 1) as u32;

                self.nodes[node] =
                    if bit == 0 { Node::Branch(leaf, one) } else { Node::Branch(zero, leaf) };
            }
            else if next == NONE {
                self.nodes.push(Node::Branch(NONE, NONE));
                let child = (self.nodes.len() - 1) as u32;

                self.nodes[node] =
                    if bit == 0 { Node::Branch(child, one) } else { Node::Branch(zero, child) };

                node = child as usize;
            }
            else {
                node = next as usize;
            }
        }

        Ok(())
    }

    /// Decode the next symbol from the bitstream.
    pub fn read_symbol<B: ReadBitsLtr>(&self, bits: &mut B) -> Result<u32> {
        let mut node = 0usize;

        loop {
            match self.nodes[node] {
                Node::Leaf(sym) => return Ok(sym),
                Node::Branch(zero, one) => {
                    let bit = bits.read_bit()?;
                    let next = if bit { one } else { zero };

                    if next == NONE {
                        return decode_error("wma: invalid huffman code");
                    }

                    node = next as usize;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia_core::io::bit::BitReaderLtr;

    #[test]
    fn build_and_decode_simple_table() {
        // 4 symbols: lengths 1, 2, 3, 3 (a complete code: 1/2 + 1/4 + 1/8 + 1/8 = 1).
        let table = VlcTable::new(&[1, 2, 3, 3]).unwrap();

        // Canonical codes: sym0=0b0, sym1=0b10, sym2=0b110, sym3=0b111. Concatenated MSB-first:
        // 0 10 110 111 -> byte0 = 0b0101_1011, byte1 = 0b1000_0000 (remaining bit + padding).
        let data = [0b0101_1011, 0b1000_0000];
        let mut bits = BitReaderLtr::new(&data);

        assert_eq!(table.read_symbol(&mut bits).unwrap(), 0);
        assert_eq!(table.read_symbol(&mut bits).unwrap(), 1);
        assert_eq!(table.read_symbol(&mut bits).unwrap(), 2);
        assert_eq!(table.read_symbol(&mut bits).unwrap(), 3);
    }

    #[test]
    fn rejects_non_prefix_free_lengths() {
        // Two symbols both claiming the single 1-bit code space is over-subscribed.
        assert!(VlcTable::new(&[1, 1, 1]).is_err());
    }

    #[test]
    fn rejects_empty_table() {
        assert!(VlcTable::new(&[0, 0, 0]).is_err());
    }

    #[test]
    fn unused_symbols_are_skipped() {
        // Symbol 1 is unused (length 0); symbols 0 and 2 share the code space.
        let table = VlcTable::new(&[1, 0, 1]).unwrap();

        let data = [0b0_1000000];
        let mut bits = BitReaderLtr::new(&data);

        assert_eq!(table.read_symbol(&mut bits).unwrap(), 0);
        assert_eq!(table.read_symbol(&mut bits).unwrap(), 2);
    }
}
