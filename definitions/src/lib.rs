//! Definitions -- the shared data model of the repeat-resolution pipeline.
//! Stages talk to each other through one, possibly large, JSON-encoded structure named
//! [DataSet](DataSet): the sparse de Bruijn graph handed over by the graph-construction
//! step together with the read paths threaded through it. The [DnaSeq](DnaSeq) type is
//! the sequence currency of the whole workspace.

use serde::{Deserialize, Serialize};

/// Translate an ASCII base into its 2-bit code. Lowercase is accepted.
pub fn base_to_code(base: u8) -> Option<u8> {
    match base {
        b'A' | b'a' => Some(0),
        b'C' | b'c' => Some(1),
        b'G' | b'g' => Some(2),
        b'T' | b't' => Some(3),
        _ => None,
    }
}

/// Translate a 2-bit code back into its ASCII base.
pub fn code_to_base(code: u8) -> u8 {
    b"ACGT"[code as usize]
}

/// A DNA sequence over {A, C, G, T}, packed two bits per symbol.
/// The complement of a code is `3 - code`, so reverse complement needs no table.
/// Symbols are compared by code, which coincides with the lexicographic order
/// of the bases.
///
/// Unused bits of the last storage block are kept zero so that equality and
/// hashing can work on the raw blocks.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct DnaSeq {
    storage: Vec<u64>,
    len: usize,
}

const WIDTH: usize = 2;
const BLOCK_BITS: usize = 64;

impl DnaSeq {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_capacity(n: usize) -> Self {
        Self {
            storage: Vec::with_capacity((n * WIDTH + BLOCK_BITS - 1) / BLOCK_BITS),
            len: 0,
        }
    }
    fn addr(i: usize) -> (usize, usize) {
        let k = i * WIDTH;
        (k / BLOCK_BITS, k % BLOCK_BITS)
    }
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    /// The 2-bit code at position `i`.
    pub fn get(&self, i: usize) -> Option<u8> {
        if i >= self.len {
            return None;
        }
        let (block, bit) = Self::addr(i);
        Some(((self.storage[block] >> bit) & 0b11) as u8)
    }
    pub fn first(&self) -> Option<u8> {
        self.get(0)
    }
    pub fn last(&self) -> Option<u8> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }
    /// Append a 2-bit code.
    pub fn push(&mut self, code: u8) {
        assert!(code < 4, "not a 2-bit code: {}", code);
        let (block, bit) = Self::addr(self.len);
        if bit == 0 {
            self.storage.push(0);
        }
        self.storage[block] |= (code as u64) << bit;
        self.len += 1;
    }
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.len).map(move |i| self.get(i).unwrap())
    }
    /// Keep the first `new_len` symbols, zeroing the freed bits.
    pub fn truncate(&mut self, new_len: usize) {
        assert!(new_len <= self.len);
        let blocks = (new_len * WIDTH + BLOCK_BITS - 1) / BLOCK_BITS;
        self.storage.truncate(blocks);
        let rem = (new_len * WIDTH) % BLOCK_BITS;
        if rem != 0 {
            if let Some(last) = self.storage.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
        self.len = new_len;
    }
    /// Drop the first `n` symbols.
    pub fn drop_front(&mut self, n: usize) {
        assert!(n <= self.len);
        *self = self.iter().skip(n).collect();
    }
    /// Copy of `len` symbols starting at `start`.
    pub fn sub(&self, start: usize, len: usize) -> Self {
        assert!(start + len <= self.len);
        self.iter().skip(start).take(len).collect()
    }
    pub fn prefix(&self, n: usize) -> Self {
        self.sub(0, n)
    }
    pub fn suffix(&self, n: usize) -> Self {
        self.sub(self.len - n, n)
    }
    /// Append all symbols of `other`.
    pub fn extend(&mut self, other: &Self) {
        for code in other.iter() {
            self.push(code);
        }
    }
    /// Prepend all symbols of `other`.
    pub fn prepend(&mut self, other: &Self) {
        let mut joined = other.clone();
        joined.extend(self);
        *self = joined;
    }
    pub fn revcomp(&self) -> Self {
        (0..self.len).rev().map(|i| 3 - self.get(i).unwrap()).collect()
    }
}

impl FromIterator<u8> for DnaSeq {
    fn from_iter<T: IntoIterator<Item = u8>>(iter: T) -> Self {
        let mut seq = DnaSeq::new();
        for code in iter {
            seq.push(code);
        }
        seq
    }
}

impl std::cmp::PartialOrd for DnaSeq {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::cmp::Ord for DnaSeq {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.iter().cmp(other.iter())
    }
}

impl std::fmt::Display for DnaSeq {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for code in self.iter() {
            write!(f, "{}", code_to_base(code) as char)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for DnaSeq {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl std::str::FromStr for DnaSeq {
    type Err = InvalidBase;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut seq = DnaSeq::with_capacity(s.len());
        for &byte in s.as_bytes() {
            match base_to_code(byte) {
                Some(code) => seq.push(code),
                None => return Err(InvalidBase(byte)),
            }
        }
        Ok(seq)
    }
}

/// A byte that is not one of A, C, G, T.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidBase(pub u8);

impl std::fmt::Display for InvalidBase {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "invalid DNA symbol {:?}", self.0 as char)
    }
}

impl std::error::Error for InvalidBase {}

impl Serialize for DnaSeq {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DnaSeq {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One edge of the sparse de Bruijn graph, labeled with its full sequence.
/// `start` and `end` are the stable string ids assigned by the graph builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbgEdge {
    pub start: String,
    pub end: String,
    pub seq: DnaSeq,
    /// Whether coverage evidence places this edge in exactly one locus.
    pub unique: bool,
}

/// The sparse de Bruijn graph as handed over by the construction step.
/// The order of `vertices` is stable and defines the dense integer ids used
/// downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SparseDbg {
    pub vertices: Vec<String>,
    pub edges: Vec<DbgEdge>,
}

impl SparseDbg {
    /// True if every edge endpoint names a listed vertex.
    pub fn sanity_check(&self) -> bool {
        use std::collections::HashSet;
        let names: HashSet<&str> = self.vertices.iter().map(|v| v.as_str()).collect();
        self.edges
            .iter()
            .all(|e| names.contains(e.start.as_str()) && names.contains(e.end.as_str()))
    }
}

/// The path of one read through the graph, as a list of edge indices.
/// Edge index `i` refers to `SparseDbg::edges[i]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadPathRecord {
    pub id: String,
    pub edges: Vec<u64>,
}

/// The message passed between pipeline stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSet {
    /// The path to the input file this dataset was derived from.
    pub input_file: String,
    pub graph: SparseDbg,
    pub read_paths: Vec<ReadPathRecord>,
}

impl DataSet {
    pub fn new(input_file: &str, graph: SparseDbg, read_paths: Vec<ReadPathRecord>) -> Self {
        Self {
            input_file: input_file.to_string(),
            graph,
            read_paths,
        }
    }
    /// Edge indices of every read path stay within the edge table and the
    /// graph itself is internally consistent.
    pub fn sanity_check(&self) -> bool {
        let edges = self.graph.edges.len() as u64;
        self.graph.sanity_check()
            && self
                .read_paths
                .iter()
                .all(|p| !p.edges.is_empty() && p.edges.iter().all(|&e| e < edges))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn pack_round_trip() {
        let seq: DnaSeq = "ACGTACGTACGTACGTACGTACGTACGTACGTACG".parse().unwrap();
        assert_eq!(seq.len(), 35);
        assert_eq!(seq.to_string(), "ACGTACGTACGTACGTACGTACGTACGTACGTACG");
    }
    #[test]
    fn invalid_symbol() {
        let res: Result<DnaSeq, _> = "ACGN".parse();
        assert_eq!(res, Err(InvalidBase(b'N')));
    }
    #[test]
    fn prefix_suffix_sub() {
        let seq: DnaSeq = "AACCGGTT".parse().unwrap();
        assert_eq!(seq.prefix(3).to_string(), "AAC");
        assert_eq!(seq.suffix(3).to_string(), "GTT");
        assert_eq!(seq.sub(2, 4).to_string(), "CCGG");
    }
    #[test]
    fn revcomp() {
        let seq: DnaSeq = "AAACGT".parse().unwrap();
        assert_eq!(seq.revcomp().to_string(), "ACGTTT");
        assert_eq!(seq.revcomp().revcomp(), seq);
    }
    #[test]
    fn palindrome_is_its_own_revcomp() {
        let seq: DnaSeq = "ACGT".parse().unwrap();
        assert_eq!(seq.revcomp(), seq);
    }
    #[test]
    fn truncate_then_compare() {
        let mut a: DnaSeq = "ACGTACGTACGTACGTACGTACGTACGTACGTACGT".parse().unwrap();
        a.truncate(33);
        let b: DnaSeq = "ACGTACGTACGTACGTACGTACGTACGTACGTA".parse().unwrap();
        assert_eq!(a, b);
    }
    #[test]
    fn drop_front_and_prepend() {
        let mut seq: DnaSeq = "ACGTT".parse().unwrap();
        seq.drop_front(2);
        assert_eq!(seq.to_string(), "GTT");
        let head: DnaSeq = "CC".parse().unwrap();
        seq.prepend(&head);
        assert_eq!(seq.to_string(), "CCGTT");
    }
    #[test]
    fn lexicographic_order() {
        let a: DnaSeq = "ACGT".parse().unwrap();
        let b: DnaSeq = "ACGTA".parse().unwrap();
        let c: DnaSeq = "ACT".parse().unwrap();
        assert!(a < b);
        assert!(b < c);
        assert!(a < c);
    }
    #[test]
    fn dataset_sanity() {
        let graph = SparseDbg {
            vertices: vec!["u".to_string(), "v".to_string()],
            edges: vec![DbgEdge {
                start: "u".to_string(),
                end: "v".to_string(),
                seq: "ACGTACGT".parse().unwrap(),
                unique: false,
            }],
        };
        let ds = DataSet::new("reads.fa", graph, vec![ReadPathRecord {
            id: "read0".to_string(),
            edges: vec![0],
        }]);
        assert!(ds.sanity_check());
        let json = serde_json::to_string(&ds).unwrap();
        let back: DataSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back.graph.edges[0].seq.to_string(), "ACGTACGT");
    }
}
