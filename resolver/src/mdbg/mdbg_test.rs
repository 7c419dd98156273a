#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use definitions::DnaSeq;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use rand_xoshiro::Xoroshiro128StarStar;

    use crate::error::ResolveError;
    use crate::mdbg::{KIncreaser, MultiplexDbg};
    use crate::read_paths::ReadPaths;
    use crate::topology::SuccinctEdgeRecord;

    fn seq(s: &str) -> DnaSeq {
        s.parse().unwrap()
    }
    // A record sliced from the full edge sequence, the way the sparse-graph
    // constructor does it.
    fn record(start_id: u64, end_id: u64, full: &str, k: usize, unique: bool) -> SuccinctEdgeRecord {
        let full = seq(full);
        let size = full.len() as i64 - 2 * k as i64;
        let inner = if size > 0 {
            full.sub(k, size as usize)
        } else {
            DnaSeq::new()
        };
        SuccinctEdgeRecord {
            start_id,
            start_word: full.prefix(k),
            end_id,
            end_word: full.suffix(k),
            inner_seq: inner,
            inner_size: size,
            unique,
        }
    }
    fn paths_of(lists: &[&[u64]]) -> ReadPaths {
        let mut paths = ReadPaths::new();
        for list in lists {
            paths.add_path(list.to_vec());
        }
        paths
    }

    #[test]
    fn linear_chain_construction() {
        let records = vec![record(0, 1, "ACGTACGT", 3, false)];
        let g = MultiplexDbg::from_records(records, 3, ReadPaths::new()).unwrap();
        assert_eq!(g.vertex(0).seq().to_string(), "ACG");
        assert_eq!(g.vertex(1).seq().to_string(), "CGT");
        assert_eq!(g.edge(0).size(), 2);
        assert_eq!(g.edge(0).seq().to_string(), "TA");
        assert!(!g.vertex(0).is_frozen());
        // ACGTACGT is its own reverse complement: the endpoints are mutual
        // siblings and the edge pairs with itself.
        assert_eq!(g.vertex(0).rc(), Some(1));
        assert_eq!(g.vertex(1).rc(), Some(0));
        assert_eq!(g.edge(0).rc(), Some(0));
    }

    #[test]
    fn linear_chain_saturation() {
        let records = vec![record(0, 1, "ACGTACGT", 3, false)];
        let mut g = MultiplexDbg::from_records(records, 3, ReadPaths::new()).unwrap();
        let increaser = KIncreaser::new(3, 4, true);
        let k = increaser.increase_until_saturation(&mut g).unwrap();
        assert_eq!(k, 4);
        assert_eq!(g.vertex(0).seq().to_string(), "ACGT");
        assert_eq!(g.vertex(1).seq().to_string(), "ACGT");
        assert_eq!(g.edge(0).size(), 0);
        assert!(g.edge(0).seq().is_empty());
        assert!(g.assert_validity().is_ok());
    }

    #[test]
    fn round_trip_is_identity() {
        let records = vec![record(0, 1, "ACGTACGT", 3, false)];
        let mut g = MultiplexDbg::from_records(records, 3, ReadPaths::new()).unwrap();
        let k = KIncreaser::new(3, 3, true)
            .increase_until_saturation(&mut g)
            .unwrap();
        assert_eq!(k, 3);
        assert_eq!(g.vertex(0).seq().to_string(), "ACG");
        assert_eq!(g.edge(0).size(), 2);
    }

    #[test]
    fn bubble_freezes_at_construction() {
        // Two parallel edges with no path evidence: both endpoints freeze and
        // the transform is a no-op.
        let records = vec![
            record(0, 1, "AAACCCAAA", 3, false),
            record(0, 1, "AAAGGGAAA", 3, false),
        ];
        let mut g = MultiplexDbg::from_records(records, 3, ReadPaths::new()).unwrap();
        assert!(g.is_frozen());
        let k = KIncreaser::new(3, 10, true)
            .increase_until_saturation(&mut g)
            .unwrap();
        assert_eq!(k, 3);
        assert_eq!(g.edge(0).size(), 3);
        assert_eq!(g.edge(1).size(), 3);
        assert_eq!(g.vertex_count(), 2);
    }

    #[test]
    fn step_on_frozen_graph_is_noop() {
        let records = vec![
            record(0, 1, "AAACCCAAA", 3, false),
            record(0, 1, "AAAGGGAAA", 3, false),
        ];
        let mut g = MultiplexDbg::from_records(records, 3, ReadPaths::new()).unwrap();
        let report = KIncreaser::new(3, 10, true).increase(&mut g).unwrap();
        assert_eq!(report.frozen_now, 0);
        assert!(report.all_frozen);
        assert_eq!(g.vertex(0).seq().to_string(), "AAA");
        assert_eq!(g.edge(0).seq().to_string(), "CCC");
    }

    #[test]
    fn self_loop_frozen_at_construction() {
        let records = vec![record(0, 0, "AAAAAA", 3, false)];
        let mut g = MultiplexDbg::from_records(records, 3, ReadPaths::new()).unwrap();
        assert!(g.is_frozen());
        assert_eq!(g.vertex_count(), 1);
        let k = KIncreaser::new(3, 10, true)
            .increase_until_saturation(&mut g)
            .unwrap();
        assert_eq!(k, 3);
        let dir = tempfile::tempdir().unwrap();
        let contigs = g.print_trim_edges(dir.path().join("loop.fasta")).unwrap();
        assert_eq!(contigs.len(), 1);
        assert_eq!(contigs[0].seq.to_string(), "AAAAAA");
    }

    // Four edges around a 2-in-2-out vertex, resolved by the read paths
    // (a, c) and (b, d).
    fn repeat_records() -> Vec<SuccinctEdgeRecord> {
        vec![
            record(0, 2, "AACAGG", 3, false), // a -> v
            record(1, 2, "ACCAGG", 3, false), // b -> v
            record(2, 3, "AGGCCA", 3, false), // v -> c
            record(2, 4, "AGGCAA", 3, false), // v -> d
        ]
    }

    #[test]
    fn repeat_resolution_one_step() {
        let paths = paths_of(&[&[0, 2], &[1, 3]]);
        let mut g = MultiplexDbg::from_records(repeat_records(), 3, paths).unwrap();
        assert!(!g.vertex(2).is_frozen());
        KIncreaser::new(3, 4, true).increase(&mut g).unwrap();
        // The repeat vertex is dismantled and each read survives as a single
        // merged edge spelling the same sequence as before.
        assert!(!g.contains_vertex(2));
        assert_eq!(g.vertex_count(), 4);
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.paths().paths(), &[vec![0], vec![1]]);
        assert_eq!(g.edge_endpoints(0), (0, 3));
        assert_eq!(g.edge_endpoints(1), (1, 4));
        assert_eq!(g.spell_path(&[0]).to_string(), "AACAGGCCA");
        assert_eq!(g.spell_path(&[1]).to_string(), "ACCAGGCAA");
        assert_eq!(g.edge(0).size(), 1);
        assert_eq!(g.vertex(0).seq().to_string(), "AACA");
        assert_eq!(g.vertex(3).seq().to_string(), "GCCA");
    }

    #[test]
    fn repeat_resolution_saturation() {
        let paths = paths_of(&[&[0, 2], &[1, 3]]);
        let mut g = MultiplexDbg::from_records(repeat_records(), 3, paths).unwrap();
        let k = KIncreaser::new(3, 12, true)
            .increase_until_saturation(&mut g)
            .unwrap();
        assert!(g.is_frozen());
        assert!(k <= 12);
        assert_eq!(g.spell_path(&[0]).to_string(), "AACAGGCCA");
        assert_eq!(g.spell_path(&[1]).to_string(), "ACCAGGCAA");
        let dir = tempfile::tempdir().unwrap();
        let contigs = g.print_trim_edges(dir.path().join("out.fasta")).unwrap();
        let mut spelled: Vec<String> = contigs.iter().map(|c| c.seq.to_string()).collect();
        spelled.sort();
        assert_eq!(spelled, vec!["AACAGGCCA".to_string(), "ACCAGGCAA".to_string()]);
    }

    #[test]
    fn unique_loop_linearized_in_one_step() {
        // u -> v -> w with a unique self-loop at v, traversed once by the
        // read: the loop is threaded into the chain and everything merges
        // into a single edge.
        let records = vec![
            record(0, 1, "AATCGC", 3, false),
            record(1, 1, "CGCTTCGC", 3, true),
            record(1, 2, "CGCTAA", 3, false),
        ];
        let paths = paths_of(&[&[0, 1, 2]]);
        let mut g = MultiplexDbg::from_records(records, 3, paths).unwrap();
        assert!(!g.vertex(1).is_frozen());
        KIncreaser::new(3, 4, true).increase(&mut g).unwrap();
        assert!(!g.contains_vertex(1));
        assert_eq!(g.vertex_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.paths().paths(), &[vec![0]]);
        assert_eq!(g.edge_endpoints(0), (0, 2));
        assert_eq!(g.edge(0).size(), 6);
        assert_eq!(g.spell_path(&[0]).to_string(), "AATCGCTTCGCTAA");
        assert!(g.edge(0).is_unique());
    }

    #[test]
    fn edge_pairs_from_unique_loop() {
        // Same layout, but without any read evidence: the single unique loop
        // rule pairs the loop with the chain on both sides.
        let records = vec![
            record(0, 1, "AATCGC", 3, false),
            record(1, 1, "CGCTTCGC", 3, true),
            record(1, 2, "CGCTAA", 3, false),
        ];
        let g = MultiplexDbg::from_records(records, 3, ReadPaths::new()).unwrap();
        let (s2e, e2s) = g.edge_pairs_vertex(1);
        let expect_s2e =
            BTreeMap::from([(0, BTreeSet::from([1])), (1, BTreeSet::from([2]))]);
        let expect_e2s =
            BTreeMap::from([(1, BTreeSet::from([0])), (2, BTreeSet::from([1]))]);
        assert_eq!(s2e, expect_s2e);
        assert_eq!(e2s, expect_e2s);
        assert!(!g.vertex(1).is_frozen());
    }

    #[test]
    fn edge_pairs_all_unique_closure() {
        // One pair is backed by a read; the remaining in/out edges are closed
        // because every incoming edge is unique.
        let records: Vec<_> = repeat_records()
            .into_iter()
            .map(|mut r| {
                r.unique = true;
                r
            })
            .collect();
        let g = MultiplexDbg::from_records(records, 3, paths_of(&[&[0, 2]])).unwrap();
        let (s2e, e2s) = g.edge_pairs_vertex(2);
        let expect_s2e =
            BTreeMap::from([(0, BTreeSet::from([2])), (1, BTreeSet::from([3]))]);
        let expect_e2s =
            BTreeMap::from([(2, BTreeSet::from([0])), (3, BTreeSet::from([1]))]);
        assert_eq!(s2e, expect_s2e);
        assert_eq!(e2s, expect_e2s);
    }

    #[test]
    fn unresolvable_repeat_freezes() {
        // Only one of four edges is paired and nothing is unique: the
        // junction freezes at construction.
        let g =
            MultiplexDbg::from_records(repeat_records(), 3, paths_of(&[&[0, 2]])).unwrap();
        assert!(g.vertex(2).is_frozen());
    }

    #[test]
    fn malformed_word_length() {
        let mut bad = record(0, 1, "ACGTACGT", 3, false);
        bad.start_word = seq("AC");
        let err = MultiplexDbg::from_records(vec![bad], 3, ReadPaths::new()).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedRecord { index: 0, .. }));
    }

    #[test]
    fn malformed_size_mismatch() {
        let mut bad = record(0, 1, "ACGTACGT", 3, false);
        bad.inner_size = 3;
        let err = MultiplexDbg::from_records(vec![bad], 3, ReadPaths::new()).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedRecord { index: 0, .. }));
    }

    #[test]
    fn malformed_overlap() {
        // Claimed overlap of 1, but the words do not share a symbol there.
        let rec = SuccinctEdgeRecord {
            start_id: 0,
            start_word: seq("AAA"),
            end_id: 1,
            end_word: seq("CCC"),
            inner_seq: DnaSeq::new(),
            inner_size: -1,
            unique: false,
        };
        let err = MultiplexDbg::from_records(vec![rec], 3, ReadPaths::new()).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedRecord { index: 0, .. }));
    }

    #[test]
    fn malformed_inconsistent_vertex_word() {
        let records = vec![
            record(0, 1, "AAACCC", 3, false),
            record(0, 2, "GGGTTT", 3, false), // vertex 0 now claims word GGG
        ];
        let err = MultiplexDbg::from_records(records, 3, ReadPaths::new()).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedRecord { index: 1, .. }));
    }

    #[test]
    fn malformed_path_edge() {
        let records = vec![record(0, 1, "ACGTACGT", 3, false)];
        let err = MultiplexDbg::from_records(records, 3, paths_of(&[&[5]])).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedPath { index: 0, .. }));
    }

    #[test]
    fn non_loop_chain_vertex_is_rejected() {
        // A 1-in-1-out vertex that is not a self-loop violates the structural
        // contract of the input graph.
        let records = vec![
            record(0, 1, "AAACCC", 3, false),
            record(1, 2, "CCCGGG", 3, false),
        ];
        let err = MultiplexDbg::from_records(records, 3, ReadPaths::new()).unwrap_err();
        assert!(matches!(err, ResolveError::Invariant(_)));
    }

    #[test]
    fn two_strand_siblings_maintained() {
        // One edge and its reverse complement: sibling links are found at
        // construction and survive a transform step.
        let records = vec![
            record(0, 1, "AAACCGG", 3, false),
            record(2, 3, "CCGGTTT", 3, false),
        ];
        let paths = paths_of(&[&[0], &[1]]);
        let mut g = MultiplexDbg::from_records(records, 3, paths).unwrap();
        assert_eq!(g.vertex(0).rc(), Some(3));
        assert_eq!(g.vertex(1).rc(), Some(2));
        assert_eq!(g.edge(0).rc(), Some(1));
        KIncreaser::new(3, 4, true).increase(&mut g).unwrap();
        assert_eq!(g.vertex(0).seq().to_string(), "AAAC");
        assert_eq!(g.vertex(3).seq().to_string(), "GTTT");
        assert_eq!(g.vertex(1).seq().to_string(), "CCGG");
        assert_eq!(g.vertex(2).seq().to_string(), "CCGG");
        assert!(g.assert_validity().is_ok());
        let dir = tempfile::tempdir().unwrap();
        let contigs = g.print_trim_edges(dir.path().join("strands.fasta")).unwrap();
        assert_eq!(contigs.len(), 1);
        assert_eq!(contigs[0].seq.to_string(), "AAACCGG");
    }

    #[test]
    fn cancelled_between_steps() {
        let records = vec![record(0, 1, "ACGTACGT", 3, false)];
        let mut g = MultiplexDbg::from_records(records, 3, ReadPaths::new()).unwrap();
        let flag = Arc::new(AtomicBool::new(false));
        flag.store(true, Ordering::Relaxed);
        let increaser = KIncreaser::new(3, 10, true).with_cancel_flag(flag);
        let err = increaser.increase_until_saturation(&mut g).unwrap_err();
        assert!(matches!(err, ResolveError::Cancelled { k: 3 }));
        // The graph is untouched and still usable.
        assert!(g.assert_validity().is_ok());
        assert_eq!(g.vertex(0).seq().to_string(), "ACG");
    }

    #[test]
    fn serialization_smoke() {
        let records = vec![record(0, 1, "ACGTACGT", 3, false)];
        let mut g = MultiplexDbg::from_records(records, 3, ReadPaths::new()).unwrap();
        KIncreaser::new(3, 4, true)
            .increase_until_saturation(&mut g)
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        g.serialize_to_dot(dir.path().join("graph.dot")).unwrap();
        g.serialize_to_gfa(dir.path().join("graph.gfa")).unwrap();
        let contigs = g.print_trim_edges(dir.path().join("graph.fasta")).unwrap();
        assert_eq!(contigs.len(), 1);
        assert_eq!(contigs[0].seq.to_string(), "ACGTACGT");
        let dot = std::fs::read_to_string(dir.path().join("graph.dot")).unwrap();
        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("->"));
        let gfa = std::fs::read_to_string(dir.path().join("graph.gfa")).unwrap();
        assert!(gfa.starts_with("H\tVN:Z:1.0"));
        assert!(gfa.contains("S\tedge_0\tACGTACGT"));
        let fasta = std::fs::read_to_string(dir.path().join("graph.fasta")).unwrap();
        assert!(fasta.contains(">contig_0000"));
        assert!(fasta.contains("ACGTACGT"));
    }

    const BASES: [char; 4] = ['A', 'C', 'G', 'T'];

    #[test]
    fn random_linear_chain_spells_back() {
        let mut rng: Xoroshiro128StarStar = SeedableRng::seed_from_u64(3921);
        for round in 0..8 {
            let genome: String = (0..40)
                .filter_map(|_| BASES.choose(&mut rng))
                .collect();
            let records = vec![record(0, 1, &genome, 5, false)];
            let mut g = MultiplexDbg::from_records(records, 5, ReadPaths::new()).unwrap();
            KIncreaser::new(5, 40, true)
                .increase_until_saturation(&mut g)
                .unwrap();
            assert!(g.is_frozen(), "round {}", round);
            let spelled = g.spell_path(&[0]).to_string();
            assert_eq!(spelled, genome, "round {}", round);
        }
    }
}
