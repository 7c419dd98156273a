//! Repeat resolution on a multiplex de Bruijn graph.
//!
//! The input is a sparse de Bruijn graph plus the paths the reads trace
//! through it; the engine lifts the graph into a multiplex one, grows the
//! vertex words step by step while the read paths license unambiguous
//! continuations, and finally spells the surviving edges as contigs.
pub mod mdbg;
pub mod multigraph;
pub mod read_paths;
pub mod stats;
pub mod topology;
mod error;
#[macro_use]
extern crate log;
pub use error::ResolveError;
pub use mdbg::{Contig, KIncreaser, MultiplexDbg, StepReport};
pub use read_paths::ReadPaths;
pub use stats::Stats;

use std::path::PathBuf;

/// Parameters of one resolution run.
#[derive(Debug, Clone)]
pub struct ResolveConfig {
    /// Word length of the vertices at construction.
    pub start_k: usize,
    /// Soft ceiling: the transform stops here even if vertices remain active.
    pub saturating_k: usize,
    /// Validate the graph after every step instead of only at the end.
    pub debug: bool,
    /// Where the graph dumps and the contig FASTA go.
    pub out_dir: PathBuf,
}

impl ResolveConfig {
    pub fn new<P: Into<PathBuf>>(start_k: usize, saturating_k: usize, debug: bool, out_dir: P) -> Self {
        Self {
            start_k,
            saturating_k,
            debug,
            out_dir: out_dir.into(),
        }
    }
}

/// The outcome of a resolution run.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub contigs: Vec<Contig>,
    pub final_k: usize,
    /// Whether every vertex ended up frozen.
    pub frozen: bool,
}

pub trait ResolveRepeats {
    fn resolve_repeats(&self, c: &ResolveConfig) -> Result<Resolution, ResolveError>;
}

impl ResolveRepeats for definitions::DataSet {
    fn resolve_repeats(&self, c: &ResolveConfig) -> Result<Resolution, ResolveError> {
        info!("Resolving repeats on {}", self.input_file);
        std::fs::create_dir_all(&c.out_dir)?;
        let mut paths = ReadPaths::new();
        for record in self.read_paths.iter() {
            paths.add_path(record.edges.clone());
        }
        let mut mdbg = MultiplexDbg::from_sparse_dbg(&self.graph, c.start_k, paths)?;
        mdbg.serialize_to_dot(c.out_dir.join("init_graph.dot"))?;
        let increaser = KIncreaser::new(c.start_k, c.saturating_k, c.debug);
        let final_k = match increaser.increase_until_saturation(&mut mdbg) {
            Ok(k) => k,
            Err(ResolveError::Cancelled { k }) => {
                warn!("Transform cancelled at k={}, writing partial results", k);
                k
            }
            Err(e) => return Err(e),
        };
        mdbg.serialize_to_dot(c.out_dir.join("resolved_graph.dot"))?;
        mdbg.serialize_to_gfa(c.out_dir.join("resolved_graph.gfa"))?;
        let contigs = mdbg.print_trim_edges(c.out_dir.join("compressed.fasta"))?;
        info!("Resolved into {} contigs at k={}", contigs.len(), final_k);
        Ok(Resolution {
            contigs,
            final_k,
            frozen: mdbg.is_frozen(),
        })
    }
}
