//! Quick numbers about a dataset, for the `stats` subcommand.
use std::io::Write;

use definitions::DataSet;

pub trait Stats {
    fn stats<W: Write>(&self, wtr: W) -> std::io::Result<()>;
}

impl Stats for DataSet {
    fn stats<W: Write>(&self, mut wtr: W) -> std::io::Result<()> {
        writeln!(wtr, "Input\t{}", self.input_file)?;
        writeln!(wtr, "Vertices\t{}", self.graph.vertices.len())?;
        writeln!(wtr, "Edges\t{}", self.graph.edges.len())?;
        let unique = self.graph.edges.iter().filter(|e| e.unique).count();
        writeln!(wtr, "UniqueEdges\t{}", unique)?;
        let lens: Vec<usize> = self.graph.edges.iter().map(|e| e.seq.len()).collect();
        let total: usize = lens.iter().sum();
        writeln!(wtr, "TotalEdgeLength\t{}", total)?;
        if !lens.is_empty() {
            writeln!(wtr, "MeanEdgeLength\t{}", total / lens.len())?;
            writeln!(wtr, "MaxEdgeLength\t{}", lens.iter().max().unwrap())?;
        }
        writeln!(wtr, "ReadPaths\t{}", self.read_paths.len())?;
        let steps: usize = self.read_paths.iter().map(|p| p.edges.len()).sum();
        if !self.read_paths.is_empty() {
            writeln!(wtr, "MeanPathLength\t{}", steps / self.read_paths.len())?;
        }
        Ok(())
    }
}
