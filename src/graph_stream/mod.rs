//! Streaming graph serialization.
//!
//! Graphs are exchanged as adjacency lists (vertex to out-neighbours) and read
//! chunk by chunk, so a reader never holds more than one bounded part of a
//! file. Readers may be positioned anywhere in a file; they resynchronize to
//! the next record boundary on their own.

pub mod binary;
pub mod edge_list;
pub mod text;

pub use binary::{BinaryGraphReader, BinaryGraphWriter};
pub use edge_list::{BinaryEdgeListReader, BinaryEdgeListWriter};
pub use text::{TextGraphReader, TextGraphWriter};

use crate::error::{Error, Result};
use crate::graph::DirectedGraph;
use crate::Node;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read};
use std::path::Path;

pub type AdjacencyList = BTreeMap<Node, Vec<Node>>;

pub const DEFAULT_BUFFER_INTS: usize = 1 << 15;

/// Appends the out-neighbours of `part` to those already in `target`.
pub fn merge_into(target: &mut AdjacencyList, part: AdjacencyList) {
    for (source, targets) in part {
        target.entry(source).or_default().extend(targets);
    }
}

pub fn edge_count(adjacency: &AdjacencyList) -> usize {
    adjacency.values().map(Vec::len).sum()
}

pub trait GraphReader {
    /// Reads the next part of the graph; `None` once the stream is exhausted.
    fn read_adjacency_list(&mut self) -> Result<Option<AdjacencyList>>;

    fn reset(&mut self) -> Result<()>;

    /// Byte offset of the next record.
    fn position(&self) -> u64;

    /// Moves to the first record boundary at or after `position`.
    fn set_position(&mut self, position: u64) -> Result<()>;

    /// Length of the stream in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Skips forward to the next record boundary.
    fn calibrate(&mut self) -> Result<()>;

    fn read_entire(&mut self) -> Result<AdjacencyList> {
        self.reset()?;
        let mut adjacency = AdjacencyList::new();
        while let Some(part) = self.read_adjacency_list()? {
            merge_into(&mut adjacency, part);
        }
        Ok(adjacency)
    }
}

pub trait GraphWriter {
    fn write_record(&mut self, source: Node, targets: &[Node]) -> Result<()>;

    fn write_next_part(&mut self, part: &AdjacencyList) -> Result<()> {
        for (&source, targets) in part {
            self.write_record(source, targets)?;
        }
        Ok(())
    }

    /// Writes one record per vertex, including vertices without out-edges.
    fn write_graph(&mut self, graph: &dyn DirectedGraph) -> Result<()> {
        let mut targets = Vec::new();
        for v in 0..graph.vertex_count() {
            targets.clear();
            targets.extend(graph.out_edges(v).iter().map(|e| e.target));
            self.write_record(v, &targets)?;
        }
        Ok(())
    }

    /// Flushes buffered records; the writer must not be used afterwards.
    fn finish(&mut self) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphFormat {
    /// `.bin`: little endian `i32` adjacency records.
    BinaryAdjacency,
    /// `.bel`: little endian `i32` source/target pairs.
    BinaryEdgeList,
    /// `.txt`: space separated adjacency lines.
    Text,
    /// `.csv`: comma separated adjacency lines.
    Csv,
}

impl GraphFormat {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("bin") => Ok(GraphFormat::BinaryAdjacency),
            Some("bel") | Some("sbel") => Ok(GraphFormat::BinaryEdgeList),
            Some("txt") => Ok(GraphFormat::Text),
            Some("csv") => Ok(GraphFormat::Csv),
            _ => Err(Error::UnknownFormat(path.display().to_string())),
        }
    }
}

pub fn open_reader(path: impl AsRef<Path>) -> Result<Box<dyn GraphReader>> {
    open_reader_with_buffer(path, DEFAULT_BUFFER_INTS)
}

/// `buffer` bounds a single read: integers for binary formats, tokens for text formats.
pub fn open_reader_with_buffer(
    path: impl AsRef<Path>,
    buffer: usize,
) -> Result<Box<dyn GraphReader>> {
    let format = GraphFormat::from_path(&path)?;
    let file = File::open(&path)?;

    Ok(match format {
        GraphFormat::BinaryAdjacency => {
            Box::new(BinaryGraphReader::with_buffer(BufReader::new(file), buffer)?)
        }
        GraphFormat::BinaryEdgeList => {
            Box::new(BinaryEdgeListReader::with_buffer(BufReader::new(file), buffer)?)
        }
        GraphFormat::Text | GraphFormat::Csv => {
            Box::new(TextGraphReader::with_buffer(file, buffer)?)
        }
    })
}

pub fn create_writer(path: impl AsRef<Path>) -> Result<Box<dyn GraphWriter>> {
    let format = GraphFormat::from_path(&path)?;
    let file = BufWriter::new(File::create(&path)?);

    Ok(match format {
        GraphFormat::BinaryAdjacency => Box::new(BinaryGraphWriter::new(file)),
        GraphFormat::BinaryEdgeList => Box::new(BinaryEdgeListWriter::new(file)),
        GraphFormat::Text => Box::new(TextGraphWriter::text(file)),
        GraphFormat::Csv => Box::new(TextGraphWriter::csv(file)),
    })
}

/// Reads until `buf` is full or the end of the stream is reached.
pub(crate) fn read_up_to(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

pub(crate) fn to_record_int(vertex: Node) -> Result<i32> {
    i32::try_from(vertex).map_err(|_| Error::VertexOutOfRange(vertex))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph::{AdjacencyGraph, Edge};
    use tempfile::tempdir;

    /// Includes an isolated vertex (4) and a self-loop (2).
    pub(crate) fn sample_adjacency() -> AdjacencyList {
        let mut adjacency = AdjacencyList::new();
        adjacency.insert(0, vec![1, 2, 3]);
        adjacency.insert(1, vec![0]);
        adjacency.insert(2, vec![2, 0]);
        adjacency.insert(3, vec![1]);
        adjacency.insert(4, vec![]);
        adjacency
    }

    #[test]
    fn formats() {
        assert_eq!(GraphFormat::from_path("a/b.bin").unwrap(), GraphFormat::BinaryAdjacency);
        assert_eq!(GraphFormat::from_path("g.BEL").unwrap(), GraphFormat::BinaryEdgeList);
        assert_eq!(GraphFormat::from_path("g.txt").unwrap(), GraphFormat::Text);
        assert_eq!(GraphFormat::from_path("g.csv").unwrap(), GraphFormat::Csv);
        assert!(matches!(GraphFormat::from_path("g"), Err(Error::UnknownFormat(_))));
        assert!(matches!(GraphFormat::from_path("g.gml"), Err(Error::UnknownFormat(_))));
    }

    #[test]
    fn round_trip_every_format() {
        let dir = tempdir().unwrap();
        let expected = sample_adjacency();

        for name in ["g.bin", "g.bel", "g.txt", "g.csv"] {
            let path = dir.path().join(name);

            let mut writer = create_writer(&path).unwrap();
            writer.write_next_part(&expected).unwrap();
            writer.finish().unwrap();
            drop(writer);

            let mut reader = open_reader_with_buffer(&path, 4).unwrap();
            let mut read = reader.read_entire().unwrap();
            for targets in read.values_mut() {
                targets.sort_unstable();
            }

            let mut sorted = expected.clone();
            for targets in sorted.values_mut() {
                targets.sort_unstable();
            }
            assert_eq!(read, sorted, "{}", name);
        }
    }

    #[test]
    fn write_graph_keeps_isolated_vertices() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("g.bin");
        let graph = AdjacencyGraph::from_edges(5, [Edge::new(0, 1), Edge::new(3, 3)]);

        let mut writer = create_writer(&path).unwrap();
        writer.write_graph(&graph).unwrap();
        writer.finish().unwrap();
        drop(writer);

        let read = open_reader(&path).unwrap().read_entire().unwrap();
        let rebuilt = AdjacencyGraph::from_adjacency(&read);
        assert_eq!(DirectedGraph::vertex_count(&rebuilt), 5);
        assert_eq!(rebuilt.edge_count(), 2);
        assert!(rebuilt.contains_edge(3, 3));
        assert_eq!(read.get(&4), Some(&vec![]));
    }

    #[test]
    fn merge() {
        let mut a = sample_adjacency();
        let mut b = AdjacencyList::new();
        b.insert(0, vec![4]);
        b.insert(7, vec![]);

        merge_into(&mut a, b);
        assert_eq!(a[&0], vec![1, 2, 3, 4]);
        assert!(a[&7].is_empty());
        assert_eq!(edge_count(&a), 8);
    }
}
