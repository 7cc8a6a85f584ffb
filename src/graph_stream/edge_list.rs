//! Binary edge lists: one `(source, target)` pair of little endian `i32` per edge.
//!
//! A vertex without out-edges is stored as `(source, EMPTY)`.

use super::binary::{decode, EMPTY};
use super::{
    read_up_to, to_record_int, AdjacencyList, GraphReader, GraphWriter, DEFAULT_BUFFER_INTS,
};
use crate::error::Result;
use crate::Node;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::warn;

const PAIR_BYTES: u64 = 8;

pub struct BinaryEdgeListReader<R: Read + Seek> {
    reader: R,
    bytes: Vec<u8>,
    position: u64,
    len: u64,
}

impl BinaryEdgeListReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> BinaryEdgeListReader<R> {
    pub fn new(reader: R) -> Result<Self> {
        Self::with_buffer(reader, DEFAULT_BUFFER_INTS)
    }

    /// A single read covers at most `buffer_ints / 2` edges, and at least one.
    pub fn with_buffer(mut reader: R, buffer_ints: usize) -> Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        Ok(Self {
            reader,
            bytes: vec![0; (buffer_ints / 2).max(1) * PAIR_BYTES as usize],
            position: 0,
            len,
        })
    }
}

impl<R: Read + Seek> GraphReader for BinaryEdgeListReader<R> {
    fn read_adjacency_list(&mut self) -> Result<Option<AdjacencyList>> {
        if self.position >= self.len {
            return Ok(None);
        }

        let read = read_up_to(&mut self.reader, &mut self.bytes)?;
        let pairs = read / PAIR_BYTES as usize;
        if pairs == 0 {
            self.position = self.len;
            return Ok(None);
        }

        let mut adjacency = AdjacencyList::new();
        for pair in self.bytes[..pairs * PAIR_BYTES as usize].chunks_exact(PAIR_BYTES as usize) {
            let (source, target) = (decode(&pair[..4]), decode(&pair[4..]));
            if source < 0 {
                warn!(source, target, "skipping edge with a negative source");
                continue;
            }

            let targets = adjacency.entry(source as Node).or_default();
            match target {
                EMPTY => {}
                t if t < 0 => warn!(source, target = t, "skipping edge with a negative target"),
                t => targets.push(t as Node),
            }
        }

        self.position += pairs as u64 * PAIR_BYTES;
        if pairs * PAIR_BYTES as usize != read {
            self.reader.seek(SeekFrom::Start(self.position))?;
        }

        Ok(Some(adjacency))
    }

    fn reset(&mut self) -> Result<()> {
        self.position = 0;
        self.reader.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn set_position(&mut self, position: u64) -> Result<()> {
        self.position = position.min(self.len);
        self.calibrate()
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn calibrate(&mut self) -> Result<()> {
        let misalignment = self.position % PAIR_BYTES;
        if misalignment != 0 {
            self.position = (self.position + PAIR_BYTES - misalignment).min(self.len);
        }
        self.reader.seek(SeekFrom::Start(self.position))?;
        Ok(())
    }
}

pub struct BinaryEdgeListWriter<W: Write> {
    writer: W,
}

impl<W: Write> BinaryEdgeListWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    fn write_pair(&mut self, source: i32, target: i32) -> Result<()> {
        self.writer.write_all(&source.to_le_bytes())?;
        self.writer.write_all(&target.to_le_bytes())?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> GraphWriter for BinaryEdgeListWriter<W> {
    fn write_record(&mut self, source: Node, targets: &[Node]) -> Result<()> {
        let source = to_record_int(source)?;
        if targets.is_empty() {
            return self.write_pair(source, EMPTY);
        }
        for &t in targets {
            self.write_pair(source, to_record_int(t)?)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
