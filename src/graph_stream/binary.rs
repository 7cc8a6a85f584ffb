//! Binary adjacency records: a source vertex, its out-neighbours and an
//! end-of-line marker, all as little endian `i32`.
//!
//! A vertex without out-edges is written as `source, EMPTY, END_OF_LINE`.
//! Bidirectional records put `END_OF_DIRECTION` between the out- and the
//! in-neighbours; readers only keep the out-neighbours.

use super::{
    read_up_to, to_record_int, AdjacencyList, GraphReader, GraphWriter, DEFAULT_BUFFER_INTS,
};
use crate::error::Result;
use crate::Node;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::warn;

pub const END_OF_LINE: i32 = -2;
pub const EMPTY: i32 = -3;
pub const END_OF_DIRECTION: i32 = -4;
pub const START_OF_METADATA: i32 = -5;
pub const START_OF_GRAPH: i32 = -6;

const INT_BYTES: u64 = 4;

pub(crate) fn decode(bytes: &[u8]) -> i32 {
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

pub struct BinaryGraphReader<R: Read + Seek> {
    reader: R,
    bytes: Vec<u8>,
    position: u64,
    len: u64,
}

impl BinaryGraphReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> BinaryGraphReader<R> {
    pub fn new(reader: R) -> Result<Self> {
        Self::with_buffer(reader, DEFAULT_BUFFER_INTS)
    }

    /// A single read covers at most `buffer_ints` integers, plus the rest of a record cut off by
    /// the buffer.
    pub fn with_buffer(mut reader: R, buffer_ints: usize) -> Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        Ok(Self {
            reader,
            bytes: vec![0; buffer_ints.max(1) * INT_BYTES as usize],
            position: 0,
            len,
        })
    }

    /// Reads the next buffer; returns the number of whole integers in it.
    fn fill(&mut self) -> Result<usize> {
        let read = read_up_to(&mut self.reader, &mut self.bytes)?;
        Ok(read / INT_BYTES as usize)
    }

    fn seek_to_position(&mut self) -> Result<()> {
        self.reader.seek(SeekFrom::Start(self.position))?;
        Ok(())
    }
}

impl<R: Read + Seek> GraphReader for BinaryGraphReader<R> {
    fn read_adjacency_list(&mut self) -> Result<Option<AdjacencyList>> {
        if self.position >= self.len {
            return Ok(None);
        }

        let mut adjacency = AdjacencyList::new();
        let mut record: Option<(Node, Vec<Node>)> = None;
        let mut out_direction = true;
        let mut pass = 0;

        loop {
            let ints = self.fill()?;
            if ints == 0 {
                // fewer than four bytes left
                self.position = self.len;
                break;
            }

            let mut consumed = ints;
            for (i, chunk) in self.bytes[..ints * INT_BYTES as usize].chunks_exact(4).enumerate() {
                let value = decode(chunk);

                let (source, targets) = match record.as_mut() {
                    None => {
                        if value < 0 {
                            if value != END_OF_LINE {
                                warn!(
                                    value,
                                    position = self.position,
                                    "skipping marker outside of a record"
                                );
                            }
                            continue;
                        }
                        record = Some((value as Node, Vec::new()));
                        out_direction = true;
                        continue;
                    }
                    Some((source, targets)) => (*source, targets),
                };

                match value {
                    END_OF_LINE => {
                        let targets = std::mem::take(targets);
                        adjacency.entry(source).or_default().extend(targets);
                        record = None;

                        if pass > 0 {
                            consumed = i + 1;
                            break;
                        }
                    }
                    EMPTY => {}
                    END_OF_DIRECTION => out_direction = false,
                    v if v < 0 => warn!(value = v, source, "skipping unknown marker"),
                    v => {
                        if out_direction {
                            targets.push(v as Node);
                        }
                    }
                }
            }

            self.position += consumed as u64 * INT_BYTES;
            self.seek_to_position()?;
            pass += 1;

            if record.is_none() || self.position >= self.len {
                break;
            }
        }

        // a record cut off by the end of the stream still counts
        if let Some((source, targets)) = record {
            adjacency.entry(source).or_default().extend(targets);
        }

        Ok(Some(adjacency))
    }

    fn reset(&mut self) -> Result<()> {
        self.position = 0;
        self.seek_to_position()
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn set_position(&mut self, position: u64) -> Result<()> {
        self.position = position.min(self.len);
        self.seek_to_position()?;
        self.calibrate()
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn calibrate(&mut self) -> Result<()> {
        if self.position == 0 || self.position >= self.len {
            return Ok(());
        }

        // at a boundary, the integer before the next aligned offset ends the previous record
        let mut scan = (self.position + INT_BYTES - 1) / INT_BYTES * INT_BYTES - INT_BYTES;
        self.reader.seek(SeekFrom::Start(scan))?;

        self.position = loop {
            let ints = self.fill()?;
            if ints == 0 {
                break self.len;
            }

            let found = self.bytes[..ints * INT_BYTES as usize]
                .chunks_exact(4)
                .position(|c| decode(c) == END_OF_LINE);

            match found {
                Some(i) => break scan + (i as u64 + 1) * INT_BYTES,
                None => scan += ints as u64 * INT_BYTES,
            }
        };

        self.seek_to_position()
    }
}

pub struct BinaryGraphWriter<W: Write> {
    writer: W,
}

impl<W: Write> BinaryGraphWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    fn write_int(&mut self, value: i32) -> Result<()> {
        self.writer.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn write_vertex(&mut self, vertex: Node) -> Result<()> {
        let value = to_record_int(vertex)?;
        self.write_int(value)
    }

    /// Writes out- and in-neighbours separated by [`END_OF_DIRECTION`].
    pub fn write_bidirectional_record(
        &mut self,
        source: Node,
        out_targets: &[Node],
        in_sources: &[Node],
    ) -> Result<()> {
        self.write_vertex(source)?;
        for &t in out_targets {
            self.write_vertex(t)?;
        }
        self.write_int(END_OF_DIRECTION)?;
        for &s in in_sources {
            self.write_vertex(s)?;
        }
        self.write_int(END_OF_LINE)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> GraphWriter for BinaryGraphWriter<W> {
    fn write_record(&mut self, source: Node, targets: &[Node]) -> Result<()> {
        self.write_vertex(source)?;
        if targets.is_empty() {
            self.write_int(EMPTY)?;
        }
        for &t in targets {
            self.write_vertex(t)?;
        }
        self.write_int(END_OF_LINE)
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::super::test::sample_adjacency;
    use super::*;
    use crate::error::Error;
    use std::io::Cursor;

    fn encoded(adjacency: &AdjacencyList) -> Vec<u8> {
        let mut writer = BinaryGraphWriter::new(Vec::new());
        writer.write_next_part(adjacency).unwrap();
        writer.finish().unwrap();
        writer.into_inner()
    }

    fn ints(bytes: &[u8]) -> Vec<i32> {
        bytes.chunks_exact(4).map(decode).collect()
    }

    #[test]
    fn layout() {
        let bytes = encoded(&sample_adjacency());
        assert_eq!(
            ints(&bytes),
            vec![0, 1, 2, 3, -2, 1, 0, -2, 2, 2, 0, -2, 3, 1, -2, 4, -3, -2]
        );
    }

    #[test]
    fn records_spanning_buffers() {
        let bytes = encoded(&sample_adjacency());
        let mut reader = BinaryGraphReader::with_buffer(Cursor::new(bytes), 3).unwrap();

        let first = reader.read_adjacency_list().unwrap().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[&0], vec![1, 2, 3]);
        assert_eq!(reader.position(), 20);

        let mut all = first;
        while let Some(part) = reader.read_adjacency_list().unwrap() {
            super::super::merge_into(&mut all, part);
        }
        assert_eq!(all, sample_adjacency());
        assert_eq!(reader.position(), reader.len());
    }

    #[test]
    fn calibrate_to_next_record() {
        let bytes = encoded(&sample_adjacency());
        let mut reader = BinaryGraphReader::new(Cursor::new(bytes)).unwrap();

        reader.set_position(21).unwrap();
        assert_eq!(reader.position(), 32);
        let rest = reader.read_adjacency_list().unwrap().unwrap();
        assert_eq!(rest.keys().copied().collect::<Vec<_>>(), vec![2, 3, 4]);

        reader.set_position(32).unwrap();
        assert_eq!(reader.position(), 32);

        reader.set_position(70).unwrap();
        assert_eq!(reader.position(), 72);
        assert!(reader.read_adjacency_list().unwrap().is_none());

        reader.reset().unwrap();
        assert_eq!(reader.read_entire().unwrap(), sample_adjacency());
    }

    #[test]
    fn trailing_partial_int_is_ignored() {
        let mut bytes = encoded(&sample_adjacency());
        bytes.extend_from_slice(&[7, 7]);

        let mut reader = BinaryGraphReader::with_buffer(Cursor::new(bytes), 5).unwrap();
        assert_eq!(reader.read_entire().unwrap(), sample_adjacency());
    }

    #[test]
    fn in_edges_are_skipped() {
        let mut writer = BinaryGraphWriter::new(Vec::new());
        writer.write_bidirectional_record(0, &[1], &[2, 3]).unwrap();
        writer.write_bidirectional_record(1, &[], &[0]).unwrap();
        let bytes = writer.into_inner();
        assert_eq!(ints(&bytes), vec![0, 1, -4, 2, 3, -2, 1, -4, 0, -2]);

        let read = BinaryGraphReader::new(Cursor::new(bytes)).unwrap().read_entire().unwrap();
        assert_eq!(read[&0], vec![1]);
        assert!(read[&1].is_empty());
    }

    #[test]
    fn vertex_out_of_range() {
        let too_large = i32::MAX as Node + 1;
        let mut writer = BinaryGraphWriter::new(Vec::new());
        assert!(matches!(
            writer.write_record(0, &[too_large]),
            Err(Error::VertexOutOfRange(v)) if v == too_large
        ));
    }

    #[test]
    fn empty_stream() {
        let mut reader = BinaryGraphReader::new(Cursor::new(Vec::new())).unwrap();
        assert!(reader.is_empty());
        assert!(reader.read_adjacency_list().unwrap().is_none());
        assert!(reader.read_entire().unwrap().is_empty());
    }
}
