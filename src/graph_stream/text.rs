//! Text adjacency lists: one line per vertex, the source first and its
//! out-neighbours after it.
//!
//! Tokens may be separated by spaces, commas or tabs. A line with a single
//! token is a vertex without out-edges; lines starting with `#` are comments.

use super::{AdjacencyList, GraphReader, GraphWriter};
use crate::error::Result;
use crate::Node;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::warn;

pub const DEFAULT_TOKEN_BUDGET: usize = 1 << 11;

fn is_separator(c: char) -> bool {
    c == ' ' || c == ',' || c == '\t'
}

pub struct TextGraphReader<R: Read + Seek> {
    reader: BufReader<R>,
    line: Vec<u8>,
    token_budget: usize,
    position: u64,
    len: u64,
}

impl TextGraphReader<File> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(File::open(path)?)
    }
}

impl<R: Read + Seek> TextGraphReader<R> {
    pub fn new(inner: R) -> Result<Self> {
        Self::with_buffer(inner, DEFAULT_TOKEN_BUDGET)
    }

    /// A single read stops at the end of the line on which `token_budget` tokens were reached.
    pub fn with_buffer(mut inner: R, token_budget: usize) -> Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;

        Ok(Self {
            reader: BufReader::new(inner),
            line: Vec::new(),
            token_budget: token_budget.max(1),
            position: 0,
            len,
        })
    }

    /// Reads the next line into `self.line`; returns its length in bytes.
    fn next_line(&mut self) -> Result<usize> {
        self.line.clear();
        let read = self.reader.read_until(b'\n', &mut self.line)?;
        self.position += read as u64;
        Ok(read)
    }

    /// Parses the current line into `adjacency`; returns the number of tokens.
    fn parse_line(&self, adjacency: &mut AdjacencyList) -> usize {
        let line = String::from_utf8_lossy(&self.line);
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return 0;
        }

        let mut tokens = line.split(is_separator).filter(|t| !t.is_empty());
        let first = match tokens.next() {
            Some(token) => token,
            None => return 0,
        };

        // an unparsable source drops the whole line
        let source = match first.parse::<Node>() {
            Ok(source) => source,
            Err(_) => {
                warn!(token = first, "skipping line with unparsable source");
                return 1 + tokens.count();
            }
        };

        let mut count = 1;
        let targets = adjacency.entry(source).or_default();
        for token in tokens {
            count += 1;
            match token.parse::<Node>() {
                Ok(target) => targets.push(target),
                Err(_) => warn!(token, source, "skipping unparsable target"),
            }
        }
        count
    }
}

impl<R: Read + Seek> GraphReader for TextGraphReader<R> {
    fn read_adjacency_list(&mut self) -> Result<Option<AdjacencyList>> {
        if self.position >= self.len {
            return Ok(None);
        }

        let mut adjacency = AdjacencyList::new();
        let mut tokens = 0;
        while tokens < self.token_budget {
            if self.next_line()? == 0 {
                self.position = self.len;
                break;
            }
            tokens += self.parse_line(&mut adjacency);
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
        if self.position == 0 || self.position >= self.len {
            self.reader.seek(SeekFrom::Start(self.position))?;
            return Ok(());
        }

        // a preceding newline means we already are at the start of a line
        self.position -= 1;
        self.reader.seek(SeekFrom::Start(self.position))?;
        self.next_line()?;
        Ok(())
    }
}

pub struct TextGraphWriter<W: Write> {
    writer: W,
    separator: char,
}

impl<W: Write> TextGraphWriter<W> {
    pub fn text(writer: W) -> Self {
        Self {
            writer,
            separator: ' ',
        }
    }

    pub fn csv(writer: W) -> Self {
        Self {
            writer,
            separator: ',',
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> GraphWriter for TextGraphWriter<W> {
    fn write_record(&mut self, source: Node, targets: &[Node]) -> Result<()> {
        write!(self.writer, "{}", source)?;
        for t in targets {
            write!(self.writer, "{}{}", self.separator, t)?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
