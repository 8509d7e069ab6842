use std::io::BufRead;
use std::sync::Arc;

use crate::errors::*;
use crate::fastq::Origin;

/// Number of lines in a fastq record.
pub const RECORD_LINES: usize = 4;

/// Default number of lines per chunk (1000 records).
pub const DEFAULT_CHUNK_SIZE: usize = 4000;

/// A batch of raw lines that is filtered as one unit of work.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Position of the chunk in its input, starting from zero.
    pub idx: usize,
    /// Position of the first record of the chunk in its input.
    pub first_record: usize,
    /// Raw lines, each still ending with its line terminator (except possibly the last line of
    /// the input).
    pub lines: Vec<String>,
}

/// Lazily split a line source into chunks of `chunk_size` lines.
///
/// Every chunk has exactly `chunk_size` lines except possibly the last one. Lines are only read
/// when the next chunk is requested.
pub struct RecordChunker<R: BufRead> {
    reader: R,
    origin: Arc<Origin>,
    chunk_size: usize,
    idx: usize,
    done: bool,
}

impl<R: BufRead> RecordChunker<R> {
    pub fn new(reader: R, origin: Arc<Origin>, chunk_size: usize) -> Self {
        assert!(
            chunk_size > 0 && chunk_size % RECORD_LINES == 0,
            "Chunk size must be a positive multiple of {RECORD_LINES}"
        );

        Self {
            reader,
            origin,
            chunk_size,
            idx: 0,
            done: false,
        }
    }

    fn read_chunk(&mut self) -> std::io::Result<Vec<String>> {
        let mut lines = Vec::with_capacity(self.chunk_size);

        while lines.len() < self.chunk_size {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                self.done = true;
                break;
            }
            lines.push(line);
        }

        Ok(lines)
    }
}

impl<R: BufRead> Iterator for RecordChunker<R> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let lines = match self.read_chunk() {
            Ok(lines) => lines,
            Err(e) => {
                self.done = true;
                return Some(Err(Error::file_io(&*self.origin, e)));
            }
        };

        if lines.is_empty() {
            return None;
        }

        let chunk = Chunk {
            idx: self.idx,
            first_record: self.idx * (self.chunk_size / RECORD_LINES),
            lines,
        };
        self.idx += 1;
        Some(Ok(chunk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(input: &'static str, chunk_size: usize) -> RecordChunker<&'static [u8]> {
        RecordChunker::new(input.as_bytes(), Arc::new(Origin::Bytes), chunk_size)
    }

    #[test]
    fn exact_multiple() {
        let chunks: Vec<Chunk> = chunker("1\n2\n3\n4\n5\n6\n7\n8\n", 4)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].lines, ["1\n", "2\n", "3\n", "4\n"]);
        assert_eq!(chunks[1].lines, ["5\n", "6\n", "7\n", "8\n"]);
        assert_eq!((chunks[1].idx, chunks[1].first_record), (1, 1));
    }

    #[test]
    fn short_last_chunk() {
        let chunks: Vec<Chunk> = chunker("1\n2\n3\n4\n5\n6", 4)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].lines, ["5\n", "6"]);
    }

    #[test]
    fn first_record_counts_records() {
        let input = "l\n".repeat(40);
        let chunks: Vec<Chunk> = RecordChunker::new(input.as_bytes(), Arc::new(Origin::Bytes), 8)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(chunks.len(), 5);
        assert_eq!(
            chunks.iter().map(|c| c.first_record).collect::<Vec<_>>(),
            [0, 2, 4, 6, 8]
        );
    }

    #[test]
    fn empty_input() {
        assert!(chunker("", 4).next().is_none());
    }

    #[test]
    fn reads_only_up_to_the_chunk_boundary() {
        let mut input: &[u8] = b"1\n2\n3\n4\n5\n";
        let mut chunks = RecordChunker::new(&mut input, Arc::new(Origin::Bytes), 4);
        assert_eq!(chunks.next().unwrap().unwrap().lines.len(), 4);
        drop(chunks);
        assert_eq!(input, b"5\n");
    }

    #[test]
    #[should_panic]
    fn chunk_size_must_hold_whole_records() {
        chunker("", 6);
    }
}
