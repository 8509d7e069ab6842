use flate2::{read::MultiGzDecoder, write::GzEncoder, Compression};

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::errors::*;
use crate::filter::FilteredSet;

/// Where a batch of lines came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    File(PathBuf),
    Bytes,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Origin::*;
        match self {
            File(file) => write!(f, "file: {:?}", file),
            Bytes => write!(f, "bytes"),
        }
    }
}

/// A single fastq record: header, sequence, separator, and quality lines without their line
/// terminators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    lines: [String; 4],
    idx: usize,
}

impl Record {
    /// Build a record from four raw lines. `idx` is the position of the record in its input.
    pub fn new(lines: &[String], idx: usize) -> Self {
        assert_eq!(lines.len(), 4, "A fastq record must have exactly four lines");

        Self {
            lines: [
                strip_line_end(&lines[0]).to_owned(),
                strip_line_end(&lines[1]).to_owned(),
                strip_line_end(&lines[2]).to_owned(),
                strip_line_end(&lines[3]).to_owned(),
            ],
            idx,
        }
    }

    pub fn header(&self) -> &str {
        &self.lines[0]
    }

    pub fn seq(&self) -> &str {
        &self.lines[1]
    }

    pub fn separator(&self) -> &str {
        &self.lines[2]
    }

    pub fn qual(&self) -> &str {
        &self.lines[3]
    }

    pub fn lines(&self) -> &[String; 4] {
        &self.lines
    }

    /// Position of the record (not the line) in its input, starting from zero.
    pub fn idx(&self) -> usize {
        self.idx
    }
}

fn strip_line_end(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Open a fastq file for reading line by line, decompressing it if the name ends with `.gz`.
pub fn open_lines(path: impl AsRef<Path>) -> Result<Box<dyn BufRead + Send>> {
    let path = path.as_ref();
    let file =
        File::open(path).map_err(|e| Error::file_io(Origin::File(path.to_owned()), e))?;

    let reader: Box<dyn BufRead + Send> = if path.to_string_lossy().ends_with(".gz") {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    Ok(reader)
}

pub fn write_fastq_record(writer: &mut impl Write, record: &Record) -> std::io::Result<()> {
    for line in record.lines() {
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Write every record of a filtered set to a gzip-compressed fastq file, replacing the file if
/// it exists.
///
/// Records are written in the order they appeared in the input.
pub fn write_filtered(
    path: impl AsRef<Path>,
    filtered: &FilteredSet,
    compression: Compression,
) -> Result<()> {
    let path = path.as_ref();
    let io_err = |e: std::io::Error| Error::file_io(Origin::File(path.to_owned()), e);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut writer = BufWriter::new(GzEncoder::new(
        File::create(path).map_err(io_err)?,
        compression,
    ));

    for record in filtered.sorted_records() {
        write_fastq_record(&mut writer, record).map_err(io_err)?;
    }

    let encoder = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
    encoder.finish().map_err(io_err)?;
    Ok(())
}
