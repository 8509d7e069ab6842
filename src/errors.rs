use thiserror;

use std::path::PathBuf;

use crate::fastq::Origin;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid pore range \"{range}\": {reason}")]
    InvalidRange { range: String, reason: &'static str },

    #[error("Invalid value for {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("No fastq file found in {0:?}")]
    NoInput(PathBuf),

    #[error("Error searching for fastq files in {dir:?}: {source}")]
    Discovery {
        dir: PathBuf,
        source: walkdir::Error,
    },

    #[error("Input files {first:?} and {second:?} would both be written to sample \"{sample}\"")]
    SampleCollision {
        sample: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Error reading or writing {file}: {source}")]
    FileIo {
        file: String,
        source: std::io::Error,
    },

    #[error("Error parsing record {idx} in {origin}: {source}")]
    ParseRecord {
        origin: Origin,
        idx: usize,
        source: HeaderError,
    },

    #[error("Duplicate read id \"{id}\" in {origin}")]
    DuplicateId { origin: Origin, id: String },

    #[error("Could not start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Reasons a read header cannot provide a read id and channel.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("the header line is empty")]
    Empty,

    #[error("no \"ch=\" annotation in header \"{header}\"")]
    MissingChannel { header: String },

    #[error("channel \"{value}\" is not an integer")]
    InvalidChannel {
        value: String,
        source: std::num::ParseIntError,
    },
}

impl Error {
    pub(crate) fn file_io(file: impl std::fmt::Display, source: std::io::Error) -> Self {
        Error::FileIo {
            file: file.to_string(),
            source,
        }
    }
}
