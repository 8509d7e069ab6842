//! Split nanopore reads based on the channel they were sequenced on.
//!
//! # Overview
//! Nanopore basecallers annotate every fastq header with the channel (pore) that produced the
//! read:
//! ```text
//! @b13de425-8e68-4cb7-a946-e524ac5ae492 runid=97039b6e read=45559 ch=270 start_time=2022-06-16T00:20:20Z
//! ```
//! `pore_splitter` keeps the reads whose `ch=` value lies inside an inclusive pore range, for
//! every fastq file found under an input folder, and writes one gzip-compressed fastq file per
//! sample to an output folder.
//!
//! ## Parallelism
//! Files are processed concurrently by a [`FileScheduler`]. Each file is split into chunks of
//! records by a [`RecordChunker`] and the chunks are filtered concurrently by a
//! [`ChunkScheduler`], which merges the per-chunk results in chunk order before the file is
//! written. The thread budget is split between the two levels by [`PoolSizes`].
//!
//! ## Example
//! ```no_run
//! use pore_splitter::*;
//!
//! let mut config = Config::new("reads/", "filtered/", "0-256");
//! config.threads = 8;
//! config.parallel = 2;
//!
//! let summary = run(&config).unwrap_or_else(|e| panic!("{e}"));
//! println!("kept {} of {} reads", summary.written, summary.records);
//! ```

use serde::Serialize;
use tracing::info;

pub mod chunker;
pub mod config;
pub mod discover;
pub mod errors;
pub mod fastq;
pub mod filter;
pub mod header;
pub mod range;
pub mod scheduler;

// commonly used functions and types

pub use crate::chunker::*;
pub use crate::config::*;
pub use crate::discover::*;
pub use crate::errors::*;
pub use crate::fastq::*;
pub use crate::filter::*;
pub use crate::header::*;
pub use crate::range::*;
pub use crate::scheduler::*;

/// Result of filtering every input file.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub config: Config,
    pub files: Vec<FileSummary>,
    /// Whole records read over all files.
    pub records: usize,
    /// Records written over all files.
    pub written: usize,
}

/// Filter every fastq file under the input folder.
///
/// The configuration is checked and the inputs are listed before any file is processed.
pub fn run(config: &Config) -> Result<RunSummary> {
    let valid = config.validate()?;
    let inputs = list_fastq_files(&valid.input_folder)?;

    info!(
        "Filtering {} fastq files for pore range {} with {} file workers of {} threads",
        inputs.len(),
        valid.settings.range,
        valid.pool_sizes.file_workers(),
        valid.pool_sizes.chunk_workers()
    );

    let scheduler = FileScheduler::new(
        valid.pool_sizes,
        valid.settings,
        &valid.output_folder,
        valid.compression,
    )?;
    let files = scheduler.run(&inputs)?;

    let summary = RunSummary {
        config: config.clone(),
        records: files.iter().map(|f| f.records).sum(),
        written: files.iter().map(|f| f.written).sum(),
        files,
    };
    info!(
        "Kept {} of {} reads from {} files",
        summary.written,
        summary.records,
        summary.files.len()
    );

    Ok(summary)
}
