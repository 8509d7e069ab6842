//! Two levels of parallelism: several input files at once, and several chunks of each file at
//! once.
//!
//! A [`FileScheduler`] runs `parallel` file workers. Each file worker owns a [`ChunkScheduler`]
//! with its own chunk pool of `threads / parallel` threads, so at most `threads` chunks are
//! filtered at the same time.

use flate2::Compression;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crate::chunker::RecordChunker;
use crate::discover::{check_sample_names, sample_name};
use crate::errors::*;
use crate::fastq::{open_lines, write_filtered, Origin};
use crate::filter::{ChannelFilter, ChunkStats, FilteredSet};
use crate::range::PoreRange;

/// What to do when the same read id passes the filter more than once in a file.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Keep the record that comes last in the input.
    #[default]
    KeepLast,
    /// Fail the file.
    Fail,
}

/// How the CPU budget is split between file workers and chunk workers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PoolSizes {
    threads: usize,
    parallel: usize,
}

impl PoolSizes {
    pub fn new(threads: usize, parallel: usize) -> Result<Self> {
        if threads == 0 {
            return Err(Error::InvalidConfig {
                field: "threads",
                reason: "must be at least 1".to_owned(),
            });
        }
        if parallel == 0 {
            return Err(Error::InvalidConfig {
                field: "parallel",
                reason: "must be at least 1".to_owned(),
            });
        }

        Ok(Self { threads, parallel })
    }

    /// Number of files processed at the same time.
    pub fn file_workers(&self) -> usize {
        self.parallel
    }

    /// Number of chunk threads per file worker.
    pub fn chunk_workers(&self) -> usize {
        (self.threads / self.parallel).max(1)
    }
}

/// Settings shared by every chunk of every file.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FilterSettings {
    pub range: PoreRange,
    /// Lines per chunk, a multiple of 4.
    pub chunk_size: usize,
    pub duplicate_policy: DuplicatePolicy,
}

/// Filters the chunks of one input on a dedicated thread pool and merges the results.
pub struct ChunkScheduler {
    pool: ThreadPool,
    settings: FilterSettings,
}

impl ChunkScheduler {
    pub fn new(pool: ThreadPool, settings: FilterSettings) -> Self {
        Self { pool, settings }
    }

    /// Create a scheduler with its own pool of `threads` threads.
    pub fn with_threads(threads: usize, settings: FilterSettings) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("chunk-worker-{i}"))
            .build()?;
        Ok(Self::new(pool, settings))
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// Filter a fastq file, which may be gzip-compressed.
    pub fn filter_file(&self, path: impl AsRef<Path>) -> Result<(FilteredSet, ChunkStats)> {
        let path = path.as_ref();
        let reader = open_lines(path)?;
        self.filter_reader(reader, Arc::new(Origin::File(path.to_owned())))
    }

    /// Filter fastq records from a byte slice.
    pub fn filter_bytes(&self, bytes: &[u8]) -> Result<(FilteredSet, ChunkStats)> {
        self.filter_reader(bytes, Arc::new(Origin::Bytes))
    }

    /// Split the input into chunks, filter every chunk on the pool, and merge the results in
    /// chunk order.
    ///
    /// Chunks are read on the calling thread. All chunks are filtered before anything is merged.
    /// If several chunks fail, the error of the earliest chunk is returned.
    pub fn filter_reader<R: BufRead>(
        &self,
        reader: R,
        origin: Arc<Origin>,
    ) -> Result<(FilteredSet, ChunkStats)> {
        let filter = ChannelFilter::new(self.settings.range, Arc::clone(&origin));
        let (tx, rx) = crossbeam_channel::unbounded();

        let read_res = self.pool.in_place_scope(|s| -> Result<()> {
            let chunks = RecordChunker::new(reader, Arc::clone(&origin), self.settings.chunk_size);

            for chunk in chunks {
                let chunk = chunk?;
                let tx = tx.clone();
                let filter = &filter;

                s.spawn(move |_| {
                    let res = filter.filter(&chunk);
                    if let Ok((_, stats)) = &res {
                        debug!(
                            "Chunk {} of {}: kept {} of {} records",
                            chunk.idx,
                            filter.origin(),
                            stats.kept,
                            stats.records
                        );
                    }
                    let _ = tx.send((chunk.idx, res));
                });
            }

            Ok(())
        });
        drop(tx);
        read_res?;

        let mut results = rx.into_iter().collect::<Vec<_>>();
        results.sort_unstable_by_key(|(idx, _)| *idx);

        let mut filtered = FilteredSet::default();
        let mut stats = ChunkStats::default();

        for (_, res) in results {
            let (chunk_filtered, chunk_stats) = res?;
            stats.merge(&chunk_stats);
            filtered.merge(chunk_filtered);
        }

        if stats.discarded_lines > 0 {
            warn!(
                "Discarded {} trailing lines in {} that do not form a whole record",
                stats.discarded_lines, origin
            );
        }

        if let Some(id) = filtered.duplicates().first() {
            match self.settings.duplicate_policy {
                DuplicatePolicy::KeepLast => warn!(
                    "{} duplicate read ids in {} (first: \"{}\"), keeping the last record of each",
                    filtered.duplicates().len(),
                    origin,
                    id
                ),
                DuplicatePolicy::Fail => {
                    return Err(Error::DuplicateId {
                        origin: (*origin).clone(),
                        id: id.clone(),
                    })
                }
            }
        }

        Ok((filtered, stats))
    }
}

/// Result of filtering one input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub sample: String,
    /// Whole records read.
    pub records: usize,
    /// Records inside the pore range, duplicates included.
    pub kept: usize,
    /// Records written to the output file.
    pub written: usize,
    pub duplicates: usize,
    pub discarded_lines: usize,
}

/// Processes whole files concurrently, one file per worker.
pub struct FileScheduler {
    workers: Vec<ChunkScheduler>,
    output_folder: PathBuf,
    compression: Compression,
}

impl FileScheduler {
    /// Create `sizes.file_workers()` file workers, each with a chunk pool of
    /// `sizes.chunk_workers()` threads.
    pub fn new(
        sizes: PoolSizes,
        settings: FilterSettings,
        output_folder: impl Into<PathBuf>,
        compression: Compression,
    ) -> Result<Self> {
        let workers = (0..sizes.file_workers())
            .map(|w| -> Result<ChunkScheduler> {
                let pool = ThreadPoolBuilder::new()
                    .num_threads(sizes.chunk_workers())
                    .thread_name(move |i| format!("chunk-worker-{w}-{i}"))
                    .build()?;
                Ok(ChunkScheduler::new(pool, settings))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::with_workers(workers, output_folder, compression))
    }

    /// Use the given chunk schedulers as file workers.
    pub fn with_workers(
        workers: Vec<ChunkScheduler>,
        output_folder: impl Into<PathBuf>,
        compression: Compression,
    ) -> Self {
        assert!(!workers.is_empty(), "Number of file workers must be greater than zero");

        Self {
            workers,
            output_folder: output_folder.into(),
            compression,
        }
    }

    pub fn file_workers(&self) -> usize {
        self.workers.len()
    }

    /// Path of the output file for a sample.
    pub fn output_path(&self, sample: &str) -> PathBuf {
        self.output_folder.join(format!("{sample}.fastq.gz"))
    }

    /// Filter one file with the given worker and write the result.
    pub fn process_file(&self, worker: &ChunkScheduler, input: &Path) -> Result<FileSummary> {
        let sample = sample_name(input);
        let output = self.output_path(&sample);

        let (filtered, stats) = worker.filter_file(input)?;
        write_filtered(&output, &filtered, self.compression)?;

        info!(
            "Wrote {} of {} records from {:?} to {:?}",
            filtered.len(),
            stats.records,
            input,
            output
        );

        Ok(FileSummary {
            input: input.to_owned(),
            output,
            sample,
            records: stats.records,
            kept: stats.kept,
            written: filtered.len(),
            duplicates: filtered.duplicates().len(),
            discarded_lines: stats.discarded_lines,
        })
    }

    /// Process every input file and wait until all of them are done.
    ///
    /// A failing file does not stop the other files. Once every file is done, each failure is
    /// logged and the first failure in input order is returned.
    pub fn run(&self, inputs: &[PathBuf]) -> Result<Vec<FileSummary>> {
        check_sample_names(inputs)?;

        let next = AtomicUsize::new(0);
        let mut results = thread::scope(|s| -> Result<Vec<(usize, Result<FileSummary>)>> {
            let handles = self
                .workers
                .iter()
                .enumerate()
                .map(|(w, worker)| {
                    let next = &next;
                    thread::Builder::new()
                        .name(format!("file-worker-{w}"))
                        .spawn_scoped(s, move || {
                            let mut done = Vec::new();
                            loop {
                                let i = next.fetch_add(1, Ordering::Relaxed);
                                let Some(input) = inputs.get(i) else {
                                    break;
                                };
                                done.push((i, self.process_file(worker, input)));
                            }
                            done
                        })
                })
                .collect::<std::io::Result<Vec<_>>>()
                .map_err(|e| Error::file_io("file worker thread", e))?;

            let mut results = Vec::with_capacity(inputs.len());
            for handle in handles {
                match handle.join() {
                    Ok(done) => results.extend(done),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            Ok(results)
        })?;
        results.sort_unstable_by_key(|(i, _)| *i);

        let mut summaries = Vec::with_capacity(results.len());
        let mut first_err = None;

        for (i, res) in results {
            match res {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    error!("Failed to process {:?}: {}", inputs[i], e);
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(summaries),
        }
    }
}
