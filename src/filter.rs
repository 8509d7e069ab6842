use rustc_hash::FxHashMap;

use std::sync::Arc;

use crate::chunker::{Chunk, RECORD_LINES};
use crate::errors::*;
use crate::fastq::{Origin, Record};
use crate::header::HeaderFields;
use crate::range::PoreRange;

/// Records that passed the channel filter, keyed by read id.
///
/// Inserting a record whose id is already present replaces the old record; the id is then
/// remembered as a duplicate.
#[derive(Debug, Clone, Default)]
pub struct FilteredSet {
    records: FxHashMap<String, Record>,
    duplicates: Vec<String>,
}

impl FilteredSet {
    /// Insert a record under its read id, replacing any record already stored for that id.
    pub fn insert(&mut self, id: String, record: Record) {
        if self.records.insert(id.clone(), record).is_some() {
            self.duplicates.push(id);
        }
    }

    /// Merge another set into this one, its records replacing ours on id collisions.
    pub fn merge(&mut self, other: FilteredSet) {
        self.duplicates.extend(other.duplicates);
        for (id, record) in other.records {
            self.insert(id, record);
        }
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(|id| id.as_str())
    }

    /// Ids that were replaced at least once, in the order the replacements happened.
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    /// Records ordered by their position in the input.
    pub fn sorted_records(&self) -> Vec<&Record> {
        let mut records = self.records.values().collect::<Vec<_>>();
        records.sort_unstable_by_key(|r| r.idx());
        records
    }
}

/// Record counts for one filtered chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkStats {
    pub records: usize,
    pub kept: usize,
    /// Lines at the end of the chunk that do not form a whole record.
    pub discarded_lines: usize,
}

impl ChunkStats {
    pub fn merge(&mut self, other: &ChunkStats) {
        self.records += other.records;
        self.kept += other.kept;
        self.discarded_lines += other.discarded_lines;
    }
}

/// Keeps the records of a chunk whose channel lies inside a pore range.
#[derive(Debug, Clone)]
pub struct ChannelFilter {
    range: PoreRange,
    origin: Arc<Origin>,
}

impl ChannelFilter {
    pub fn new(range: PoreRange, origin: Arc<Origin>) -> Self {
        Self { range, origin }
    }

    pub fn range(&self) -> PoreRange {
        self.range
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Filter the records of a chunk.
    ///
    /// Fails on the first record whose header has no usable `ch=` annotation.
    pub fn filter(&self, chunk: &Chunk) -> Result<(FilteredSet, ChunkStats)> {
        let mut filtered = FilteredSet::default();
        let mut stats = ChunkStats::default();

        let records = chunk.lines.chunks_exact(RECORD_LINES);
        stats.discarded_lines = records.remainder().len();

        for (i, lines) in records.enumerate() {
            let idx = chunk.first_record + i;
            stats.records += 1;

            let header = lines[0].trim_end_matches(['\n', '\r']);
            let fields = HeaderFields::parse(header).map_err(|e| self.parse_error(idx, e))?;
            let channel = fields.channel().map_err(|e| self.parse_error(idx, e))?;

            if self.range.contains(channel) {
                stats.kept += 1;
                filtered.insert(fields.id().to_owned(), Record::new(lines, idx));
            }
        }

        Ok((filtered, stats))
    }

    fn parse_error(&self, idx: usize, source: HeaderError) -> Error {
        Error::ParseRecord {
            origin: (*self.origin).clone(),
            idx,
            source,
        }
    }
}
