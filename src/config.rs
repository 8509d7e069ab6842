//! Run configuration and its validation.

use flate2::Compression;
use serde::Serialize;

use std::path::PathBuf;

use crate::chunker::{DEFAULT_CHUNK_SIZE, RECORD_LINES};
use crate::errors::*;
use crate::range::PoreRange;
use crate::scheduler::{DuplicatePolicy, FilterSettings, PoolSizes};

/// Default gzip level of output files.
pub const DEFAULT_COMPRESSION: u32 = 6;

/// Settings for one run, as given by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    pub input_folder: PathBuf,
    pub output_folder: PathBuf,
    /// Pore range written as `"start-stop"`.
    pub range: String,
    /// Total number of threads.
    pub threads: usize,
    /// Number of files processed at the same time.
    pub parallel: usize,
    /// Lines per chunk.
    pub chunk_size: usize,
    pub compression: u32,
    pub duplicate_policy: DuplicatePolicy,
}

impl Config {
    /// Configuration with the default thread counts, chunk size, and compression.
    pub fn new(
        input_folder: impl Into<PathBuf>,
        output_folder: impl Into<PathBuf>,
        range: impl Into<String>,
    ) -> Self {
        Self {
            input_folder: input_folder.into(),
            output_folder: output_folder.into(),
            range: range.into(),
            threads: num_cpus::get(),
            parallel: num_cpus::get(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            compression: DEFAULT_COMPRESSION,
            duplicate_policy: DuplicatePolicy::default(),
        }
    }

    /// Check every setting before any file is touched.
    pub fn validate(&self) -> Result<ValidConfig> {
        let range = PoreRange::parse(&self.range)?;
        let pool_sizes = PoolSizes::new(self.threads, self.parallel)?;

        if self.chunk_size == 0 || self.chunk_size % RECORD_LINES != 0 {
            return Err(Error::InvalidConfig {
                field: "chunk size",
                reason: format!(
                    "{} is not a positive multiple of {RECORD_LINES}",
                    self.chunk_size
                ),
            });
        }
        if self.compression > 9 {
            return Err(Error::InvalidConfig {
                field: "compression",
                reason: format!("level {} is not between 0 and 9", self.compression),
            });
        }

        Ok(ValidConfig {
            input_folder: self.input_folder.clone(),
            output_folder: self.output_folder.clone(),
            pool_sizes,
            settings: FilterSettings {
                range,
                chunk_size: self.chunk_size,
                duplicate_policy: self.duplicate_policy,
            },
            compression: Compression::new(self.compression),
        })
    }
}

/// A checked [`Config`].
#[derive(Debug, Clone)]
pub struct ValidConfig {
    pub input_folder: PathBuf,
    pub output_folder: PathBuf,
    pub pool_sizes: PoolSizes,
    pub settings: FilterSettings,
    pub compression: Compression,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::new("in", "out", "0-256");
        assert_eq!(config.chunk_size, 4000);
        assert!(config.threads >= 1);

        let valid = config.validate().unwrap();
        assert_eq!(valid.settings.range, PoreRange::new(0, 256).unwrap());
        assert_eq!(valid.settings.duplicate_policy, DuplicatePolicy::KeepLast);
        assert_eq!(valid.compression, Compression::new(6));
        assert_eq!(valid.pool_sizes.chunk_workers(), 1);
    }

    #[test]
    fn invalid_range() {
        let config = Config::new("in", "out", "300-10");
        assert!(matches!(config.validate(), Err(Error::InvalidRange { .. })));
    }

    #[test]
    fn invalid_numbers() {
        let mut config = Config::new("in", "out", "0-256");
        config.chunk_size = 10;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig { field: "chunk size", .. })
        ));

        let mut config = Config::new("in", "out", "0-256");
        config.parallel = 0;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig { field: "parallel", .. })
        ));

        let mut config = Config::new("in", "out", "0-256");
        config.compression = 10;
        assert!(config.validate().is_err());
    }
}
