use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde_derive::Deserialize;

use crate::error::{Result, SalesError};
use crate::record::{Dialect, DEFAULT_DELIMITER, DEFAULT_HEADER_LITERAL};

/// Transactions file used when none is given
pub const DEFAULT_INPUT: &str = "TestData/TestData1.csv";

/// Smallest partition the default sizing will cut
pub const MIN_CHUNK_SIZE: u64 = 64 * 1024;

const PARTITIONS_PER_WORKER: usize = 4;

/// How partitions are executed and reduced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerKind {
    /// Worker pool; finished partitions are reduced over a channel by a single reducer
    Pooled,

    /// Rayon workers merging into a mutex-guarded aggregate
    Parallel
}

impl Default for SchedulerKind {
    fn default() -> Self {
        SchedulerKind::Pooled
    }
}

/// Settings for one run.  Every field has a default, so a TOML file only needs the keys
/// it changes.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub input: PathBuf,

    /// Where report files go.  Unset means next to the input file.
    pub output_dir: Option<PathBuf>,
    pub workers: usize,

    /// Bytes per partition.  Unset means about four partitions per worker.
    pub chunk_size: Option<u64>,
    pub delimiter: char,
    pub header_literal: String,
    pub scheduler: SchedulerKind,
    pub basket_items: bool,
    pub write_stores: bool,
    pub write_baskets: bool
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input: PathBuf::from(DEFAULT_INPUT),
            output_dir: None,
            workers: num_cpus::get(),
            chunk_size: None,
            delimiter: DEFAULT_DELIMITER,
            header_literal: DEFAULT_HEADER_LITERAL.to_owned(),
            scheduler: SchedulerKind::default(),
            basket_items: true,
            write_stores: true,
            write_baskets: true
        }
    }
}

impl Config {

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(|e| SalesError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| SalesError::io(path, e))?;
        Config::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(SalesError::Config("workers must be at least 1".into()));
        }
        if self.chunk_size == Some(0) {
            return Err(SalesError::Config("chunk_size must be at least 1".into()));
        }
        if self.delimiter == '\n' || self.delimiter == '\r' {
            return Err(SalesError::Config("delimiter cannot be a line terminator".into()));
        }
        if self.header_literal.is_empty() {
            return Err(SalesError::Config("header_literal cannot be empty".into()));
        }
        Ok(())
    }

    pub fn dialect(&self) -> Dialect {
        Dialect::new(self.delimiter, &self.header_literal)
    }

    /// Directory the report files are written to.
    pub fn output_dir(&self) -> PathBuf {
        match self.output_dir {
            Some(ref dir) => dir.clone(),
            None => match self.input.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from(".")
            }
        }
    }

    /// Number of partitions the input is cut into when the size is left to the job.
    pub fn partition_target(&self) -> usize {
        self.workers.max(1).saturating_mul(PARTITIONS_PER_WORKER)
    }

    /// Partition size for an input of `file_size` bytes.
    pub fn chunk_size_for(&self, file_size: u64) -> u64 {
        match self.chunk_size {
            Some(size) => size.max(1),
            None => {
                let parts = self.partition_target() as u64;
                (file_size / parts + 1).max(MIN_CHUNK_SIZE)
            }
        }
    }
}
