use std::fs;
use std::time::{Duration, Instant};

use log::Level;
use tally::{ParallelScheduler, Partition, PooledScheduler, Scheduler};

use crate::config::{Config, SchedulerKind};
use crate::error::{Result, SalesError};
use crate::input::{file_partitions, line_partitions, map_partition, MapOptions, SalesPartition};
use crate::stats::SalesStats;

/// Result of a successful run.
#[derive(Clone, Debug)]
pub struct SalesRun {
    pub stats: SalesStats,

    /// Size of the input in bytes
    pub input_bytes: u64,
    pub partitions: usize,
    pub workers: usize,
    pub elapsed: Duration
}

/// Aggregates one transaction log according to a `Config`.
pub struct SalesJob {
    config: Config
}

impl SalesJob {

    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(SalesJob { config: config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Reads the configured input file and aggregates it.
    pub fn run(&self) -> Result<SalesRun> {
        let start = Instant::now();
        let path = self.config.input.as_path();
        if !path.is_file() {
            return Err(SalesError::InputNotFound(path.to_path_buf()));
        }
        let input_bytes = fs::metadata(path).map_err(|e| SalesError::io(path, e))?.len();
        let chunk_size = self.config.chunk_size_for(input_bytes);
        info!("Reading {:?} ({} bytes) in chunks of {} bytes", path, input_bytes, chunk_size);

        let parts = file_partitions(path, chunk_size)?;
        self.execute(parts, input_bytes, start)
    }

    /// Aggregates lines that are already in memory.
    pub fn run_lines(&self, lines: Vec<String>) -> Result<SalesRun> {
        let start = Instant::now();
        let input_bytes = lines.iter().map(|l| l.len() as u64 + 1).sum();
        let parts = line_partitions(lines, self.config.partition_target());
        self.execute(parts, input_bytes, start)
    }

    fn execute(&self, parts: Vec<SalesPartition>, input_bytes: u64, start: Instant) -> Result<SalesRun> {
        let partitions = parts.len();
        let options = MapOptions {
            dialect: self.config.dialect(),
            basket_items: self.config.basket_items
        };
        debug!("Mapping {} partitions with {:?} scheduler, {} workers",
               partitions, self.config.scheduler, self.config.workers);
        if log_enabled!(Level::Debug) {
            let weights: Vec<u64> = parts.iter().map(Partition::weight).collect();
            debug!("Partition weights: min {}, max {}",
                   weights.iter().min().unwrap_or(&0), weights.iter().max().unwrap_or(&0));
        }

        let stats = match self.config.scheduler {
            SchedulerKind::Pooled => {
                compute(&PooledScheduler::new(self.config.workers), parts, options)?
            },
            SchedulerKind::Parallel => {
                let scheduler = ParallelScheduler::with_threads(self.config.workers)
                    .map_err(|e| SalesError::WorkerPool(e.to_string()))?;
                compute(&scheduler, parts, options)?
            }
        };

        let elapsed = start.elapsed();
        info!("Aggregated {} records into {} stores and {} baskets in {:.3}s",
              stats.records, stats.stores.len(), stats.distinct_baskets(), elapsed.as_secs_f64());
        Ok(SalesRun {
            stats: stats,
            input_bytes: input_bytes,
            partitions: partitions,
            workers: self.config.workers,
            elapsed: elapsed
        })
    }
}

fn compute<S>(scheduler: &S, parts: Vec<SalesPartition>, options: MapOptions) -> Result<SalesStats>
        where S: Scheduler {
    let stats = scheduler.compute(parts, move |_idx, part| map_partition(part, &options))?;
    Ok(stats)
}

#[cfg(test)]
mod job_test {
    use super::*;
    use std::path::PathBuf;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(|l| l.to_owned()).collect()
    }

    const LOG: &str = "1|StoreA|100|1|2.0|1|2.0|true|10|500|2024-01-01\n\
                       1|StoreA|101|2|3.0|1|3.0|true|10|500|2024-01-01\n\
                       2|StoreB|102|1|5.0|2|10.0|false|20|600|2024-01-02";

    fn job(kind: SchedulerKind) -> SalesJob {
        SalesJob::new(Config { workers: 3, scheduler: kind, ..Config::default() }).unwrap()
    }

    #[test]
    fn test_both_schedulers_agree() {
        let pooled = job(SchedulerKind::Pooled).run_lines(lines(LOG)).unwrap();
        let parallel = job(SchedulerKind::Parallel).run_lines(lines(LOG)).unwrap();
        assert_eq!(pooled.stats.stores, parallel.stats.stores);
        assert_eq!(pooled.stats.basket_owners, parallel.stats.basket_owners);
        assert_eq!(pooled.stats.sales_per_store, parallel.stats.sales_per_store);
        assert_eq!(pooled.stats.records, 3);
        assert_eq!(pooled.partitions, 3);
    }

    #[test]
    fn test_missing_input() {
        let job = SalesJob::new(Config {
            input: PathBuf::from("/definitely/not/here.csv"),
            ..Config::default()
        }).unwrap();
        match job.run() {
            Err(e @ SalesError::InputNotFound(_)) => assert_eq!(e.exit_code(), 2),
            other => panic!("unexpected: {:?}", other.map(|r| r.stats))
        }
    }

    #[test]
    fn test_malformed_aborts() {
        for kind in &[SchedulerKind::Pooled, SchedulerKind::Parallel] {
            let text = format!("{}\nbroken", LOG);
            match job(*kind).run_lines(lines(&text)) {
                Err(SalesError::Malformed { line, .. }) => assert_eq!(line, 4),
                other => panic!("unexpected: {:?}", other.map(|r| r.stats))
            }
        }
    }

    #[test]
    fn test_blank_line_aborts() {
        for kind in &[SchedulerKind::Pooled, SchedulerKind::Parallel] {
            let text = LOG.replacen('\n', "\n\n", 1);
            match job(*kind).run_lines(lines(&text)) {
                Err(SalesError::Malformed { line, content, .. }) => {
                    assert_eq!(line, 2);
                    assert!(content.is_empty());
                },
                other => panic!("unexpected: {:?}", other.map(|r| r.stats))
            }
        }
    }

    #[test]
    fn test_empty_input() {
        let run = job(SchedulerKind::Pooled).run_lines(Vec::new()).unwrap();
        assert_eq!(run.partitions, 0);
        assert!(run.stats.stores.is_empty());
        assert_eq!(run.stats.distinct_baskets(), 0);
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(SalesJob::new(Config { workers: 0, ..Config::default() }).is_err());
    }
}
