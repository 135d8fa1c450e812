//! Tally-Sales
//! ---
//! Per-store statistics over large pipe-delimited point-of-sale transaction logs.
//!
//! What is it?
//! ---
//! Tally-Sales cuts a transaction log into partitions, parses and aggregates every
//! partition on its own worker, and folds the partial results into one `SalesStats`: the
//! distinct stores, the distinct baskets and the store they were bought in, and the total
//! sales value of every store.  A malformed line aborts the whole run; there is no partial
//! result.
//!
//! Example - Sales per Store
//! ---
//!
//! ```rust
//! use tally_sales::config::Config;
//! use tally_sales::job::SalesJob;
//! use tally_sales::report::sales_per_store;
//!
//! let lines = vec![
//!     "StoreCode|StoreName|ProductCode|ItemSeqNo|UnitPrice|Quantity|SalesValue|Weighted|TillNo|TransactionId|SalesDate",
//!     "1|StoreA|100|1|2.0|1|2.0|true|10|500|2024-01-01",
//!     "1|StoreA|101|2|3.0|1|3.0|true|10|500|2024-01-01",
//!     "2|StoreB|102|1|5.0|2|10.0|false|20|600|2024-01-02",
//! ];
//!
//! let job = SalesJob::new(Config { workers: 2, ..Config::default() }).unwrap();
//! let run = job.run_lines(lines.into_iter().map(String::from).collect()).unwrap();
//!
//! assert_eq!(run.stats.distinct_baskets(), 2);
//! let sales = sales_per_store(&run.stats);
//! assert_eq!(sales[0].store_name, "StoreB");
//! assert_eq!(sales[1].total, 5.0);
//! ```

#[macro_use]
extern crate log;

/// Parsing of single transaction log lines
pub mod record;

/// Basket identity
pub mod basket;

/// Partial and global aggregates
pub mod stats;

/// Partitioning of the input and the map step
pub mod input;

/// Runs a complete aggregation
pub mod job;

/// Sorted views over a finished aggregate
pub mod report;

/// Atomic report file output
pub mod sink;

/// Run settings
pub mod config;

/// Error types
pub mod error;

pub use config::{Config, SchedulerKind};
pub use error::{Result, SalesError};
pub use job::{SalesJob, SalesRun};
pub use stats::SalesStats;
