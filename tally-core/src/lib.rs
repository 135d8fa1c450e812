//! tally
//!
//! `tally` provides the primitives for running partitioned map-reduce aggregations
//! concurrently across a local machine.
//!
//! What is it?
//! ---
//!
//! A job is a list of partitions and a map function.  Every partition is mapped exactly
//! once, on one worker, into a partial aggregate that nothing else touches.  Each finished
//! partial is then folded exactly once into a single global aggregate.  The map phase
//! never blocks on another worker; the only serialized step is the per-partition merge,
//! so contention grows with the number of partitions, not the number of records.
//!
//! How to Use It?
//! ---
//!
//! 1. `split` - Cut a large text file into byte-range `Chunk`s, each of which yields whole
//!    lines.
//! 2. `Aggregate` - Describe how two partial results combine.
//! 3. `Scheduler` - Run the map function over the partitions and reduce the results.
//!
//! Example - Word Count
//! ---
//! ```rust
//! use std::collections::HashMap;
//! use tally::aggregate::{merge_with, Aggregate};
//! use tally::scheduler::{PooledScheduler, Scheduler};
//!
//! #[derive(Default)]
//! struct Words(HashMap<String, usize>);
//!
//! impl Aggregate for Words {
//!     fn merge(&mut self, other: Self) {
//!         merge_with(&mut self.0, other.0, |acc, n| *acc += n);
//!     }
//! }
//!
//! let parts = vec!["a b", "b c", "c c"];
//! let words = PooledScheduler::new(2)
//!     .compute(parts, |_idx, text: &'static str| -> Result<Words, std::io::Error> {
//!         let mut out = Words::default();
//!         for w in text.split_whitespace() {
//!             *out.0.entry(w.to_owned()).or_insert(0) += 1;
//!         }
//!         Ok(out)
//!     })
//!     .unwrap();
//! assert_eq!(words.0["c"], 3);
//! ```

#![warn(missing_docs)]

#[macro_use]
extern crate log;

/// Contains the Aggregate trait and map merging rules
pub mod aggregate;

/// Contains Scheduler trait definition and implementations
pub mod scheduler;

/// Byte-range partitioning of text files
pub mod split;

pub use aggregate::Aggregate;
pub use scheduler::{JobError, ParallelScheduler, Partition, PooledScheduler, Scheduler};
pub use split::{line_number_at, split_file, Chunk, ChunkLines};
