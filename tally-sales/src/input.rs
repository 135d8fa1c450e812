//! Input Partitioning
//! ---
//! A transaction log reaches the workers either as byte-range chunks of a file or as
//! contiguous runs of lines already in memory.  `map_partition` is the map step of the job:
//! it parses every line of one partition into a fresh `SalesStats`.
//!
//! Bytes that are not valid UTF-8 are decoded as U+FFFD.  A store name keeps the
//! replacement character; a numeric field containing one fails to parse and is reported
//! with its line number like any other malformed line.
use std::path::Path;

use tally::{split_file, line_number_at, Chunk, Partition};

use crate::error::{Result, SalesError};
use crate::record::{Dialect, Parsed};
use crate::stats::SalesStats;

const BOM: char = '\u{FEFF}';

/// Lines assigned to one worker.
#[derive(Clone, Debug, PartialEq)]
pub enum SalesPartition {
    /// Byte range of the input file
    Chunk(Chunk),

    /// In-memory lines; `first_line` is the 1-based number of `lines[0]`
    Lines { first_line: usize, lines: Vec<String> }
}

impl Partition for SalesPartition {
    fn weight(&self) -> u64 {
        match self {
            SalesPartition::Chunk(chunk) => chunk.weight(),
            SalesPartition::Lines { lines, .. } => lines.iter().map(|l| l.len() as u64 + 1).sum()
        }
    }
}

/// What the map step needs besides the partition itself.
#[derive(Clone, Debug, Default)]
pub struct MapOptions {
    pub dialect: Dialect,
    pub basket_items: bool
}

impl MapOptions {

    fn empty_stats(&self) -> SalesStats {
        if self.basket_items {
            SalesStats::with_basket_items()
        } else {
            SalesStats::new()
        }
    }
}

/// Cuts a file into partitions of about `chunk_size` bytes.
pub fn file_partitions(path: &Path, chunk_size: u64) -> Result<Vec<SalesPartition>> {
    let chunks = split_file(path, chunk_size).map_err(|e| SalesError::io(path, e))?;
    Ok(chunks.into_iter().map(SalesPartition::Chunk).collect())
}

/// Cuts in-memory lines into at most `parts` contiguous runs.
pub fn line_partitions(lines: Vec<String>, parts: usize) -> Vec<SalesPartition> {
    if lines.is_empty() {
        return Vec::new();
    }
    let parts = parts.max(1);
    let per_part = lines.len() / parts + if lines.len() % parts == 0 { 0 } else { 1 };

    let mut out = Vec::new();
    let mut first_line = 1;
    let mut rest = lines.into_iter().peekable();
    while rest.peek().is_some() {
        let run: Vec<String> = rest.by_ref().take(per_part).collect();
        let len = run.len();
        out.push(SalesPartition::Lines { first_line: first_line, lines: run });
        first_line += len;
    }
    out
}

/// Parses every line of `part` into a partial aggregate.
///
/// Header rows contribute nothing.  The first malformed line, blank lines included, ends
/// the map with an error naming its line number.
pub fn map_partition(part: SalesPartition, options: &MapOptions) -> Result<SalesStats> {
    let mut stats = options.empty_stats();
    match part {
        SalesPartition::Chunk(chunk) => {
            let path = chunk.path();
            for line in chunk.lines().map_err(|e| SalesError::io(path, e))? {
                let (offset, text) = line.map_err(|e| SalesError::io(path, e))?;
                match options.dialect.parse(&text) {
                    Ok(parsed) => observe(&mut stats, parsed),
                    Err(source) => {
                        let line = line_number_at(path, offset).map_err(|e| SalesError::io(path, e))?;
                        return Err(SalesError::Malformed { line: line, content: text, source: source });
                    }
                }
            }
        },
        SalesPartition::Lines { first_line, lines } => {
            for (i, text) in lines.into_iter().enumerate() {
                let line = first_line + i;
                let parsed = if line == 1 {
                    options.dialect.parse(text.trim_start_matches(BOM))
                } else {
                    options.dialect.parse(&text)
                };
                match parsed {
                    Ok(parsed) => observe(&mut stats, parsed),
                    Err(source) => {
                        return Err(SalesError::Malformed { line: line, content: text, source: source });
                    }
                }
            }
        }
    }
    Ok(stats)
}

fn observe(stats: &mut SalesStats, parsed: Parsed) {
    if let Parsed::Record(record) = parsed {
        stats.observe(record);
    }
}

#[cfg(test)]
mod input_test {
    use super::*;
    use std::io::Write;
    use tally::aggregate::Aggregate;
    use tempfile::NamedTempFile;

    use crate::record::RecordError;

    const LOG: &str = "StoreCode|StoreName|ProductCode|ItemSeqNo|UnitPrice|Quantity|SalesValue|Weighted|TillNo|TransactionId|SalesDate\n\
                       1|StoreA|100|1|2.0|1|2.0|true|10|500|2024-01-01\n\
                       1|StoreA|101|2|3.0|1|3.0|true|10|500|2024-01-01\n\
                       2|StoreB|102|1|5.0|2|10.0|false|20|600|2024-01-02\n";

    fn write_log(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    fn map_all(parts: Vec<SalesPartition>) -> Result<SalesStats> {
        let options = MapOptions { basket_items: true, ..MapOptions::default() };
        let mut global = SalesStats::default();
        for part in parts {
            global.merge(map_partition(part, &options)?);
        }
        Ok(global)
    }

    fn to_lines(text: &str) -> Vec<String> {
        text.lines().map(|l| l.to_owned()).collect()
    }

    #[test]
    fn test_line_partitions() {
        let lines: Vec<String> = (0..7).map(|i| i.to_string()).collect();
        let parts = line_partitions(lines, 3);
        assert_eq!(parts.len(), 3);
        match &parts[2] {
            SalesPartition::Lines { first_line, lines } => {
                assert_eq!(*first_line, 7);
                assert_eq!(lines, &vec!["6".to_owned()]);
            },
            other => panic!("unexpected: {:?}", other)
        }
        assert!(line_partitions(Vec::new(), 3).is_empty());
        assert_eq!(line_partitions(vec!["a".into()], 8).len(), 1);
    }

    #[test]
    fn test_line_partitions_huge_part_count() {
        let lines: Vec<String> = (0..5).map(|i| i.to_string()).collect();
        assert_eq!(line_partitions(lines, usize::max_value()).len(), 5);
    }

    #[test]
    fn test_every_chunking_agrees() {
        let file = write_log(LOG.as_bytes());
        for size in 1..(LOG.len() as u64 + 2) {
            let stats = map_all(file_partitions(file.path(), size).unwrap()).unwrap();
            assert_eq!(stats.records, 3, "chunk size {}", size);
            assert_eq!(stats.distinct_baskets(), 2, "chunk size {}", size);
            assert_eq!(stats.total_sales(), 15.0, "chunk size {}", size);
        }
    }

    #[test]
    fn test_lines_agree_with_file() {
        let file = write_log(LOG.as_bytes());
        let from_file = map_all(file_partitions(file.path(), 16).unwrap()).unwrap();
        let from_lines = map_all(line_partitions(to_lines(LOG), 2)).unwrap();
        assert_eq!(from_file.stores, from_lines.stores);
        assert_eq!(from_file.basket_owners, from_lines.basket_owners);
        assert_eq!(from_file.sales_per_store, from_lines.sales_per_store);
    }

    #[test]
    fn test_malformed_line_number() {
        let text = format!("{}1|StoreA|oops\n", LOG);
        let file = write_log(text.as_bytes());
        for size in &[8u64, 64, 1024] {
            match map_all(file_partitions(file.path(), *size).unwrap()) {
                Err(SalesError::Malformed { line, content, .. }) => {
                    assert_eq!(line, 5);
                    assert_eq!(content, "1|StoreA|oops");
                },
                other => panic!("unexpected: {:?}", other)
            }
        }

        match map_all(line_partitions(to_lines(&text), 4)) {
            Err(SalesError::Malformed { line, .. }) => assert_eq!(line, 5),
            other => panic!("unexpected: {:?}", other)
        }
    }

    #[test]
    fn test_blank_line_aborts() {
        let text = "1|StoreA|100|1|2.0|1|2.0|true|10|500|2024-01-01\n\
                    \n   \n\
                    2|StoreB|102|1|5.0|2|10.0|false|20|600|2024-01-02\n";
        let file = write_log(text.as_bytes());
        for size in &[4u64, 64, 1024] {
            match map_all(file_partitions(file.path(), *size).unwrap()) {
                Err(SalesError::Malformed { line, content, source }) => {
                    assert_eq!(line, 2);
                    assert_eq!(content, "");
                    assert_eq!(source, RecordError::FieldCount { expected: 11, found: 1 });
                },
                other => panic!("unexpected: {:?}", other)
            }
        }

        match map_all(line_partitions(to_lines(text), 1)) {
            Err(SalesError::Malformed { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {:?}", other)
        }
    }

    #[test]
    fn test_invalid_utf8_in_name_is_kept() {
        let mut bytes = LOG.as_bytes().to_vec();
        bytes.extend_from_slice(b"3|Caf\xe9|103|1|1.0|1|1.0|false|30|700|2024-01-03\n");
        let file = write_log(&bytes);
        for size in &[8u64, 1024] {
            let stats = map_all(file_partitions(file.path(), *size).unwrap()).unwrap();
            assert_eq!(stats.records, 4);
            assert_eq!(stats.stores[&3], "Caf\u{FFFD}");
        }
    }

    #[test]
    fn test_invalid_utf8_in_number_is_located() {
        let mut bytes = LOG.as_bytes().to_vec();
        bytes.extend_from_slice(b"3|Cafe|10\xe93|1|1.0|1|1.0|false|30|700|2024-01-03\n");
        let file = write_log(&bytes);
        match map_all(file_partitions(file.path(), 32).unwrap()) {
            Err(SalesError::Malformed { line, content, source }) => {
                assert_eq!(line, 5);
                assert_eq!(content, "3|Cafe|10\u{FFFD}3|1|1.0|1|1.0|false|30|700|2024-01-03");
                match source {
                    RecordError::Field { column, .. } => assert_eq!(column, "ProductCode"),
                    other => panic!("unexpected: {:?}", other)
                }
            },
            other => panic!("unexpected: {:?}", other)
        }
    }

    #[test]
    fn test_leading_bom() {
        let text = "\u{FEFF}1|StoreA|100|1|2.0|1|2.0|true|10|500|2024-01-01\n\
                    2|StoreB|102|1|5.0|2|10.0|false|20|600|2024-01-02\n";
        let file = write_log(text.as_bytes());
        let from_file = map_all(file_partitions(file.path(), 1024).unwrap()).unwrap();
        assert_eq!(from_file.records, 2);
        assert_eq!(from_file.stores[&1], "StoreA");

        let from_lines = map_all(line_partitions(to_lines(text), 2)).unwrap();
        assert_eq!(from_lines.stores, from_file.stores);
    }

    #[test]
    fn test_items_off() {
        let options = MapOptions::default();
        let mut parts = line_partitions(to_lines(LOG), 1);
        let stats = map_partition(parts.remove(0), &options).unwrap();
        assert!(!stats.tracks_basket_items());
        assert_eq!(stats.records, 3);
    }
}
