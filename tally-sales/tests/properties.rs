//! Property-based tests for the aggregation.
//!
//! Random transaction logs are cut into random numbers of partitions; the merged result
//! must not depend on how the log was cut or in which order the partials were merged.

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use tally::aggregate::Aggregate;
use tally_sales::config::{Config, SchedulerKind};
use tally_sales::error::SalesError;
use tally_sales::input::{line_partitions, map_partition, MapOptions};
use tally_sales::job::SalesJob;
use tally_sales::stats::SalesStats;

const HEADER: &str = "StoreCode|StoreName|ProductCode|ItemSeqNo|UnitPrice|Quantity|SalesValue|Weighted|TillNo|TransactionId|SalesDate";

#[derive(Clone, Debug)]
struct Line {
    store: i32,
    product: i32,
    till: i32,
    transaction: i64,
    day: u32,
    cents: i64
}

impl Line {

    fn sales_value(&self) -> f64 {
        self.cents as f64 / 100.0
    }

    fn render(&self) -> String {
        format!("{}|Store{}|{}|1|{:.2}|1|{:.2}|false|{}|{}|2024-01-{:02}",
                self.store, self.store, self.product, self.sales_value(), self.sales_value(),
                self.till, self.transaction, self.day)
    }
}

prop_compose! {
    fn arbitrary_line()(
        store in 1..6i32,
        product in 1..50i32,
        till in 1..4i32,
        transaction in 1..20i64,
        day in 1..4u32,
        cents in 0..100_000i64
    ) -> Line {
        Line { store: store, product: product, till: till, transaction: transaction, day: day, cents: cents }
    }
}

fn render_all(lines: &[Line]) -> Vec<String> {
    lines.iter().map(Line::render).collect()
}

fn partials(lines: Vec<String>, parts: usize) -> Vec<SalesStats> {
    let options = MapOptions { basket_items: true, ..MapOptions::default() };
    line_partitions(lines, parts).into_iter()
        .map(|p| map_partition(p, &options).unwrap())
        .collect()
}

fn merge_all<I>(partials: I) -> SalesStats
        where I: IntoIterator<Item = SalesStats> {
    let mut global = SalesStats::default();
    for p in partials {
        global.merge(p);
    }
    global
}

fn run(lines: Vec<String>, workers: usize, scheduler: SchedulerKind) -> SalesStats {
    let job = SalesJob::new(Config { workers: workers, scheduler: scheduler, ..Config::default() }).unwrap();
    job.run_lines(lines).unwrap().stats
}

proptest! {
    #[test]
    fn sales_sum_matches_records(
        lines in prop::collection::vec(arbitrary_line(), 0..200),
        workers in 1..8usize
    ) {
        let mut expected: HashMap<i32, f64> = HashMap::new();
        for l in &lines {
            *expected.entry(l.store).or_insert(0.0) += l.sales_value();
        }

        for scheduler in &[SchedulerKind::Pooled, SchedulerKind::Parallel] {
            let stats = run(render_all(&lines), workers, *scheduler);
            prop_assert_eq!(stats.sales_per_store.len(), expected.len());
            for (store, total) in &expected {
                prop_assert!((stats.sales_per_store[store] - total).abs() < 1e-6);
            }
            prop_assert_eq!(stats.records, lines.len() as u64);
        }
    }

    #[test]
    fn distinct_baskets_match_tuples(
        lines in prop::collection::vec(arbitrary_line(), 0..200),
        parts in 1..16usize
    ) {
        let tuples: HashSet<_> = lines.iter()
            .map(|l| (l.store, l.till, l.transaction, l.day))
            .collect();
        let stats = merge_all(partials(render_all(&lines), parts));
        prop_assert_eq!(stats.distinct_baskets(), tuples.len());

        let items: usize = stats.basket_items.as_ref().map_or(0, |m| m.values().map(Vec::len).sum());
        prop_assert_eq!(items, lines.len());
    }

    #[test]
    fn merge_order_does_not_matter(
        lines in prop::collection::vec(arbitrary_line(), 1..200),
        parts in 1..16usize,
        rotate in 0..16usize
    ) {
        let forward = merge_all(partials(render_all(&lines), parts));

        let mut shuffled = partials(render_all(&lines), parts);
        shuffled.reverse();
        let n = shuffled.len();
        shuffled.rotate_left(rotate % n);
        let other = merge_all(shuffled);

        prop_assert_eq!(&forward.stores, &other.stores);
        prop_assert_eq!(&forward.basket_owners, &other.basket_owners);
        prop_assert_eq!(forward.records, other.records);
        for (store, total) in &forward.sales_per_store {
            prop_assert!((other.sales_per_store[store] - total).abs() < 1e-6);
        }
    }

    #[test]
    fn header_contributes_nothing(
        lines in prop::collection::vec(arbitrary_line(), 0..100),
        parts in 1..8usize
    ) {
        let plain = merge_all(partials(render_all(&lines), parts));

        let mut with_header = vec![HEADER.to_owned()];
        with_header.extend(render_all(&lines));
        let headed = merge_all(partials(with_header, parts));

        prop_assert_eq!(&plain.stores, &headed.stores);
        prop_assert_eq!(&plain.basket_owners, &headed.basket_owners);
        prop_assert_eq!(plain.records, headed.records);
    }

    #[test]
    fn blank_line_aborts_at_its_number(
        lines in prop::collection::vec(arbitrary_line(), 1..100),
        at in 0..100usize,
        parts in 1..8usize
    ) {
        let at = at % lines.len();
        let mut text = render_all(&lines);
        text.insert(at, String::new());

        let options = MapOptions { basket_items: true, ..MapOptions::default() };
        let failed = line_partitions(text, parts).into_iter()
            .map(|p| map_partition(p, &options))
            .filter_map(|r| r.err())
            .next();
        match failed {
            Some(SalesError::Malformed { line, content, .. }) => {
                prop_assert_eq!(line, at + 1);
                prop_assert!(content.is_empty());
            },
            other => prop_assert!(false, "unexpected: {:?}", other)
        }
    }
}
