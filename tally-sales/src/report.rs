//! Report Projector
//! ---
//! Read-only views over a finished `SalesStats`, and their plain-text renderings.  Nothing
//! here runs until every partition has merged; `SalesJob` only hands out finished
//! aggregates.
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::path::Path;

use crate::basket::BasketKey;
use crate::job::SalesRun;
use crate::stats::SalesStats;

const BYTES_PER_MB: f64 = 1_048_576.0;

/// Number of distinct baskets bought at one store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreBaskets {
    pub store_code: i32,
    pub store_name: String,
    pub baskets: usize
}

/// Total sales value of one store.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreSales {
    pub store_code: i32,
    pub store_name: String,
    pub total: f64
}

/// Products of one basket, tagged with the store it was bought in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasketLine {
    pub store_code: i32,
    pub products: Vec<i32>
}

impl fmt::Display for BasketLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|", self.store_code)?;
        for (i, p) in self.products.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", p)?;
        }
        Ok(())
    }
}

/// Every store, ordered by store code.
pub fn distinct_stores(stats: &SalesStats) -> Vec<(i32, &str)> {
    let mut stores: Vec<_> = stats.stores.iter()
        .map(|(code, name)| (*code, name.as_str()))
        .collect();
    stores.sort_by_key(|s| s.0);
    stores
}

fn by_name_then_code(a_name: &str, a_code: i32, b_name: &str, b_code: i32) -> Ordering {
    a_name.cmp(b_name).then(a_code.cmp(&b_code))
}

/// Distinct baskets per store, most first.  Stores without a name are left out.
pub fn baskets_per_store(stats: &SalesStats) -> Vec<StoreBaskets> {
    let mut counts: HashMap<i32, usize> = HashMap::new();
    for store in stats.basket_owners.values() {
        *counts.entry(*store).or_insert(0) += 1;
    }

    let mut view: Vec<StoreBaskets> = counts.into_iter()
        .filter_map(|(code, baskets)| match stats.stores.get(&code) {
            Some(name) if !name.is_empty() => Some(StoreBaskets {
                store_code: code,
                store_name: name.clone(),
                baskets: baskets
            }),
            _ => None
        })
        .collect();
    view.sort_by(|a, b| {
        b.baskets.cmp(&a.baskets)
            .then_with(|| by_name_then_code(&a.store_name, a.store_code, &b.store_name, b.store_code))
    });
    view
}

/// Sales total per store, highest first.  Stores without a name are left out.
pub fn sales_per_store(stats: &SalesStats) -> Vec<StoreSales> {
    let mut view: Vec<StoreSales> = stats.sales_per_store.iter()
        .filter_map(|(code, total)| match stats.stores.get(code) {
            Some(name) if !name.is_empty() => Some(StoreSales {
                store_code: *code,
                store_name: name.clone(),
                total: *total
            }),
            _ => None
        })
        .collect();
    view.sort_by(|a, b| {
        b.total.partial_cmp(&a.total)
            .unwrap_or(Ordering::Equal)
            .then_with(|| by_name_then_code(&a.store_name, a.store_code, &b.store_name, b.store_code))
    });
    view
}

/// One line per basket, ordered by basket key.  Empty when basket items were not tracked.
pub fn basket_lines(stats: &SalesStats) -> Vec<BasketLine> {
    let items = match stats.basket_items {
        Some(ref items) => items,
        None => return Vec::new()
    };
    let mut keyed: Vec<(&BasketKey, BasketLine)> = items.iter()
        .filter_map(|(key, products)| {
            stats.basket_owners.get(key)
                .map(|store| (key, BasketLine { store_code: *store, products: products.clone() }))
        })
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(b.0));
    keyed.into_iter().map(|(_, line)| line).collect()
}

/// The results report of one run.
pub struct Summary<'a> {
    pub input: &'a Path,
    pub run: &'a SalesRun
}

impl <'a> Summary<'a> {

    pub fn new(input: &'a Path, run: &'a SalesRun) -> Self {
        Summary { input: input, run: run }
    }
}

impl <'a> fmt::Display for Summary<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.run.stats;
        writeln!(f, "** Parallel MapReduce sales statistics [{} workers, {} partitions] **",
                 self.run.workers, self.run.partitions)?;
        writeln!(f, "   Transactions File: '{}' ({:.2} MB)",
                 self.input.display(), self.run.input_bytes as f64 / BYTES_PER_MB)?;
        writeln!(f, "   Records: {}, distinct baskets: {}",
                 stats.records, stats.distinct_baskets())?;

        writeln!(f)?;
        writeln!(f, "** Stores by StoreCode:")?;
        for (code, name) in distinct_stores(stats) {
            writeln!(f, "{}: {}", code, name)?;
        }

        writeln!(f)?;
        writeln!(f, "** Total amount of sales by Store")?;
        for s in sales_per_store(stats) {
            writeln!(f, "{}: {:.2}", s.store_name, s.total)?;
        }

        writeln!(f)?;
        writeln!(f, "** Total count of baskets/transactions by Store")?;
        for b in baskets_per_store(stats) {
            writeln!(f, "{}: {}", b.store_name, b.baskets)?;
        }

        writeln!(f)?;
        writeln!(f, "** Done! Time: {:.3} secs", self.run.elapsed.as_secs_f64())
    }
}

/// Writes `StoreCode|StoreName` for every store.
pub fn write_stores<W: Write>(stats: &SalesStats, out: &mut W) -> io::Result<()> {
    for (code, name) in distinct_stores(stats) {
        writeln!(out, "{}|{}", code, name)?;
    }
    Ok(())
}

/// Writes one `StoreCode|p1,p2,...` line per basket.
pub fn write_baskets<W: Write>(stats: &SalesStats, out: &mut W) -> io::Result<()> {
    for line in basket_lines(stats) {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}
