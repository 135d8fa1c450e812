use std::collections::HashMap;

use tally::aggregate::{merge_absent, merge_with, Aggregate};

use crate::basket::BasketKey;
use crate::record::SalesRecord;

/// Per-store statistics over a set of sales records.
///
/// The same type serves as the accumulator a worker builds from its own partition and as
/// the global result the partitions are merged into.  `basket_items` is only tracked when
/// asked for; it holds every line item and dominates memory use on large logs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SalesStats {
    /// StoreCode -> StoreName, first seen wins
    pub stores: HashMap<i32, String>,

    /// One entry per distinct basket, mapped to the store it was bought in
    pub basket_owners: HashMap<BasketKey, i32>,

    /// StoreCode -> sum of SalesValue
    pub sales_per_store: HashMap<i32, f64>,

    /// Product codes of every line item, per basket, in arrival order
    pub basket_items: Option<HashMap<BasketKey, Vec<i32>>>,

    /// Data records observed (headers excluded)
    pub records: u64
}

impl SalesStats {

    /// Empty statistics without basket items.
    pub fn new() -> Self {
        SalesStats::default()
    }

    /// Empty statistics that also collect basket items.
    pub fn with_basket_items() -> Self {
        SalesStats { basket_items: Some(HashMap::new()), ..SalesStats::default() }
    }

    pub fn tracks_basket_items(&self) -> bool {
        self.basket_items.is_some()
    }

    /// Folds one record in.  Existing store names and basket owners are never replaced.
    pub fn observe(&mut self, record: SalesRecord) {
        let key = BasketKey::from(&record);
        self.records += 1;

        *self.sales_per_store.entry(record.store_code).or_insert(0.0) += record.sales_value;

        if let Some(ref mut items) = self.basket_items {
            items.entry(key.clone())
                .or_insert_with(Vec::new)
                .push(record.product_code);
        }

        self.basket_owners.entry(key).or_insert(record.store_code);
        self.stores.entry(record.store_code).or_insert(record.store_name);
    }

    /// Number of distinct baskets
    pub fn distinct_baskets(&self) -> usize {
        self.basket_owners.len()
    }

    /// Sum of sales over every store
    pub fn total_sales(&self) -> f64 {
        self.sales_per_store.values().sum()
    }
}

impl Aggregate for SalesStats {
    fn merge(&mut self, other: Self) {
        merge_absent(&mut self.stores, other.stores);
        merge_absent(&mut self.basket_owners, other.basket_owners);
        merge_with(&mut self.sales_per_store, other.sales_per_store, |acc, v| *acc += v);
        if let Some(items) = other.basket_items {
            let mine = self.basket_items.get_or_insert_with(HashMap::new);
            merge_with(mine, items, |acc, v| acc.extend(v));
        }
        self.records += other.records;
    }
}
