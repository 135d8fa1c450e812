use std::fmt;

use chrono::NaiveDateTime;

use crate::record::SalesRecord;

/// Identity of one purchase transaction.
///
/// Transaction ids repeat across tills and days, so a basket is approximated by the
/// store, till, transaction id and sales date together.  Line items of one physical
/// transaction stamped with different times count as separate baskets.  The full tuple
/// is the map key; it is never narrowed to a hash, which would merge distinct baskets.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BasketKey {
    pub store_code: i32,
    pub till_no: i32,
    pub transaction_id: i64,
    pub sales_date: NaiveDateTime
}

impl BasketKey {

    pub fn new(store_code: i32, till_no: i32, transaction_id: i64, sales_date: NaiveDateTime) -> Self {
        BasketKey {
            store_code: store_code,
            till_no: till_no,
            transaction_id: transaction_id,
            sales_date: sales_date
        }
    }
}

impl <'a> From<&'a SalesRecord> for BasketKey {
    fn from(record: &'a SalesRecord) -> Self {
        BasketKey::new(record.store_code, record.till_no, record.transaction_id, record.sales_date)
    }
}

impl fmt::Display for BasketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})",
               self.store_code, self.till_no, self.transaction_id, self.sales_date)
    }
}

#[cfg(test)]
mod basket_test {
    use super::*;
    use crate::record::{parse_line, Parsed};
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .and_then(|d| d.and_hms_opt(h, 0, 0))
            .unwrap()
    }

    #[test]
    fn test_key_from_record() {
        let record = match parse_line("1|StoreA|100|1|2.0|1|2.0|true|10|500|2024-01-01") {
            Ok(Parsed::Record(r)) => r,
            other => panic!("unexpected: {:?}", other)
        };
        assert_eq!(BasketKey::from(&record), BasketKey::new(1, 10, 500, at(1, 0)));
    }

    #[test]
    fn test_every_field_distinguishes() {
        let base = BasketKey::new(1, 10, 500, at(1, 0));
        let keys: HashSet<_> = vec![
            base.clone(),
            base.clone(),
            BasketKey::new(2, 10, 500, at(1, 0)),
            BasketKey::new(1, 11, 500, at(1, 0)),
            BasketKey::new(1, 10, 501, at(1, 0)),
            BasketKey::new(1, 10, 500, at(1, 1))
        ].into_iter().collect();
        assert_eq!(keys.len(), 5);
    }

    #[test]
    fn test_display() {
        assert_eq!(BasketKey::new(1, 10, 500, at(1, 0)).to_string(),
                   "(1, 10, 500, 2024-01-01 00:00:00)");
    }
}
