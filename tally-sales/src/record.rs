//! Record Parser
//! ---
//! Turns one raw line of the transaction log into a typed `SalesRecord`.  Header rows are
//! reported as such, not as errors.  Every other line must carry exactly eleven fields
//! that all convert; anything else, blank lines included, is an error, and callers treat
//! it as fatal for the whole run.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

/// Number of columns in a sales record
pub const FIELD_COUNT: usize = 11;

/// Column separator of the transaction log
pub const DEFAULT_DELIMITER: char = '|';

/// Text found in the StoreName column of a header row
pub const DEFAULT_HEADER_LITERAL: &str = "StoreName";

const STORE_NAME: usize = 1;

const COLUMNS: [&str; FIELD_COUNT] = [
    "StoreCode", "StoreName", "ProductCode", "ItemSeqNo", "UnitPrice", "Quantity",
    "SalesValue", "Weighted", "TillNo", "TransactionId", "SalesDate"
];

const DATE_TIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M"
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

/// One line item of a purchase.
#[derive(Clone, Debug, PartialEq)]
pub struct SalesRecord {
    pub store_code: i32,
    pub store_name: String,
    pub product_code: i32,
    pub item_seq_no: i32,
    pub unit_price: f64,
    pub quantity: f64,
    pub sales_value: f64,
    pub weighted: bool,
    pub till_no: i32,
    pub transaction_id: i64,
    pub sales_date: NaiveDateTime
}

/// Outcome of parsing a line that is not malformed.
#[derive(Clone, Debug, PartialEq)]
pub enum Parsed {
    Record(SalesRecord),

    /// Column header row; carries no data.
    Header
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("column {column}: cannot read {value:?} ({reason})")]
    Field { column: &'static str, value: String, reason: String }
}

/// Delimiter and header convention of a transaction log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dialect {
    pub delimiter: char,
    pub header_literal: String
}

impl Default for Dialect {
    fn default() -> Self {
        Dialect::new(DEFAULT_DELIMITER, DEFAULT_HEADER_LITERAL)
    }
}

impl Dialect {

    pub fn new(delimiter: char, header_literal: &str) -> Self {
        Dialect { delimiter: delimiter, header_literal: header_literal.to_owned() }
    }

    /// Parses one line.  The header check runs before the field count check, so a
    /// truncated header row is still a header.
    pub fn parse(&self, line: &str) -> Result<Parsed, RecordError> {
        let mut tokens = [""; FIELD_COUNT];
        let mut found = 0;
        for token in line.split(self.delimiter) {
            if found < FIELD_COUNT {
                tokens[found] = token;
            }
            found += 1;
        }

        if found > STORE_NAME && tokens[STORE_NAME].trim() == self.header_literal {
            return Ok(Parsed::Header);
        }
        if found != FIELD_COUNT {
            return Err(RecordError::FieldCount { expected: FIELD_COUNT, found: found });
        }

        Ok(Parsed::Record(SalesRecord {
            store_code: number(&tokens, 0)?,
            store_name: tokens[STORE_NAME].to_owned(),
            product_code: number(&tokens, 2)?,
            item_seq_no: number(&tokens, 3)?,
            unit_price: decimal(&tokens, 4)?,
            quantity: decimal(&tokens, 5)?,
            sales_value: decimal(&tokens, 6)?,
            weighted: boolean(&tokens, 7)?,
            till_no: number(&tokens, 8)?,
            transaction_id: number(&tokens, 9)?,
            sales_date: date_time(&tokens, 10)?
        }))
    }
}

/// Parses a line using the default `|` delimiter and `StoreName` header.
pub fn parse_line(line: &str) -> Result<Parsed, RecordError> {
    Dialect::default().parse(line)
}

fn invalid(idx: usize, value: &str, reason: impl Display) -> RecordError {
    RecordError::Field {
        column: COLUMNS[idx],
        value: value.to_owned(),
        reason: reason.to_string()
    }
}

fn number<T>(tokens: &[&str; FIELD_COUNT], idx: usize) -> Result<T, RecordError>
        where T: FromStr,
              T::Err: Display {
    let raw = tokens[idx];
    raw.trim().parse().map_err(|e| invalid(idx, raw, e))
}

fn decimal(tokens: &[&str; FIELD_COUNT], idx: usize) -> Result<f64, RecordError> {
    let value: f64 = number(tokens, idx)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(invalid(idx, tokens[idx], "not a finite number"))
    }
}

fn boolean(tokens: &[&str; FIELD_COUNT], idx: usize) -> Result<bool, RecordError> {
    let raw = tokens[idx].trim();
    if raw.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(invalid(idx, tokens[idx], "expected true or false"))
    }
}

fn date_time(tokens: &[&str; FIELD_COUNT], idx: usize) -> Result<NaiveDateTime, RecordError> {
    let raw = tokens[idx].trim();
    DATE_TIME_FORMATS.iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS.iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| invalid(idx, tokens[idx], "unrecognised date"))
}
