//! Column codecs for values SQLite has no native type for.
//!
//! Decimals are stored as TEXT and enums as their canonical string. A value
//! that does not parse back is reported as [`DbError::CorruptRecord`].

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::{DbError, DbResult};

pub(crate) fn decimal(entity: &str, field: &str, raw: &str) -> DbResult<Decimal> {
    Decimal::from_str(raw).map_err(|_| DbError::corrupt(entity, field, raw))
}

pub(crate) fn opt_decimal(entity: &str, field: &str, raw: Option<&str>) -> DbResult<Option<Decimal>> {
    raw.map(|r| decimal(entity, field, r)).transpose()
}

pub(crate) fn parsed<T: FromStr>(entity: &str, field: &str, raw: &str) -> DbResult<T> {
    raw.parse::<T>().map_err(|_| DbError::corrupt(entity, field, raw))
}

pub(crate) fn opt_parsed<T: FromStr>(entity: &str, field: &str, raw: Option<&str>) -> DbResult<Option<T>> {
    raw.map(|r| parsed(entity, field, r)).transpose()
}

pub(crate) fn count(entity: &str, field: &str, raw: i64) -> DbResult<u32> {
    u32::try_from(raw).map_err(|_| DbError::corrupt(entity, field, raw.to_string()))
}

pub(crate) fn text(value: Decimal) -> String {
    value.to_string()
}

pub(crate) fn opt_text(value: Option<Decimal>) -> Option<String> {
    value.map(text)
}
