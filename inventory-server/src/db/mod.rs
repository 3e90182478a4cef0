//! Row-level queries
//!
//! Every function takes `&mut SqliteConnection` so it runs equally against a
//! pooled connection or inside an open transaction (`&mut *tx`).

pub mod import_operations;
pub mod organizations;
pub mod persons;
pub mod products;

use crate::paging::contains_pattern;
use sqlx::{QueryBuilder, Sqlite};

/// Append `AND column LIKE '%term%'` when `term` is non-blank
///
/// `column` holds case-folded text (a `*_search` column) or plain ASCII, which
/// SQLite's `LIKE` already compares case-insensitively.
pub(crate) fn push_contains(qb: &mut QueryBuilder<'_, Sqlite>, column: &str, term: Option<&str>) {
    if let Some(pattern) = contains_pattern(term) {
        qb.push(" AND ")
            .push(column)
            .push(" LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\'");
    }
}
