//! Paged list queries
//!
//! Pages are 0-indexed. Sort keys are public field names mapped through a
//! per-entity whitelist to SQL expressions; anything not on the list is
//! rejected rather than ignored.

use inventory_common::normalize::search_text;
use inventory_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Raw paging query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub sort: Option<String>,
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    /// Anything other than "desc" (any case) sorts ascending
    fn parse(dir: Option<&str>, default: SortDir) -> SortDir {
        match dir.map(str::trim) {
            Some(d) if d.eq_ignore_ascii_case("desc") => SortDir::Desc,
            Some(d) if d.eq_ignore_ascii_case("asc") => SortDir::Asc,
            _ => default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

/// Server-side page size bounds
#[derive(Debug, Clone, Copy)]
pub struct PageLimits {
    pub default_size: u32,
    pub max_size: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_size: inventory_common::config::DEFAULT_PAGE_SIZE,
            max_size: inventory_common::config::MAX_PAGE_SIZE,
        }
    }
}

/// Sanitized page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
    pub sort: String,
    pub dir: SortDir,
}

impl PageRequest {
    /// Clamp page to >= 0 and size to [1, max]; default sort is `id`
    pub fn resolve(params: &PageParams, limits: PageLimits, default_dir: SortDir) -> Self {
        let max = i64::from(limits.max_size.max(1));
        let size = params
            .size
            .unwrap_or(i64::from(limits.default_size))
            .clamp(1, max);
        let sort = params
            .sort
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("id")
            .to_string();

        Self {
            page: params.page.unwrap_or(0).max(0),
            size,
            sort,
            dir: SortDir::parse(params.dir.as_deref(), default_dir),
        }
    }

    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.size)
    }

    /// `ORDER BY` clause for this request
    ///
    /// `whitelist` maps public sort keys to SQL expressions. The row id is
    /// appended as a tie-breaker so paging is stable.
    pub fn order_by(&self, whitelist: &[(&str, &str)], id_column: &str) -> Result<String> {
        let expr = whitelist
            .iter()
            .find(|(key, _)| *key == self.sort)
            .map(|(_, expr)| *expr)
            .ok_or_else(|| {
                Error::invalid("sort", format!("Invalid sort field: {}", self.sort))
            })?;

        let dir = self.dir.sql();
        if expr == id_column {
            Ok(format!(" ORDER BY {} {}", expr, dir))
        } else {
            Ok(format!(" ORDER BY {} {}, {} {}", expr, dir, id_column, dir))
        }
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub size: i64,
    pub total_elements: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
    pub sort: String,
    pub dir: String,
}

impl<T> Page<T> {
    /// `total_pages` is never below 1, even for an empty result
    pub fn new(items: Vec<T>, request: &PageRequest, total_elements: i64) -> Self {
        let total_pages = ((total_elements + request.size - 1) / request.size).max(1);
        Self {
            items,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages,
            has_next: request.page.saturating_add(1) < total_pages,
            has_prev: request.page > 0,
            sort: request.sort.clone(),
            dir: request.dir.as_str().to_string(),
        }
    }

    /// Same page metadata over different items, e.g. enriched views of these rows
    pub fn with_items<U>(self, items: Vec<U>) -> Page<U> {
        Page {
            items,
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            has_next: self.has_next,
            has_prev: self.has_prev,
            sort: self.sort,
            dir: self.dir,
        }
    }
}

/// Case-insensitive substring pattern for `LIKE ... ESCAPE '\'`
///
/// The term is folded with [`search_text`] to match the stored `*_search`
/// columns. `%`, `_` and `\` in the user's text match literally. Returns
/// `None` for a blank filter.
pub fn contains_pattern(term: Option<&str>) -> Option<String> {
    let term = term.map(str::trim).filter(|t| !t.is_empty())?;
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in search_text(term).chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    Some(pattern)
}
