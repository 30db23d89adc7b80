//! Filters, ordering and pagination for list queries
//!
//! List requests carry `page`, `limit` and `order`; every other query-string
//! key becomes an equality predicate. All predicates are ANDed.
//!
//! ```text
//! GET /api/posts?page=2&limit=5&order=-createdAt,title&status=draft
//! ```

use crate::config::PaginationConfig;
use crate::core::naming::to_snake_case;
use crate::core::record::{Record, field};
use regex::Regex;
use serde::Serialize;
use serde_json::{Number, Value};
use std::sync::LazyLock;

/// Query-string keys that never become filters
pub const RESERVED_KEYS: [&str; 3] = ["page", "limit", "order"];

static FIELD_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("invalid order field '{0}'")]
    InvalidOrder(String),

    #[error("unknown field '{0}'")]
    UnknownField(String),
}

/// Conjunction of equality predicates
///
/// Soft-deleted records are excluded unless the filter is unscoped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<(String, Value)>,
    unscoped: bool,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on the record identity
    pub fn by_id(id: u64) -> Self {
        Self::new().eq(field::ID, id)
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(field, value);
        self
    }

    pub fn push(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.predicates.push((field.into(), value.into()));
    }

    /// Include soft-deleted records
    pub fn unscoped(mut self) -> Self {
        self.unscoped = true;
        self
    }

    pub fn is_unscoped(&self) -> bool {
        self.unscoped
    }

    pub fn predicates(&self) -> &[(String, Value)] {
        &self.predicates
    }

    /// Evaluate the predicates against a record
    ///
    /// Query-string values arrive as strings, so `"5"` matches `5` and
    /// `"true"` matches `true`.
    pub fn matches(&self, record: &Record) -> bool {
        if !self.unscoped && record.is_deleted() {
            return false;
        }
        self.predicates.iter().all(|(name, wanted)| {
            record
                .get(name)
                .is_some_and(|stored| loosely_equal(stored, wanted))
        })
    }
}

fn loosely_equal(stored: &Value, wanted: &Value) -> bool {
    if stored == wanted {
        return true;
    }
    match (stored, wanted) {
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => s
            .trim()
            .parse::<Number>()
            .is_ok_and(|parsed| numbers_equal(n, &parsed)),
        (Value::Bool(b), Value::String(s)) | (Value::String(s), Value::Bool(b)) => {
            s.parse::<bool>().ok() == Some(*b)
        }
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        _ => false,
    }
}

/// Numeric equality, exact for integers beyond the `f64` mantissa
pub(crate) fn numbers_equal(a: &Number, b: &Number) -> bool {
    fn integer(n: &Number) -> Option<i128> {
        n.as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
    }
    match (integer(a), integer(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a.as_f64() == b.as_f64(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderTerm {
    pub field: String,
    pub direction: Direction,
}

impl OrderTerm {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

/// Most recent first
pub fn default_order() -> Vec<OrderTerm> {
    vec![OrderTerm::desc(field::ID)]
}

/// Parse `-createdAt,title` into `created_at desc, title asc`
pub fn parse_order(raw: &str) -> Result<Vec<OrderTerm>, QueryError> {
    let mut terms = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (name, direction) = match item.strip_prefix('-') {
            Some(rest) => (rest, Direction::Desc),
            None => (item, Direction::Asc),
        };
        if !FIELD_NAME.is_match(name) {
            return Err(QueryError::InvalidOrder(item.to_string()));
        }
        terms.push(OrderTerm {
            field: to_snake_case(name),
            direction,
        });
    }
    if terms.is_empty() {
        return Ok(default_order());
    }
    Ok(terms)
}

/// Offset/limit slice of a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: usize,
    pub limit: usize,
}

impl Window {
    /// Window of a 1-based page
    pub fn page(page: usize, limit: usize) -> Self {
        Self {
            offset: page.saturating_sub(1).saturating_mul(limit),
            limit,
        }
    }
}

/// Pagination metadata returned with list responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// Total number of matching records
    pub total: usize,

    /// Current page number (starts at 1)
    pub page: usize,

    /// Number of items per page
    pub limit: usize,

    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        let limit = limit.max(1);
        let page = page.max(1);
        let total_pages = total.div_ceil(limit);
        let start = (page - 1).saturating_mul(limit);

        Self {
            total,
            page,
            limit,
            total_pages,
            has_next: start.saturating_add(limit) < total,
            has_prev: page > 1,
        }
    }
}

/// Parsed list request
#[derive(Debug, Clone, PartialEq)]
pub struct ListParams {
    pub page: usize,
    pub limit: usize,
    pub order: Vec<OrderTerm>,
    /// Equality filters, names in snake_case
    pub filters: Vec<(String, String)>,
}

impl ListParams {
    /// Build list parameters from raw query-string pairs
    ///
    /// Unparsable or out-of-range `page`/`limit` values fall back to the
    /// defaults; a malformed `order` is an error.
    pub fn from_query<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
        config: &PaginationConfig,
    ) -> Result<Self, QueryError> {
        let mut params = Self {
            page: 1,
            limit: config.default_limit,
            order: default_order(),
            filters: Vec::new(),
        };

        for (key, value) in pairs {
            match key {
                "page" => {
                    params.page = value.parse::<usize>().ok().filter(|p| *p >= 1).unwrap_or(1);
                }
                "limit" => {
                    params.limit = value
                        .parse::<usize>()
                        .ok()
                        .filter(|l| *l >= 1)
                        .map(|l| l.min(config.max_limit))
                        .unwrap_or(config.default_limit);
                }
                "order" => params.order = parse_order(value)?,
                _ => params.filters.push((to_snake_case(key), value.to_string())),
            }
        }

        Ok(params)
    }

    /// Reject filter or order names that are not fields of the model
    pub fn check_fields(&self, known: &[String]) -> Result<(), QueryError> {
        let names = self
            .filters
            .iter()
            .map(|(name, _)| name)
            .chain(self.order.iter().map(|term| &term.field));
        for name in names {
            if !known.iter().any(|k| k == name) {
                return Err(QueryError::UnknownField(name.clone()));
            }
        }
        Ok(())
    }

    pub fn window(&self) -> Window {
        Window::page(self.page, self.limit)
    }

    /// Filter made of the request predicates
    pub fn filter(&self) -> Filter {
        let mut filter = Filter::new();
        for (name, value) in &self.filters {
            filter.push(name.clone(), value.clone());
        }
        filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> PaginationConfig {
        PaginationConfig {
            default_limit: 10,
            max_limit: 100,
        }
    }

    fn parse(pairs: &[(&str, &str)]) -> Result<ListParams, QueryError> {
        ListParams::from_query(pairs.iter().copied(), &config())
    }

    #[test]
    fn test_defaults() {
        let params = parse(&[]).unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 10);
        assert_eq!(params.order, vec![OrderTerm::desc("id")]);
        assert!(params.filters.is_empty());
    }

    #[test]
    fn test_invalid_page_and_limit_fall_back() {
        let params = parse(&[("page", "zero"), ("limit", "-3")]).unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 10);

        let params = parse(&[("page", "0"), ("limit", "0")]).unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 10);
    }

    #[test]
    fn test_limit_is_clamped() {
        let params = parse(&[("limit", "5000")]).unwrap();
        assert_eq!(params.limit, 100);
    }

    #[test]
    fn test_order_parsing() {
        let params = parse(&[("order", "-createdAt, title")]).unwrap();
        assert_eq!(
            params.order,
            vec![OrderTerm::desc("created_at"), OrderTerm::asc("title")]
        );
    }

    #[test]
    fn test_order_rejects_injection() {
        let err = parse(&[("order", "title; DROP TABLE posts")]).unwrap_err();
        assert!(matches!(err, QueryError::InvalidOrder(_)));
    }

    #[test]
    fn test_remaining_keys_become_filters() {
        let params = parse(&[("status", "draft"), ("authorId", "3"), ("page", "2")]).unwrap();
        assert_eq!(params.page, 2);
        assert_eq!(
            params.filters,
            vec![
                ("status".to_string(), "draft".to_string()),
                ("author_id".to_string(), "3".to_string())
            ]
        );
    }

    #[test]
    fn test_check_fields() {
        let known = vec!["id".to_string(), "title".to_string()];
        assert!(parse(&[("title", "x")]).unwrap().check_fields(&known).is_ok());
        assert_eq!(
            parse(&[("secret", "x")]).unwrap().check_fields(&known),
            Err(QueryError::UnknownField("secret".to_string()))
        );
        assert!(parse(&[("order", "rank")]).unwrap().check_fields(&known).is_err());
    }

    #[test]
    fn test_filter_matching() {
        let mut record = Record::new();
        record.set("id", 5);
        record.set("published", true);
        record.set("title", "hello");

        assert!(Filter::new().eq("id", "5").matches(&record));
        assert!(Filter::new().eq("published", "true").matches(&record));
        assert!(Filter::by_id(5).eq("title", "hello").matches(&record));
        assert!(!Filter::new().eq("title", "other").matches(&record));
        assert!(!Filter::new().eq("missing", "x").matches(&record));
    }

    #[test]
    fn test_large_ids_match_exactly() {
        let mut record = Record::new();
        record.set("id", 9_007_199_254_740_993u64);

        assert!(Filter::new().eq("id", "9007199254740993").matches(&record));
        assert!(!Filter::new().eq("id", "9007199254740992").matches(&record));
        assert!(!Filter::by_id(9_007_199_254_740_992).matches(&record));
    }

    #[test]
    fn test_filter_hides_deleted_unless_unscoped() {
        let mut record = Record::new();
        record.set("id", 1);
        record.set("deleted_at", json!("2024-01-01T00:00:00Z"));
        assert!(!Filter::by_id(1).matches(&record));
        assert!(Filter::by_id(1).unscoped().matches(&record));
    }

    #[test]
    fn test_window_and_pagination() {
        assert_eq!(Window::page(3, 10), Window { offset: 20, limit: 10 });

        let meta = Pagination::new(1, 20, 145);
        assert_eq!(meta.total_pages, 8);
        assert!(meta.has_next);
        assert!(!meta.has_prev);

        let far = Window::page(usize::MAX, 10);
        assert_eq!(far.offset, usize::MAX);
        let meta = Pagination::new(usize::MAX, 10, 25);
        assert!(!meta.has_next);
        assert!(meta.has_prev);

        let empty = Pagination::new(1, 10, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
    }
}
