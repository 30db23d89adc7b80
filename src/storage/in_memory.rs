//! In-memory implementation of Store for testing and development

use crate::core::query::{Direction, Filter, OrderTerm, Window};
use crate::core::record::{Record, field};
use crate::core::store::{Store, StoreError};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Default)]
struct Collection {
    next_id: u64,
    rows: BTreeMap<u64, Record>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Collection>,
    unique: HashMap<String, HashSet<String>>,
}

/// In-memory store implementation
///
/// Useful for testing and development. Uses RwLock for thread-safe access.
/// Identities are assigned per collection, starting at 1.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a unique constraint on `collection.field`
    ///
    /// Empty strings and nulls are not considered for uniqueness.
    pub fn with_unique(self, collection: &str, field: &str) -> Self {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .unique
            .entry(collection.to_string())
            .or_default()
            .insert(field.to_string());
        self
    }

    fn now() -> Value {
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true))
    }
}

fn lock_error<T>(e: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Backend(format!("Failed to acquire lock: {}", e))
}

fn check_unique(
    inner: &Inner,
    collection: &str,
    candidate: &Record,
    own_id: Option<u64>,
) -> Result<(), StoreError> {
    let Some(fields) = inner.unique.get(collection) else {
        return Ok(());
    };
    let Some(rows) = inner.collections.get(collection) else {
        return Ok(());
    };

    for name in fields {
        let value = match candidate.get(name) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) if s.is_empty() => continue,
            Some(value) => value,
        };
        let taken = rows
            .rows
            .values()
            .filter(|row| row.id() != own_id)
            .any(|row| row.get(name) == Some(value));
        if taken {
            return Err(StoreError::UniqueViolation {
                collection: collection.to_string(),
                field: name.clone(),
            });
        }
    }
    Ok(())
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

fn compare_records(a: &Record, b: &Record, order: &[OrderTerm]) -> Ordering {
    for term in order {
        let ordering = compare_values(a.get(&term.field), b.get(&term.field));
        let ordering = match term.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[async_trait]
impl Store for InMemoryStore {
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Record, StoreError> {
        let inner = self.inner.read().map_err(lock_error)?;

        inner
            .collections
            .get(collection)
            .and_then(|c| c.rows.values().find(|row| filter.matches(row)))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<usize, StoreError> {
        let inner = self.inner.read().map_err(lock_error)?;

        Ok(inner
            .collections
            .get(collection)
            .map(|c| c.rows.values().filter(|row| filter.matches(row)).count())
            .unwrap_or(0))
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        order: &[OrderTerm],
        window: Option<Window>,
    ) -> Result<Vec<Record>, StoreError> {
        let inner = self.inner.read().map_err(lock_error)?;

        let mut rows: Vec<Record> = inner
            .collections
            .get(collection)
            .map(|c| {
                c.rows
                    .values()
                    .filter(|row| filter.matches(row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        rows.sort_by(|a, b| compare_records(a, b, order));

        Ok(match window {
            Some(w) => rows.into_iter().skip(w.offset).take(w.limit).collect(),
            None => rows,
        })
    }

    async fn create(&self, collection: &str, mut record: Record) -> Result<Record, StoreError> {
        let mut inner = self.inner.write().map_err(lock_error)?;

        check_unique(&inner, collection, &record, None)?;

        let rows = inner.collections.entry(collection.to_string()).or_default();
        rows.next_id += 1;
        let id = rows.next_id;
        let now = Self::now();

        record.set(field::ID, id);
        record.set(field::CREATED_AT, now.clone());
        record.set(field::UPDATED_AT, now);
        record.set(field::DELETED_AT, Value::Null);

        rows.rows.insert(id, record.clone());
        Ok(record)
    }

    async fn save(&self, collection: &str, mut record: Record) -> Result<Record, StoreError> {
        let mut inner = self.inner.write().map_err(lock_error)?;

        let id = record.id().ok_or(StoreError::NotFound)?;
        check_unique(&inner, collection, &record, Some(id))?;

        let rows = inner
            .collections
            .get_mut(collection)
            .ok_or(StoreError::NotFound)?;
        let existing = rows.rows.get(&id).ok_or(StoreError::NotFound)?;

        // Creation and deletion metadata are owned by the store
        for owned in [field::CREATED_AT, field::DELETED_AT] {
            record.set(owned, existing.get(owned).cloned().unwrap_or(Value::Null));
        }
        record.set(field::UPDATED_AT, Self::now());

        rows.rows.insert(id, record.clone());
        Ok(record)
    }

    async fn delete(&self, collection: &str, id: u64) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(lock_error)?;

        let row = inner
            .collections
            .get_mut(collection)
            .and_then(|c| c.rows.get_mut(&id))
            .filter(|row| !row.is_deleted())
            .ok_or(StoreError::NotFound)?;

        row.set(field::DELETED_AT, Self::now());
        Ok(())
    }

    async fn unscoped_delete(&self, collection: &str, ids: &[u64]) -> Result<usize, StoreError> {
        let mut inner = self.inner.write().map_err(lock_error)?;

        let Some(rows) = inner.collections.get_mut(collection) else {
            return Ok(0);
        };
        Ok(ids.iter().filter(|id| rows.rows.remove(*id).is_some()).count())
    }
}
