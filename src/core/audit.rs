//! Audit trail
//!
//! Every successful mutation is followed by one [`HistoryEntry`]. Entries are
//! append-only; this crate never edits or removes them. Writing the entry is
//! a separate step from the primary write and is not transactional with it.

use crate::core::principal::Principal;
use crate::core::query::{Filter, OrderTerm, Window, numbers_equal};
use crate::core::record::{Fields, Model, Record, RecordError, SystemData, field};
use crate::core::store::{Store, StoreError};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Fields that change on every save and never belong in a diff
const BOOKKEEPING_FIELDS: [&str; 2] = [field::UPDATED_AT, field::UPDATED_BY_ID];

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("failed to serialize audit detail: {0}")]
    Detail(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditAction {
    #[default]
    Created,
    Updated,
    Deleted,
    HardDeleted,
}

/// One persisted audit entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub system: SystemData,
    pub action: AuditAction,
    pub actor_id: u64,
    pub actor_label: String,
    pub resource_name: String,
    pub resource_id: u64,
    /// RFC 3339 with nanoseconds
    pub timestamp: String,
    /// JSON text; empty for deletions
    pub detail: String,
    pub trace_id: String,
}

impl Model for HistoryEntry {
    const NAME: &'static str = "HistoryEntry";

    fn system(&self) -> &SystemData {
        &self.system
    }

    fn system_mut(&mut self) -> &mut SystemData {
        &mut self.system
    }
}

/// Build the audit entry for a mutation
///
/// `record` is the persisted state: the full record for creations, the
/// pre-delete snapshot for hard deletes. `diff` is only used for updates.
/// Fails when the record has no identity.
pub fn new_log_entry(
    action: AuditAction,
    actor: &Principal,
    resource_name: &str,
    record: &Record,
    diff: Option<&Fields>,
    trace_id: &str,
) -> Result<HistoryEntry, AuditError> {
    let resource_id = record.id().ok_or(RecordError::MissingId)?;

    let detail = match action {
        AuditAction::Created | AuditAction::HardDeleted => serde_json::to_string(record)?,
        AuditAction::Updated => match diff {
            Some(diff) => serde_json::to_string(diff)?,
            None => "{}".to_string(),
        },
        AuditAction::Deleted => String::new(),
    };

    Ok(HistoryEntry {
        system: SystemData {
            created_by_id: actor.id,
            updated_by_id: actor.id,
            ..SystemData::default()
        },
        action,
        actor_id: actor.id,
        actor_label: actor.label.clone(),
        resource_name: resource_name.to_string(),
        resource_id,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
        detail,
        trace_id: trace_id.to_string(),
    })
}

/// Structural diff of two record projections
///
/// Returns `{ field: [before, after] }` for changed values and
/// `{ field: { ...nested diff } }` for changed nested objects. A key present
/// on one side only is compared against `null`. Bookkeeping fields are
/// ignored at the top level.
pub fn compare_fields(before: &Fields, after: &Fields) -> Fields {
    let mut diff = diff_objects(before, after);
    for name in BOOKKEEPING_FIELDS {
        diff.remove(name);
    }
    diff
}

fn diff_objects(before: &Fields, after: &Fields) -> Fields {
    let mut diff = Fields::new();
    let keys = before
        .keys()
        .chain(after.keys().filter(|k| !before.contains_key(*k)));

    for key in keys {
        let old = before.get(key).unwrap_or(&Value::Null);
        let new = after.get(key).unwrap_or(&Value::Null);

        match (old, new) {
            (Value::Object(a), Value::Object(b)) => {
                let nested = diff_objects(a, b);
                if !nested.is_empty() {
                    diff.insert(key.clone(), Value::Object(nested));
                }
            }
            _ if same_value(old, new) => {}
            _ => {
                diff.insert(key.clone(), Value::Array(vec![old.clone(), new.clone()]));
            }
        }
    }
    diff
}

/// Equality that treats two RFC 3339 strings naming the same instant as equal
fn same_value(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => {
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => x == y,
                _ => false,
            }
        }
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        _ => false,
    }
}

/// Append-only access to the history collection
#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn Store>,
    collection: String,
}

impl AuditLog {
    pub fn new(store: Arc<dyn Store>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Persist an entry
    pub async fn append(&self, entry: &HistoryEntry) -> Result<Record, AuditError> {
        let record = Record::from_model(entry)?;
        Ok(self.store.create(&self.collection, record).await?)
    }

    /// Build and persist the entry for a mutation
    pub async fn record(
        &self,
        action: AuditAction,
        actor: &Principal,
        resource_name: &str,
        record: &Record,
        diff: Option<&Fields>,
        trace_id: &str,
    ) -> Result<Record, AuditError> {
        let entry = new_log_entry(action, actor, resource_name, record, diff, trace_id)?;
        self.append(&entry).await
    }

    /// Entries for one record, newest first, with the total count
    pub async fn timeline(
        &self,
        resource_name: &str,
        resource_id: u64,
        window: Window,
    ) -> Result<(Vec<Record>, usize), AuditError> {
        let filter = Filter::new()
            .eq("resource_name", resource_name)
            .eq("resource_id", resource_id);
        let order = [OrderTerm::desc(field::ID)];

        let total = self.store.count(&self.collection, &filter).await?;
        let entries = self
            .store
            .find_many(&self.collection, &filter, &order, Some(window))
            .await?;
        Ok((entries, total))
    }
}
