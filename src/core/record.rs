//! Type-erased records and the model capability trait
//!
//! Every registrable model implements [`Model`]. Inside the pipeline and the
//! store, instances travel as [`Record`]s: plain JSON objects. The
//! [`ModelVTable`] captured at registration time is the only place that
//! knows how to go back and forth between the two.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::TypeId;

/// Untyped name → value projection of a record
pub type Fields = Map<String, Value>;

/// Names of the system fields every model carries
pub mod field {
    pub const ID: &str = "id";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";
    pub const DELETED_AT: &str = "deleted_at";
    pub const CREATED_BY_ID: &str = "created_by_id";
    pub const UPDATED_BY_ID: &str = "updated_by_id";
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("record has no identity")]
    MissingId,

    #[error("invalid {model} record: {message}")]
    Decode { model: String, message: String },
}

/// Identity, timestamps and authorship shared by all models
///
/// Flattened into each model struct, so the fields appear at the top level
/// of the serialized record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemData {
    pub id: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_by_id: u64,
    pub updated_by_id: u64,
}

/// Capability trait of a registrable data model
///
/// Implemented by [`resource_model!`](crate::resource_model) for ordinary
/// models.
pub trait Model:
    Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static
{
    /// Canonical model name, e.g. `"BlogPost"`
    const NAME: &'static str;

    fn system(&self) -> &SystemData;

    fn system_mut(&mut self) -> &mut SystemData;

    fn id(&self) -> u64 {
        self.system().id
    }

    fn created_by(&self) -> u64 {
        self.system().created_by_id
    }
}

/// A record of any registered model, held as a JSON object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Fields);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: Fields) -> Self {
        Self(fields)
    }

    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            _ => Err(RecordError::NotAnObject),
        }
    }

    pub fn fields(&self) -> &Fields {
        &self.0
    }

    pub fn fields_mut(&mut self) -> &mut Fields {
        &mut self.0
    }

    pub fn into_fields(self) -> Fields {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Positive numeric identity, if the record has been persisted
    pub fn id(&self) -> Option<u64> {
        self.0
            .get(field::ID)
            .and_then(Value::as_u64)
            .filter(|id| *id > 0)
    }

    pub fn created_by(&self) -> Option<u64> {
        self.0.get(field::CREATED_BY_ID).and_then(Value::as_u64)
    }

    pub fn is_deleted(&self) -> bool {
        self.0
            .get(field::DELETED_AT)
            .is_some_and(|value| !value.is_null())
    }

    /// Shallow merge of `patch` over a copy of this record
    pub fn overlay(&self, patch: &Fields) -> Record {
        let mut merged = self.0.clone();
        for (key, value) in patch {
            merged.insert(key.clone(), value.clone());
        }
        Record(merged)
    }

    pub fn from_model<M: Model>(model: &M) -> Result<Self, RecordError> {
        let value = serde_json::to_value(model).map_err(|e| RecordError::Decode {
            model: M::NAME.to_string(),
            message: e.to_string(),
        })?;
        Self::from_value(value)
    }

    pub fn to_model<M: Model>(&self) -> Result<M, RecordError> {
        M::deserialize(&Value::Object(self.0.clone())).map_err(|e| RecordError::Decode {
            model: M::NAME.to_string(),
            message: e.to_string(),
        })
    }
}

impl From<Fields> for Record {
    fn from(fields: Fields) -> Self {
        Self(fields)
    }
}

/// Per-model function table captured when a resource is registered
#[derive(Debug, Clone, Copy)]
pub struct ModelVTable {
    pub type_id: TypeId,
    pub type_name: &'static str,
    blank: fn() -> Result<Record, RecordError>,
    decode_onto: fn(&Record, &Fields) -> Result<Record, RecordError>,
}

impl ModelVTable {
    pub fn of<M: Model>() -> Self {
        Self {
            type_id: TypeId::of::<M>(),
            type_name: M::NAME,
            blank: blank_record::<M>,
            decode_onto: decode_onto::<M>,
        }
    }

    /// The zero value of the model, as a record
    pub fn blank(&self) -> Result<Record, RecordError> {
        (self.blank)()
    }

    /// Apply `patch` over `base` and normalize the result through the model
    ///
    /// Fails when the patched record no longer decodes as the model, e.g. a
    /// string sent for a numeric field.
    pub fn decode_onto(&self, base: &Record, patch: &Fields) -> Result<Record, RecordError> {
        (self.decode_onto)(base, patch)
    }

    /// Field names of the model, sorted by name
    pub fn field_names(&self) -> Result<Vec<String>, RecordError> {
        Ok(self.blank()?.fields().keys().cloned().collect())
    }
}

fn blank_record<M: Model>() -> Result<Record, RecordError> {
    Record::from_model(&M::default())
}

fn decode_onto<M: Model>(base: &Record, patch: &Fields) -> Result<Record, RecordError> {
    let model: M = base.overlay(patch).to_model()?;
    Record::from_model(&model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    #[serde(default)]
    struct Note {
        #[serde(flatten)]
        system: SystemData,
        title: String,
        pages: u32,
    }

    impl Model for Note {
        const NAME: &'static str = "Note";

        fn system(&self) -> &SystemData {
            &self.system
        }

        fn system_mut(&mut self) -> &mut SystemData {
            &mut self.system
        }
    }

    #[test]
    fn test_blank_record_has_system_and_model_fields() {
        let vtable = ModelVTable::of::<Note>();
        let names = vtable.field_names().unwrap();
        for expected in ["id", "created_at", "created_by_id", "title", "pages"] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
        assert_eq!(vtable.type_name, "Note");
        assert_eq!(vtable.type_id, TypeId::of::<Note>());
    }

    #[test]
    fn test_decode_onto_is_partial() {
        let vtable = ModelVTable::of::<Note>();
        let mut base = vtable.blank().unwrap();
        base.set("id", 4);
        base.set("title", "draft");
        base.set("pages", 3);

        let patch = json!({ "pages": 10 }).as_object().cloned().unwrap();
        let merged = vtable.decode_onto(&base, &patch).unwrap();
        assert_eq!(merged.get("title"), Some(&json!("draft")));
        assert_eq!(merged.get("pages"), Some(&json!(10)));
        assert_eq!(merged.id(), Some(4));
    }

    #[test]
    fn test_decode_onto_rejects_wrong_types() {
        let vtable = ModelVTable::of::<Note>();
        let base = vtable.blank().unwrap();
        let patch = json!({ "pages": "many" }).as_object().cloned().unwrap();
        let err = vtable.decode_onto(&base, &patch).unwrap_err();
        assert!(matches!(err, RecordError::Decode { .. }));
    }

    #[test]
    fn test_id_ignores_zero() {
        let vtable = ModelVTable::of::<Note>();
        let blank = vtable.blank().unwrap();
        assert_eq!(blank.id(), None);
        assert!(!blank.is_deleted());
    }

    #[test]
    fn test_model_round_trip_keeps_authorship() {
        let mut note = Note::default();
        note.system.created_by_id = 7;
        note.title = "hello".to_string();
        let record = Record::from_model(&note).unwrap();
        assert_eq!(record.created_by(), Some(7));
        let back: Note = record.to_model().unwrap();
        assert_eq!(back.created_by(), 7);
        assert_eq!(back.title, "hello");
    }

    #[test]
    fn test_from_value_requires_object() {
        assert_eq!(
            Record::from_value(json!([1, 2])).unwrap_err(),
            RecordError::NotAnObject
        );
    }
}
