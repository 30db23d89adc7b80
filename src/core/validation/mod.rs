//! Record validation
//!
//! A [`FieldValidators`] list maps field names to an ordered chain of
//! validators. Checks run against the untyped projection of a record so the
//! engine works for every model shape. Within a field the chain stops at the
//! first failure; every field is always evaluated.

pub mod validators;

use crate::core::record::Fields;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A single field check: `Ok(())` or a message
pub type Validator = Arc<dyn Fn(&str, &Fields) -> Result<(), String> + Send + Sync>;

/// Field name → error message; empty means valid
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(IndexMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field error set
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(field, message);
        errors
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        f.write_str(&parts.join("; "))
    }
}

/// Ordered validator chains, keyed by field
#[derive(Clone, Default)]
pub struct FieldValidators {
    chains: IndexMap<String, Vec<Validator>>,
}

impl FieldValidators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a validator to the chain of `field`
    pub fn add<F>(mut self, field: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&str, &Fields) -> Result<(), String> + Send + Sync + 'static,
    {
        self.chains
            .entry(field.into())
            .or_default()
            .push(Arc::new(validator));
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.chains.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn validate(&self, fields: &Fields) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for (field, chain) in &self.chains {
            if let Some(message) = chain.iter().find_map(|check| check(field.as_str(), fields).err()) {
                errors.insert(field.clone(), message);
            }
        }
        errors
    }
}

impl fmt::Debug for FieldValidators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: IndexMap<&str, usize> = self
            .chains
            .iter()
            .map(|(field, chain)| (field.as_str(), chain.len()))
            .collect();
        f.debug_struct("FieldValidators")
            .field("chains", &counts)
            .finish()
    }
}
