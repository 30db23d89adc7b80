//! Built-in field validators
//!
//! Each constructor returns a closure receiving the field name and the
//! record projection. Validators only judge their own field.

use crate::core::record::Fields;
use serde_json::Value;
use validator::ValidateEmail;

fn field_value<'a>(field: &str, fields: &'a Fields) -> &'a Value {
    fields.get(field).unwrap_or(&Value::Null)
}

/// Validator: field must be present, non-null and not the empty string
pub fn required() -> impl Fn(&str, &Fields) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, fields: &Fields| match field_value(field, fields) {
        Value::Null => Err(format!("{} is required", field)),
        Value::String(s) if s.is_empty() => Err(format!("{} is required", field)),
        _ => Ok(()),
    }
}

/// Validator: field must be a well-formed email address when non-empty
pub fn email() -> impl Fn(&str, &Fields) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, fields: &Fields| {
        let raw = match field_value(field, fields) {
            Value::Null => return Ok(()),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if raw.is_empty() || raw.validate_email() {
            Ok(())
        } else {
            Err(format!("{} has an invalid format", field))
        }
    }
}

/// Validator: string length must be within `min..=max` characters
pub fn string_length(
    min: usize,
    max: usize,
) -> impl Fn(&str, &Fields) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, fields: &Fields| {
        let Some(s) = field_value(field, fields).as_str() else {
            return Ok(());
        };
        let len = s.chars().count();
        if len < min {
            Err(format!("{} must be at least {} characters long", field, min))
        } else if len > max {
            Err(format!("{} must be at most {} characters long", field, max))
        } else {
            Ok(())
        }
    }
}

/// Validator: string value must be one of `allowed`
pub fn one_of(
    allowed: &[&str],
) -> impl Fn(&str, &Fields) -> Result<(), String> + Send + Sync + Clone {
    let allowed: Vec<String> = allowed.iter().map(|s| s.to_string()).collect();
    move |field: &str, fields: &Fields| match field_value(field, fields).as_str() {
        Some(s) if !allowed.iter().any(|a| a == s) => Err(format!(
            "{} must be one of: {}",
            field,
            allowed.join(", ")
        )),
        _ => Ok(()),
    }
}
