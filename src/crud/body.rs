//! Request body parsing

use crate::core::error::ApiError;
use crate::core::principal::Principal;
use crate::core::record::Fields;
use crate::server::resource::Resource;
use serde_json::Value;

/// Keys clients may never set, compared after normalization
const BLOCKED_KEYS: [&str; 6] = [
    "id",
    "createdat",
    "updatedat",
    "deletedat",
    "createdbyid",
    "updatedbyid",
];

/// `CreatedByID`, `created_by_id` and `created-by-id` all become `createdbyid`
fn normalize(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn is_blocked(key: &str) -> bool {
    BLOCKED_KEYS.contains(&normalize(key).as_str())
}

/// Parse a JSON object body and drop every field the client may not set
///
/// Identity, timestamp and authorship keys are always removed, in any
/// casing. Admin-only fields of the resource are removed for non-admins.
pub fn parse_body(raw: &[u8], resource: &Resource, principal: &Principal) -> Result<Fields, ApiError> {
    let value: Value =
        serde_json::from_slice(raw).map_err(|e| ApiError::InvalidBody(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Err(ApiError::InvalidBody("expected a JSON object".to_string()));
    };

    let admin = principal.is_admin();
    Ok(fields
        .into_iter()
        .filter(|(key, _)| !is_blocked(key))
        .filter(|(key, _)| admin || !resource.admin_only_fields.iter().any(|f| f == key))
        .collect())
}
