use super::{authorize, body::parse_body, ensure_method, write_audit};
use crate::core::audit::AuditAction;
use crate::core::auth::RequestContext;
use crate::core::error::ApiError;
use crate::core::permission::Operation;
use crate::core::record::{Record, field};
use crate::server::resource::Resource;
use crate::server::response::ApiResponse;
use crate::server::state::AppState;
use axum::http::Method;
use serde_json::Value;

/// `POST /{plural}/new`
///
/// The record is built from a fresh zero value of the model, so fields the
/// client omits take their defaults. Authorship always comes from the
/// principal.
pub async fn create(
    state: &AppState,
    resource: &Resource,
    ctx: &RequestContext,
    method: &Method,
    raw: &[u8],
) -> Result<ApiResponse<Record>, ApiError> {
    ensure_method(method, Method::POST)?;
    authorize(resource, ctx, Operation::Create)?;

    let mut patch = parse_body(raw, resource, &ctx.principal)?;
    patch.insert(field::CREATED_BY_ID.to_string(), Value::from(ctx.principal.id));
    patch.insert(field::UPDATED_BY_ID.to_string(), Value::from(ctx.principal.id));

    let blank = resource.vtable.blank()?;
    let mut record = resource.vtable.decode_onto(&blank, &patch)?;
    // The zero identity is not an identity
    record.remove(field::ID);

    let errors = resource.validators.validate(record.fields());
    if !errors.is_empty() {
        tracing::debug!(
            resource = resource.name(),
            trace_id = %ctx.trace_id,
            errors = %errors,
            "validation failed"
        );
        return Err(ApiError::Validation(errors));
    }

    let stored = state.store.create(&resource.collection, record).await?;
    write_audit(state, resource, ctx, AuditAction::Created, &stored, None).await;

    tracing::info!(
        resource = resource.name(),
        trace_id = %ctx.trace_id,
        principal_id = ctx.principal.id,
        id = stored.id(),
        "record created"
    );
    Ok(ApiResponse::created(
        stored,
        format!("{} has been created", resource.names.singular),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audit::HistoryEntry;
    use crate::crud::test_support::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_binds_author_and_ignores_forged_fields() {
        let fx = fixture();
        let body = br#"{"title": "ship it", "ID": 999, "created_by_id": 1, "priority": 3}"#;
        let response = create(&fx.state, &fx.task, &ctx(4, "visitor"), &Method::POST, body)
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::CREATED);
        assert_eq!(response.message, "Task has been created");
        let record = response.data;
        assert_ne!(record.id(), Some(999));
        assert_eq!(record.created_by(), Some(4));
        assert_eq!(record.get("updated_by_id"), Some(&json!(4)));
        assert_eq!(record.get("done"), Some(&json!(false)));
    }

    #[tokio::test]
    async fn test_create_writes_one_audit_entry() {
        let fx = fixture();
        let record = create(
            &fx.state,
            &fx.task,
            &ctx(4, "visitor"),
            &Method::POST,
            br#"{"title": "audited"}"#,
        )
        .await
        .unwrap()
        .data;

        let entries = history(&fx.state).await;
        assert_eq!(entries.len(), 1);
        let entry: HistoryEntry = entries[0].to_model().unwrap();
        assert_eq!(entry.action, AuditAction::Created);
        assert_eq!(entry.resource_name, "Task");
        assert_eq!(Some(entry.resource_id), record.id());
        assert_eq!(entry.trace_id, "trace-4");
        let detail: Value = serde_json::from_str(&entry.detail).unwrap();
        assert_eq!(detail["title"], json!("audited"));
    }

    #[tokio::test]
    async fn test_validation_failure_persists_nothing() {
        let fx = fixture();
        let err = create(&fx.state, &fx.task, &ctx(4, "visitor"), &Method::POST, b"{}")
            .await
            .unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors.get("title"), Some("title is required"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(history(&fx.state).await.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_types_are_a_bad_body() {
        let fx = fixture();
        let err = create(
            &fx.state,
            &fx.task,
            &ctx(1, "admin"),
            &Method::POST,
            br#"{"title": "x", "priority": "high"}"#,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidBody(_)));
    }

    #[tokio::test]
    async fn test_create_requires_permission() {
        let fx = fixture();
        let err = create(
            &fx.state,
            &fx.task,
            &ctx(5, "scheduler"),
            &Method::POST,
            br#"{"title": "x"}"#,
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "User is not allowed to create this resource");
    }
}
