use super::{authorize, body::parse_body, ensure_method, fetch_scoped, scope_filter, write_audit};
use crate::core::audit::{AuditAction, compare_fields};
use crate::core::auth::RequestContext;
use crate::core::error::ApiError;
use crate::core::permission::Operation;
use crate::core::query::Filter;
use crate::core::record::{Record, field};
use crate::server::resource::Resource;
use crate::server::response::ApiResponse;
use crate::server::state::AppState;
use axum::http::Method;
use serde_json::Value;

/// `PUT /{plural}/{id}`: partial update
///
/// The body is decoded onto the stored record, so fields the client leaves
/// out keep their persisted values. When nothing changes the store and the
/// audit log are left untouched.
pub async fn update(
    state: &AppState,
    resource: &Resource,
    ctx: &RequestContext,
    method: &Method,
    id: u64,
    raw: &[u8],
) -> Result<ApiResponse<Record>, ApiError> {
    ensure_method(method, Method::PUT)?;
    authorize(resource, ctx, Operation::Read)?;
    authorize(resource, ctx, Operation::Update)?;

    let current = fetch_scoped(state, resource, &ctx.principal, id).await?;
    let previous = previous_state(state, resource, ctx, id, &current).await;

    let mut patch = parse_body(raw, resource, &ctx.principal)?;
    patch.insert(field::UPDATED_BY_ID.to_string(), Value::from(ctx.principal.id));

    let updated = resource.vtable.decode_onto(&current, &patch)?;

    let errors = resource.validators.validate(updated.fields());
    if !errors.is_empty() {
        tracing::debug!(
            resource = resource.name(),
            trace_id = %ctx.trace_id,
            errors = %errors,
            "validation failed"
        );
        return Err(ApiError::Validation(errors));
    }

    let diff = compare_fields(previous.fields(), updated.fields());
    if diff.is_empty() {
        return Ok(ApiResponse::ok(
            current,
            format!("{} is up to date", resource.names.singular),
        ));
    }

    let saved = state.store.save(&resource.collection, updated).await?;
    write_audit(state, resource, ctx, AuditAction::Updated, &saved, Some(&diff)).await;

    tracing::info!(
        resource = resource.name(),
        trace_id = %ctx.trace_id,
        principal_id = ctx.principal.id,
        id = id,
        changed = diff.len(),
        "record updated"
    );
    Ok(ApiResponse::ok(
        saved,
        format!("{} has been updated", resource.names.singular),
    ))
}

/// Independent read of the stored state, used as the diff baseline
async fn previous_state(
    state: &AppState,
    resource: &Resource,
    ctx: &RequestContext,
    id: u64,
    current: &Record,
) -> Record {
    let filter = scope_filter(resource, &ctx.principal, Filter::by_id(id));
    match state.store.find_one(&resource.collection, &filter).await {
        Ok(record) => record,
        Err(err) => {
            tracing::warn!(
                resource = resource.name(),
                trace_id = %ctx.trace_id,
                id = id,
                error = %err,
                "previous state unavailable, diffing against the fetched record"
            );
            current.clone()
        }
    }
}
