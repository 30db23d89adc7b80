//! Permanent removal
//!
//! Administrative path outside the standard pipeline. The last known state
//! of every target is captured before the irreversible delete and written to
//! the audit log as a `hard-deleted` entry.

use super::{authorize, ensure_method, parse_id, write_audit};
use crate::core::audit::AuditAction;
use crate::core::auth::RequestContext;
use crate::core::error::ApiError;
use crate::core::permission::Operation;
use crate::core::query::Filter;
use crate::core::record::Record;
use crate::server::resource::Resource;
use crate::server::response::ApiResponse;
use crate::server::state::AppState;
use axum::http::Method;

/// Purging needs an admin principal and delete permission on a resource
/// that is not append-only
fn ensure_purgeable(resource: &Resource, ctx: &RequestContext) -> Result<(), ApiError> {
    if !ctx.principal.is_admin() || resource.append_only {
        return Err(ApiError::Forbidden {
            operation: Operation::Delete,
        });
    }
    authorize(resource, ctx, Operation::Delete)
}

/// Permanently remove `targets`, soft-deleted or not
///
/// Each target is re-read without scope to snapshot its state. A target that
/// can no longer be read is audited with the given record instead.
pub async fn hard_delete_many(
    state: &AppState,
    resource: &Resource,
    ctx: &RequestContext,
    targets: &[Record],
) -> Result<usize, ApiError> {
    ensure_purgeable(resource, ctx)?;

    let mut snapshots = Vec::with_capacity(targets.len());
    for target in targets {
        let Some(id) = target.id() else {
            return Err(ApiError::BadRequest("record has no identity".to_string()));
        };
        let snapshot = match state
            .store
            .find_one(&resource.collection, &Filter::by_id(id).unscoped())
            .await
        {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(
                    resource = resource.name(),
                    trace_id = %ctx.trace_id,
                    id = id,
                    error = %err,
                    "no stored state before hard delete, auditing the given record"
                );
                target.clone()
            }
        };
        snapshots.push((id, snapshot));
    }

    let ids: Vec<u64> = snapshots.iter().map(|(id, _)| *id).collect();
    let removed = state
        .store
        .unscoped_delete(&resource.collection, &ids)
        .await?;

    for (_, snapshot) in &snapshots {
        write_audit(state, resource, ctx, AuditAction::HardDeleted, snapshot, None).await;
    }

    tracing::info!(
        resource = resource.name(),
        trace_id = %ctx.trace_id,
        principal_id = ctx.principal.id,
        removed = removed,
        "records permanently deleted"
    );
    Ok(removed)
}

/// `DELETE /{plural}/{id}/purge`
pub async fn hard_delete(
    state: &AppState,
    resource: &Resource,
    ctx: &RequestContext,
    method: &Method,
    raw_id: &str,
) -> Result<ApiResponse<Record>, ApiError> {
    ensure_method(method, Method::DELETE)?;
    ensure_purgeable(resource, ctx)?;
    let id = parse_id(raw_id)?;

    let record = state
        .store
        .find_one(&resource.collection, &Filter::by_id(id).unscoped())
        .await?;
    hard_delete_many(state, resource, ctx, std::slice::from_ref(&record)).await?;

    Ok(ApiResponse::ok(
        record,
        format!("{} has been permanently deleted", resource.names.singular),
    ))
}
