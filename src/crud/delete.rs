use super::{authorize, ensure_method, fetch_scoped, write_audit};
use crate::core::audit::AuditAction;
use crate::core::auth::RequestContext;
use crate::core::error::ApiError;
use crate::core::permission::Operation;
use crate::core::record::Record;
use crate::server::resource::Resource;
use crate::server::response::ApiResponse;
use crate::server::state::AppState;
use axum::http::Method;

/// `DELETE /{plural}/{id}`: soft delete
pub async fn delete(
    state: &AppState,
    resource: &Resource,
    ctx: &RequestContext,
    method: &Method,
    id: u64,
) -> Result<ApiResponse<Record>, ApiError> {
    ensure_method(method, Method::DELETE)?;
    authorize(resource, ctx, Operation::Read)?;
    authorize(resource, ctx, Operation::Delete)?;

    let record = fetch_scoped(state, resource, &ctx.principal, id).await?;
    state.store.delete(&resource.collection, id).await?;
    write_audit(state, resource, ctx, AuditAction::Deleted, &record, None).await;

    tracing::info!(
        resource = resource.name(),
        trace_id = %ctx.trace_id,
        principal_id = ctx.principal.id,
        id = id,
        "record deleted"
    );
    Ok(ApiResponse::ok(
        record,
        format!("{} has been deleted", resource.names.singular),
    ))
}
