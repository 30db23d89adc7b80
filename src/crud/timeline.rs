use super::{authorize, ensure_method};
use crate::core::audit::HistoryEntry;
use crate::core::auth::RequestContext;
use crate::core::error::ApiError;
use crate::core::permission::Operation;
use crate::core::query::{ListParams, Pagination};
use crate::core::record::Record;
use crate::server::response::ApiResponse;
use crate::server::state::AppState;
use axum::http::Method;

/// `GET {prefix}/timeline?resource_name=..&resource_id=..`
///
/// Audit entries of one record, newest first. The principal needs read on
/// the history resource and on the queried resource.
pub async fn timeline(
    state: &AppState,
    ctx: &RequestContext,
    method: &Method,
    query: &[(String, String)],
) -> Result<ApiResponse<Vec<Record>>, ApiError> {
    ensure_method(method, Method::GET)?;

    let history = state.registry.lookup::<HistoryEntry>()?;
    authorize(&history, ctx, Operation::Read)?;

    let value_of = |key: &str| {
        query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    };
    let resource_name =
        value_of("resource_name").ok_or(ApiError::BadRequest("Resource Name is required".into()))?;
    let resource_id = value_of("resource_id")
        .and_then(|raw| raw.parse::<u64>().ok())
        .ok_or(ApiError::BadRequest("Resource Id is required".into()))?;

    let target = state.registry.lookup_by_name(resource_name)?;
    authorize(&target, ctx, Operation::Read)?;

    let params = ListParams::from_query(
        query
            .iter()
            .filter(|(k, _)| k == "page" || k == "limit")
            .map(|(k, v)| (k.as_str(), v.as_str())),
        &state.config.pagination,
    )?;

    let (entries, total) = state
        .audit
        .timeline(target.name(), resource_id, params.window())
        .await
        .map_err(|err| {
            tracing::warn!(
                resource = target.name(),
                trace_id = %ctx.trace_id,
                error = %err,
                "timeline query failed"
            );
            ApiError::NotFound
        })?;

    Ok(ApiResponse::ok(entries, "resource timeline")
        .with_pagination(Pagination::new(params.page, params.limit, total)))
}
