//! Axum handlers for the generic pipeline
//!
//! Every resource route carries a [`ResourceKey`] extension naming the
//! resource it serves, so one set of handlers works for all models.

use super::{ResourceKey, authorize, ensure_method, parse_id};
use crate::core::auth::RequestContext;
use crate::core::error::ApiError;
use crate::core::permission::Operation;
use crate::core::record::Record;
use crate::server::resource::Resource;
use crate::server::response::ApiResponse;
use crate::server::state::AppState;
use axum::Extension;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::Method;
use serde_json::{Map, Value};
use std::sync::Arc;

type Params = Query<Vec<(String, String)>>;

fn resolve(state: &AppState, key: &ResourceKey) -> Result<Arc<Resource>, ApiError> {
    Ok(state.registry.lookup_by_name(&key.0)?)
}

pub async fn list(
    State(state): State<AppState>,
    Extension(key): Extension<ResourceKey>,
    ctx: RequestContext,
    method: Method,
    Query(query): Params,
) -> Result<ApiResponse<Vec<Record>>, ApiError> {
    let resource = resolve(&state, &key)?;
    super::list(&state, &resource, &ctx, &method, &query).await
}

pub async fn detail(
    State(state): State<AppState>,
    Extension(key): Extension<ResourceKey>,
    ctx: RequestContext,
    method: Method,
    Path(id): Path<String>,
) -> Result<ApiResponse<Record>, ApiError> {
    let resource = resolve(&state, &key)?;
    let id = parse_id(&id)?;
    super::detail(&state, &resource, &ctx, &method, id).await
}

pub async fn create(
    State(state): State<AppState>,
    Extension(key): Extension<ResourceKey>,
    ctx: RequestContext,
    method: Method,
    body: Bytes,
) -> Result<ApiResponse<Record>, ApiError> {
    let resource = resolve(&state, &key)?;
    super::create(&state, &resource, &ctx, &method, &body).await
}

pub async fn update(
    State(state): State<AppState>,
    Extension(key): Extension<ResourceKey>,
    ctx: RequestContext,
    method: Method,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<ApiResponse<Record>, ApiError> {
    let resource = resolve(&state, &key)?;
    let id = parse_id(&id)?;
    super::update(&state, &resource, &ctx, &method, id, &body).await
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(key): Extension<ResourceKey>,
    ctx: RequestContext,
    method: Method,
    Path(id): Path<String>,
) -> Result<ApiResponse<Record>, ApiError> {
    let resource = resolve(&state, &key)?;
    let id = parse_id(&id)?;
    super::delete(&state, &resource, &ctx, &method, id).await
}

pub async fn hard_delete(
    State(state): State<AppState>,
    Extension(key): Extension<ResourceKey>,
    ctx: RequestContext,
    method: Method,
    Path(id): Path<String>,
) -> Result<ApiResponse<Record>, ApiError> {
    let resource = resolve(&state, &key)?;
    super::hard_delete(&state, &resource, &ctx, &method, &id).await
}

/// `GET /{plural}/schema`: field names and their JSON kinds
pub async fn schema(
    State(state): State<AppState>,
    Extension(key): Extension<ResourceKey>,
    ctx: RequestContext,
    method: Method,
) -> Result<ApiResponse<Map<String, Value>>, ApiError> {
    ensure_method(&method, Method::GET)?;
    let resource = resolve(&state, &key)?;
    authorize(&resource, &ctx, Operation::Read)?;

    let blank = resource.vtable.blank()?;
    let fields = blank
        .fields()
        .iter()
        .map(|(name, value)| (name.clone(), Value::from(json_kind(value))))
        .collect();
    Ok(ApiResponse::ok(
        fields,
        format!("Schema for {}", resource.names.singular),
    ))
}

pub async fn timeline(
    State(state): State<AppState>,
    ctx: RequestContext,
    method: Method,
    Query(query): Params,
) -> Result<ApiResponse<Vec<Record>>, ApiError> {
    super::timeline(&state, &ctx, &method, &query).await
}

/// Method fallback of every pipeline route
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
