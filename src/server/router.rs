//! Route generation
//!
//! Each registered resource gets the same route set under the API prefix:
//!
//! - `GET    /{plural}`             list
//! - `POST   /{plural}/new`         create
//! - `GET    /{plural}/schema`      field names and kinds
//! - `GET    /{plural}/{id}`        detail
//! - `PUT    /{plural}/{id}`        update
//! - `DELETE /{plural}/{id}`        soft delete
//! - `DELETE /{plural}/{id}/purge`  hard delete (admins)
//!
//! plus the resource's extra routes. `{plural}` is the kebab-case plural.
//! The prefix itself serves the API index and `/timeline`.

use crate::crud::ResourceKey;
use crate::crud::handlers::{self, method_not_allowed};
use crate::server::context::resolve_context;
use crate::server::resource::{Resource, ResourceRoutes, StandardHandler};
use crate::server::response::ApiResponse;
use crate::server::state::AppState;
use axum::extract::State;
use axum::routing::{MethodRouter, delete, get, post, put};
use axum::{Extension, Json, Router, middleware};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// One route of the API index
#[derive(Debug, Clone, Serialize)]
pub struct Endpoint {
    pub method: &'static str,
    pub path: String,
    pub handler: &'static str,
}

/// Routes generated for a resource mounted under `prefix`
pub fn endpoints(prefix: &str, resource: &Resource) -> Vec<Endpoint> {
    let base = format!("{}/{}", prefix, resource.names.kebab_plural);
    let endpoint = |method, suffix: &str, handler| Endpoint {
        method,
        path: format!("{}{}", base, suffix),
        handler,
    };
    let mut endpoints = vec![
        endpoint("GET", "", "list"),
        endpoint("POST", "/new", "create"),
        endpoint("GET", "/schema", "schema"),
        endpoint("GET", "/{id}", "detail"),
        endpoint("PUT", "/{id}", "update"),
        endpoint("DELETE", "/{id}", "delete"),
    ];
    if !resource.append_only {
        endpoints.push(endpoint("DELETE", "/{id}/purge", "hard-delete"));
    }
    endpoints
}

fn standard(
    routes: &ResourceRoutes,
    which: StandardHandler,
    default: MethodRouter<AppState>,
) -> MethodRouter<AppState> {
    routes.override_for(which).cloned().unwrap_or(default)
}

/// Routes of one resource, relative to the API prefix
///
/// Overrides replace the standard handler for their verb; an override must
/// use the same verb and may not set its own method fallback.
pub fn resource_routes(resource: &Resource, routes: ResourceRoutes) -> Router<AppState> {
    let base = format!("/{}", resource.names.kebab_plural);

    let by_id = standard(&routes, StandardHandler::Detail, get(handlers::detail))
        .merge(standard(&routes, StandardHandler::Update, put(handlers::update)))
        .merge(standard(&routes, StandardHandler::Delete, delete(handlers::delete)))
        .fallback(method_not_allowed);

    let mut router = Router::new()
        .route(
            &base,
            standard(&routes, StandardHandler::List, get(handlers::list))
                .fallback(method_not_allowed),
        )
        .route(
            &format!("{}/new", base),
            standard(&routes, StandardHandler::Create, post(handlers::create))
                .fallback(method_not_allowed),
        )
        .route(
            &format!("{}/schema", base),
            get(handlers::schema).fallback(method_not_allowed),
        )
        .route(&format!("{}/{{id}}", base), by_id);

    if !resource.append_only {
        router = router.route(
            &format!("{}/{{id}}/purge", base),
            delete(handlers::hard_delete).fallback(method_not_allowed),
        );
    }

    for (path, method_router) in routes.extra {
        router = router.route(&format!("{}{}", base, path), method_router);
    }

    router.layer(Extension(ResourceKey(resource.name().to_string())))
}

/// `GET {prefix}`: registered resources and their endpoints
async fn api_index(State(state): State<AppState>) -> ApiResponse<Vec<Value>> {
    let prefix = state.config.normalized_prefix();
    let resources = state
        .registry
        .iter()
        .map(|resource| {
            json!({
                "name": resource.name(),
                "names": resource.names,
                "endpoints": endpoints(prefix, resource),
            })
        })
        .collect();
    ApiResponse::ok(resources, "API index")
}

/// Health check endpoint handler
async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
    }))
}

fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
}

/// Assemble the application router
///
/// Resource routes, the index and the timeline are nested under the API
/// prefix. Every route, custom ones included, runs behind the request
/// context middleware, HTTP tracing and CORS.
pub fn build_router(
    state: AppState,
    resources: Vec<(Arc<Resource>, ResourceRoutes)>,
    custom_routes: Vec<Router>,
) -> Router {
    let prefix = state.config.normalized_prefix().to_string();

    let mut api = Router::new().route(
        "/timeline",
        get(handlers::timeline).fallback(method_not_allowed),
    );
    for (resource, routes) in resources {
        api = api.merge(resource_routes(&resource, routes));
    }

    let index_path = if prefix.is_empty() { "/" } else { prefix.as_str() };
    let app = health_routes().route(index_path, get(api_index));
    let app = if prefix.is_empty() {
        app.merge(api)
    } else {
        app.nest(&prefix, api)
    };

    let mut app = app.with_state(state.clone());
    for custom in custom_routes {
        app = app.merge(custom);
    }

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .layer(middleware::from_fn_with_state(state, resolve_context)),
    )
}
