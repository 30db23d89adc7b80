//! Generic CRUD pipeline
//!
//! Each operation is a fixed sequence of checks run against a registered
//! [`Resource`]: verb, permission, ownership scope, body filtering,
//! validation, storage and audit. The functions here are transport-agnostic
//! and return an [`ApiResponse`] or an [`ApiError`]. The axum wrappers in
//! [`handlers`] pull their inputs from the request.

pub mod body;
pub mod create;
pub mod delete;
pub mod detail;
pub mod handlers;
pub mod hard_delete;
pub mod list;
pub mod query_builder;
pub mod timeline;
pub mod update;

pub use create::create;
pub use delete::delete;
pub use detail::detail;
pub use hard_delete::{hard_delete, hard_delete_many};
pub use list::list;
pub use timeline::timeline;
pub use update::update;

use crate::core::audit::AuditAction;
use crate::core::auth::RequestContext;
use crate::core::error::ApiError;
use crate::core::permission::{Operation, user_is_allowed};
use crate::core::principal::Principal;
use crate::core::query::Filter;
use crate::core::record::{Fields, Record, field};
use crate::server::resource::{OwnershipPolicy, Resource};
use crate::server::state::AppState;
use axum::http::Method;

/// Name of the resource a route serves, attached to its routes as an extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKey(pub String);

pub(crate) fn ensure_method(actual: &Method, expected: Method) -> Result<(), ApiError> {
    if *actual == expected {
        Ok(())
    } else {
        Err(ApiError::MethodNotAllowed)
    }
}

/// Fail with 403 unless one of the principal's roles grants `operation`
pub fn authorize(
    resource: &Resource,
    ctx: &RequestContext,
    operation: Operation,
) -> Result<(), ApiError> {
    if user_is_allowed(
        &resource.permissions,
        ctx.principal.roles.iter(),
        operation,
        resource.name(),
    ) {
        Ok(())
    } else {
        Err(ApiError::Forbidden { operation })
    }
}

/// Restrict `filter` to the records the principal may see
pub fn scope_filter(resource: &Resource, principal: &Principal, filter: Filter) -> Filter {
    if resource.is_exempt(principal) {
        return filter;
    }
    match resource.ownership {
        OwnershipPolicy::CreatedBy => filter.eq(field::CREATED_BY_ID, principal.id),
        OwnershipPolicy::SelfIdentity => filter.eq(field::ID, principal.id),
        OwnershipPolicy::Skip => filter,
    }
}

/// Path identities are positive integers; anything else cannot exist
pub(crate) fn parse_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse::<u64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or(ApiError::NotFound)
}

/// Load one record by identity within the principal's scope
pub(crate) async fn fetch_scoped(
    state: &AppState,
    resource: &Resource,
    principal: &Principal,
    id: u64,
) -> Result<Record, ApiError> {
    let filter = scope_filter(resource, principal, Filter::by_id(id));
    Ok(state.store.find_one(&resource.collection, &filter).await?)
}

/// Append an audit entry; failures are logged and never reach the client
pub(crate) async fn write_audit(
    state: &AppState,
    resource: &Resource,
    ctx: &RequestContext,
    action: AuditAction,
    record: &Record,
    diff: Option<&Fields>,
) {
    if let Err(err) = state
        .audit
        .record(action, &ctx.principal, resource.name(), record, diff, &ctx.trace_id)
        .await
    {
        tracing::error!(
            resource = resource.name(),
            trace_id = %ctx.trace_id,
            principal_id = ctx.principal.id,
            action = ?action,
            error = %err,
            "failed to append audit entry"
        );
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared fixtures for the pipeline unit tests

    use super::*;
    use crate::config::ServerConfig;
    use crate::core::audit::AuditLog;
    use crate::core::permission::{PermissionMap, Role};
    use crate::core::principal::RoleSet;
    use crate::core::store::Store;
    use crate::core::validation::validators::required;
    use crate::models::history_resource;
    use crate::server::registry::ResourceRegistry;
    use crate::server::resource::ResourceConfig;
    use crate::storage::InMemoryStore;
    use std::sync::Arc;

    crate::resource_model!(Task, "Task", {
        title: String,
        done: bool,
        priority: i64,
    });

    pub fn task_config() -> ResourceConfig {
        ResourceConfig::new::<Task>()
            .permissions(
                PermissionMap::new()
                    .grant_all(Role::admin())
                    .grant(
                        Role::visitor(),
                        [Operation::Read, Operation::Create, Operation::Update],
                    )
                    .grant(Role::scheduler(), [Operation::Read]),
            )
            .validate("title", required())
    }

    pub struct Fixture {
        pub state: AppState,
        pub task: Arc<Resource>,
    }

    pub fn fixture() -> Fixture {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let mut registry = ResourceRegistry::new();
        let task = registry.register(task_config().build().unwrap().0).unwrap();
        let history = registry
            .register(history_resource().build().unwrap().0)
            .unwrap();
        let state = AppState {
            registry: Arc::new(registry),
            audit: AuditLog::new(store.clone(), history.collection.clone()),
            store,
            verifier: None,
            config: Arc::new(ServerConfig::default()),
        };
        Fixture { state, task }
    }

    pub fn ctx(id: u64, roles: &str) -> RequestContext {
        RequestContext {
            principal: Principal::new(id, format!("user{}@example.com", id), RoleSet::parse_list(roles)),
            trace_id: format!("trace-{}", id),
        }
    }

    pub async fn history(state: &AppState) -> Vec<Record> {
        state
            .store
            .find_many(state.audit.collection(), &Filter::new(), &[], None)
            .await
            .unwrap()
    }
}
