//! Request context middleware
//!
//! Resolves the principal and the trace id of every request before the
//! pipeline runs:
//!
//! 1. the trace id comes from `x-request-id` or is generated, and is echoed
//!    on the response
//! 2. a bearer token is verified by the configured [`TokenVerifier`]
//! 3. the verified subject is mapped to a stored [`User`], registering one on
//!    first login
//!
//! Any failure on the identity path degrades to the anonymous principal.
//!
//! [`TokenVerifier`]: crate::core::auth::TokenVerifier

use crate::core::audit::AuditAction;
use crate::core::auth::{Claims, RequestContext, TRACE_ID_HEADER, bearer_token};
use crate::core::error::ApiError;
use crate::core::permission::Role;
use crate::core::principal::{Principal, RoleSet};
use crate::core::query::Filter;
use crate::core::record::{Model, Record, field};
use crate::core::store::StoreError;
use crate::models::User;
use crate::server::state::AppState;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;

/// Name given to users registered without a name claim
pub const DEFAULT_USER_NAME: &str = "No Name";

pub async fn resolve_context(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let trace_id = request
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_string);

    let principal = match token {
        Some(token) => authenticate(&state, &token, &trace_id).await,
        None => Principal::anonymous(),
    };

    request.extensions_mut().insert(RequestContext {
        principal,
        trace_id: trace_id.clone(),
    });

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    response
}

async fn authenticate(state: &AppState, token: &str, trace_id: &str) -> Principal {
    let Some(verifier) = &state.verifier else {
        tracing::debug!(trace_id = trace_id, "no token verifier configured, ignoring token");
        return Principal::anonymous();
    };

    let claims = match verifier.verify_token(token).await {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(trace_id = trace_id, error = %err, "token rejected");
            return Principal::anonymous();
        }
    };

    match principal_for(state, &claims, trace_id).await {
        Ok(principal) => principal,
        Err(err) => {
            tracing::warn!(
                trace_id = trace_id,
                subject = %claims.subject,
                error = %err,
                "could not resolve user for verified token"
            );
            Principal::anonymous()
        }
    }
}

/// Map verified claims to the principal of a stored user
///
/// Lookup order is the subject, then the email claim. A user found by email
/// is linked to the subject. Without a match a visitor is registered.
/// Claims without an email resolve to the anonymous principal.
pub async fn principal_for(
    state: &AppState,
    claims: &Claims,
    trace_id: &str,
) -> Result<Principal, ApiError> {
    let users = state.registry.lookup::<User>()?;
    let store = state.store.as_ref();

    let by_subject = Filter::new().eq("external_id", claims.subject.as_str());
    match store.find_one(&users.collection, &by_subject).await {
        Ok(record) => return Ok(record.to_model::<User>()?.principal()),
        Err(StoreError::NotFound) => {}
        Err(err) => return Err(err.into()),
    }

    let Some(email) = claims.email.as_deref() else {
        tracing::debug!(trace_id = trace_id, "verified token carries no email claim");
        return Ok(Principal::anonymous());
    };

    let by_email = Filter::new().eq("email", email);
    match store.find_one(&users.collection, &by_email).await {
        Ok(record) => {
            let mut user = record.to_model::<User>()?;
            user.external_id = claims.subject.clone();
            let saved = store
                .save(&users.collection, Record::from_model(&user)?)
                .await?;
            tracing::info!(trace_id = trace_id, user_id = user.id(), "linked identity to user");
            return Ok(saved.to_model::<User>()?.principal());
        }
        Err(StoreError::NotFound) => {}
        Err(err) => return Err(err.into()),
    }

    let mut user = User::new(
        claims
            .name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER_NAME.to_string()),
        email.to_string(),
        claims.subject.clone(),
        RoleSet::new(),
    );
    user.set_role(Role::visitor())?;

    let mut record = Record::from_model(&user)?;
    record.remove(field::ID);
    let stored = store.create(&users.collection, record).await?;

    if let Err(err) = state
        .audit
        .record(
            AuditAction::Created,
            &Principal::system(),
            users.name(),
            &stored,
            None,
            trace_id,
        )
        .await
    {
        tracing::error!(trace_id = trace_id, error = %err, "failed to audit user registration");
    }

    let user = stored.to_model::<User>()?;
    tracing::info!(trace_id = trace_id, user_id = user.id(), "registered new user");
    Ok(user.principal())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audit::{AuditLog, HistoryEntry};
    use crate::core::store::Store;
    use crate::models::{history_resource, user_resource};
    use crate::server::registry::ResourceRegistry;
    use crate::storage::InMemoryStore;
    use std::sync::Arc;

    fn state() -> AppState {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let mut registry = ResourceRegistry::new();
        registry.register(user_resource().build().unwrap().0).unwrap();
        let history = registry
            .register(history_resource().build().unwrap().0)
            .unwrap();
        AppState {
            registry: Arc::new(registry),
            audit: AuditLog::new(store.clone(), history.collection.clone()),
            store,
            verifier: None,
            config: Arc::default(),
        }
    }

    async fn users(state: &AppState) -> Vec<User> {
        state
            .store
            .find_many("users", &Filter::new(), &[], None)
            .await
            .unwrap()
            .iter()
            .map(|r| r.to_model::<User>().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_first_login_registers_visitor() {
        let state = state();
        let claims = Claims::new("sub-9").with_email("new@example.com");
        let principal = principal_for(&state, &claims, "t-1").await.unwrap();

        assert!(principal.id > 0);
        assert_eq!(principal.label, "new@example.com");
        assert!(principal.roles.contains(&Role::visitor()));

        let stored = users(&state).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, DEFAULT_USER_NAME);
        assert_eq!(stored[0].external_id, "sub-9");

        let entries = state
            .store
            .find_many(state.audit.collection(), &Filter::new(), &[], None)
            .await
            .unwrap();
        let entry: HistoryEntry = entries[0].to_model().unwrap();
        assert_eq!(entry.actor_label, "system");
        assert_eq!(entry.resource_name, "User");

        // Second login finds the same user
        let again = principal_for(&state, &claims, "t-2").await.unwrap();
        assert_eq!(again.id, principal.id);
        assert_eq!(users(&state).await.len(), 1);
    }

    #[tokio::test]
    async fn test_existing_email_is_linked() {
        let state = state();
        let admin = User::new(
            "Root".to_string(),
            "root@example.com".to_string(),
            String::new(),
            RoleSet::parse_list("admin"),
        );
        let mut record = Record::from_model(&admin).unwrap();
        record.remove(field::ID);
        state.store.create("users", record).await.unwrap();

        let claims = Claims::new("sub-root").with_email("root@example.com");
        let principal = principal_for(&state, &claims, "t").await.unwrap();
        assert!(principal.is_admin());
        assert_eq!(users(&state).await[0].external_id, "sub-root");
    }

    #[tokio::test]
    async fn test_missing_email_is_anonymous() {
        let state = state();
        let principal = principal_for(&state, &Claims::new("sub-x"), "t").await.unwrap();
        assert!(principal.is_anonymous());
        assert!(users(&state).await.is_empty());
    }
}
