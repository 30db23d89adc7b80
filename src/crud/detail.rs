use super::{authorize, ensure_method, fetch_scoped};
use crate::core::auth::RequestContext;
use crate::core::error::ApiError;
use crate::core::permission::Operation;
use crate::core::record::Record;
use crate::server::resource::Resource;
use crate::server::response::ApiResponse;
use crate::server::state::AppState;
use axum::http::Method;

/// `GET /{plural}/{id}`
pub async fn detail(
    state: &AppState,
    resource: &Resource,
    ctx: &RequestContext,
    method: &Method,
    id: u64,
) -> Result<ApiResponse<Record>, ApiError> {
    ensure_method(method, Method::GET)?;
    authorize(resource, ctx, Operation::Read)?;

    let record = fetch_scoped(state, resource, &ctx.principal, id).await?;
    Ok(ApiResponse::ok(
        record,
        format!("{} Detail", resource.names.singular),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::field;
    use crate::crud::test_support::*;

    async fn seed(fx: &Fixture, owner: u64) -> u64 {
        let mut record = Record::new();
        record.set("title", "write docs");
        record.set(field::CREATED_BY_ID, owner);
        let stored = fx.state.store.create(&fx.task.collection, record).await.unwrap();
        stored.id().unwrap()
    }

    #[tokio::test]
    async fn test_owner_reads_record() {
        let fx = fixture();
        let id = seed(&fx, 2).await;
        let response = detail(&fx.state, &fx.task, &ctx(2, "visitor"), &Method::GET, id)
            .await
            .unwrap();
        assert_eq!(response.data.id(), Some(id));
        assert_eq!(response.message, "Task Detail");
    }

    #[tokio::test]
    async fn test_foreign_record_is_not_found() {
        let fx = fixture();
        let id = seed(&fx, 2).await;
        assert!(matches!(
            detail(&fx.state, &fx.task, &ctx(3, "visitor"), &Method::GET, id).await,
            Err(ApiError::NotFound)
        ));
        assert!(detail(&fx.state, &fx.task, &ctx(1, "admin"), &Method::GET, id)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_missing_record() {
        let fx = fixture();
        assert!(matches!(
            detail(&fx.state, &fx.task, &ctx(1, "admin"), &Method::GET, 99).await,
            Err(ApiError::NotFound)
        ));
    }
}
