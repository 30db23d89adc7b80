use super::{authorize, ensure_method, query_builder::find_page, scope_filter};
use crate::core::auth::RequestContext;
use crate::core::error::ApiError;
use crate::core::permission::Operation;
use crate::core::query::{ListParams, Pagination};
use crate::core::record::Record;
use crate::server::resource::Resource;
use crate::server::response::ApiResponse;
use crate::server::state::AppState;
use axum::http::Method;

/// `GET /{plural}`: one page of the records visible to the principal
///
/// Storage failures are reported as 404 so internal detail is not exposed.
pub async fn list(
    state: &AppState,
    resource: &Resource,
    ctx: &RequestContext,
    method: &Method,
    query: &[(String, String)],
) -> Result<ApiResponse<Vec<Record>>, ApiError> {
    ensure_method(method, Method::GET)?;
    authorize(resource, ctx, Operation::Read)?;

    let params = ListParams::from_query(
        query.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        &state.config.pagination,
    )?;
    params.check_fields(resource.field_names())?;

    let filter = scope_filter(resource, &ctx.principal, params.filter());
    let (records, total) = find_page(
        state.store.as_ref(),
        &resource.collection,
        &filter,
        &params.order,
        params.window(),
    )
    .await
    .map_err(|err| {
        tracing::warn!(
            resource = resource.name(),
            trace_id = %ctx.trace_id,
            error = %err,
            "list query failed"
        );
        ApiError::NotFound
    })?;

    Ok(
        ApiResponse::ok(records, format!("{} List", resource.names.plural))
            .with_pagination(Pagination::new(params.page, params.limit, total)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crud::test_support::*;
    use crate::core::record::field;
    use serde_json::json;

    fn q(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    async fn seed(fx: &Fixture, owner: u64, n: usize) {
        for i in 0..n {
            let mut record = Record::new();
            record.set("title", format!("task {}", i));
            record.set("priority", i as i64);
            record.set(field::CREATED_BY_ID, owner);
            fx.state.store.create(&fx.task.collection, record).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_visitor_sees_only_own_records() {
        let fx = fixture();
        seed(&fx, 2, 1).await;
        seed(&fx, 3, 5).await;

        let visitor = list(&fx.state, &fx.task, &ctx(2, "visitor"), &Method::GET, &[])
            .await
            .unwrap();
        assert_eq!(visitor.data.len(), 1);
        assert_eq!(visitor.pagination.as_ref().unwrap().total, 1);

        let admin = list(&fx.state, &fx.task, &ctx(1, "admin"), &Method::GET, &[])
            .await
            .unwrap();
        assert_eq!(admin.data.len(), 6);
        assert_eq!(admin.message, "Tasks List");
    }

    #[tokio::test]
    async fn test_pagination_and_order() {
        let fx = fixture();
        seed(&fx, 1, 13).await;

        let page = list(
            &fx.state,
            &fx.task,
            &ctx(1, "admin"),
            &Method::GET,
            &q(&[("page", "2"), ("limit", "5"), ("order", "priority")]),
        )
        .await
        .unwrap();
        assert_eq!(page.data.len(), 5);
        assert_eq!(page.data[0].get("priority"), Some(&json!(5)));
        let pagination = page.pagination.unwrap();
        assert_eq!(pagination.total_pages, 3);
        assert!(pagination.has_next && pagination.has_prev);
    }

    #[tokio::test]
    async fn test_unknown_filter_is_rejected() {
        let fx = fixture();
        let err = list(
            &fx.state,
            &fx.task,
            &ctx(1, "admin"),
            &Method::GET,
            &q(&[("colour", "red")]),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn test_verb_and_permission() {
        let fx = fixture();
        assert!(matches!(
            list(&fx.state, &fx.task, &ctx(1, "admin"), &Method::POST, &[]).await,
            Err(ApiError::MethodNotAllowed)
        ));
        assert!(matches!(
            list(&fx.state, &fx.task, &ctx(0, ""), &Method::GET, &[]).await,
            Err(ApiError::Forbidden { operation: Operation::Read })
        ));
    }
}
