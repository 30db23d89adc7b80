//! Paginated query execution

use crate::core::query::{Filter, OrderTerm, Window};
use crate::core::record::Record;
use crate::core::store::{Store, StoreError};

/// Count, then fetch one window, under the same filter
///
/// The two reads are independent round-trips. Under concurrent writes the
/// returned total and page may disagree.
pub async fn find_page(
    store: &dyn Store,
    collection: &str,
    filter: &Filter,
    order: &[OrderTerm],
    window: Window,
) -> Result<(Vec<Record>, usize), StoreError> {
    let total = store.count(collection, filter).await?;
    let records = store
        .find_many(collection, filter, order, Some(window))
        .await?;
    Ok((records, total))
}
