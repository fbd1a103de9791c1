use std::collections::HashSet;

use docstore_core::{DEFAULT_PAGE_SIZE, DocStoreError, Document, ListQuery, PublicationState};
use futures_util::stream::{self, Stream, TryStreamExt};
use tracing::{debug, info, warn};

use crate::store::{Collection, DocumentStore};

/// Which variants a bulk delete removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteScope {
    /// Delete by bare documentId, removing every locale variant.
    WholeDocument,
    /// Delete only the given locale's variant of each document.
    Locale(String),
}

impl DeleteScope {
    fn locale(&self) -> Option<&str> {
        match self {
            DeleteScope::WholeDocument => None,
            DeleteScope::Locale(locale) => Some(locale),
        }
    }

    fn listing_query(&self) -> ListQuery {
        let query = ListQuery::new()
            .publication_state(PublicationState::Preview)
            .fields(&["documentId"]);
        match self {
            DeleteScope::WholeDocument => query,
            DeleteScope::Locale(locale) => query.locale(locale.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    pub discovered: usize,
    pub deleted: usize,
    pub failed: usize,
    /// Documents still listed after the pass, when verification ran.
    pub remaining: Option<usize>,
}

/// Streams every document of `collection` matching `query`, one page of
/// [`DEFAULT_PAGE_SIZE`] at a time. The stream ends once the page number
/// reaches the reported page count, or after the first page when the
/// response carries no pagination metadata. Re-invoke to restart.
pub fn list_all<'a, S>(
    store: &'a S,
    collection: Collection,
    query: ListQuery,
) -> impl Stream<Item = Result<Document, DocStoreError>> + 'a
where
    S: DocumentStore + ?Sized,
{
    stream::try_unfold(Some(1u32), move |next_page| {
        let query = query.clone();
        async move {
            let Some(page) = next_page else {
                return Ok(None);
            };
            let response = store
                .list(
                    collection,
                    &query.page(page).page_size(DEFAULT_PAGE_SIZE),
                )
                .await?;
            let next_page = match response.page_count() {
                Some(page_count) if page < page_count => Some(page + 1),
                _ => None,
            };
            let documents = stream::iter(
                response
                    .data
                    .into_iter()
                    .map(Ok::<Document, DocStoreError>),
            );
            Ok::<_, DocStoreError>(Some((documents, next_page)))
        }
    })
    .try_flatten()
}

/// Deletes every document in `scope`. Ids are deduplicated first since a
/// document is listed once per locale variant. A 404 means the document is
/// already gone and counts as deleted. Any other failing delete is logged
/// and counted without stopping the batch; only a failed listing aborts.
pub async fn delete_all<S>(
    store: &S,
    collection: Collection,
    scope: &DeleteScope,
    verify: bool,
) -> Result<DeleteSummary, DocStoreError>
where
    S: DocumentStore + ?Sized,
{
    let documents: Vec<Document> = list_all(store, collection, scope.listing_query())
        .try_collect()
        .await?;
    let document_ids = unique_document_ids(&documents);
    info!(
        collection = collection.as_str(),
        locale = scope.locale().unwrap_or("*"),
        count = document_ids.len(),
        "deleting documents"
    );

    let mut summary = DeleteSummary {
        discovered: document_ids.len(),
        ..DeleteSummary::default()
    };
    for document_id in &document_ids {
        match store.delete(collection, document_id, scope.locale()).await {
            Ok(()) => summary.deleted += 1,
            Err(err) if err.is_not_found() => {
                debug!(
                    collection = collection.as_str(),
                    document_id = %document_id,
                    "already gone"
                );
                summary.deleted += 1;
            }
            Err(err) => {
                summary.failed += 1;
                warn!(
                    collection = collection.as_str(),
                    document_id = %document_id,
                    locale = scope.locale().unwrap_or("*"),
                    "failed to delete: {err}"
                );
            }
        }
    }

    if verify {
        summary.remaining = Some(count_remaining(store, collection, scope).await?);
    }
    info!(
        collection = collection.as_str(),
        deleted = summary.deleted,
        failed = summary.failed,
        remaining = ?summary.remaining,
        "delete pass finished"
    );
    Ok(summary)
}

async fn count_remaining<S>(
    store: &S,
    collection: Collection,
    scope: &DeleteScope,
) -> Result<usize, DocStoreError>
where
    S: DocumentStore + ?Sized,
{
    let remaining: Vec<Document> = list_all(store, collection, scope.listing_query())
        .try_collect()
        .await?;
    Ok(remaining.len())
}

/// First-seen order; documents without an id are dropped.
fn unique_document_ids(documents: &[Document]) -> Vec<String> {
    let mut seen = HashSet::new();
    documents
        .iter()
        .filter_map(|doc| doc.document_id.as_deref())
        .filter(|id| !id.is_empty() && seen.insert(*id))
        .map(str::to_string)
        .collect()
}
