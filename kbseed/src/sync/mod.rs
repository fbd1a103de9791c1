pub mod bulk;
pub mod categories;
pub mod featured;
pub mod keys;
pub mod partition;
pub mod run;
pub mod upsert;

#[cfg(test)]
mod memory_store;

use docstore_core::{DocStoreError, Document, ListQuery, PublicationState};
use tracing::warn;

use crate::store::{Collection, DocumentStore};

/// Active locale of a run and the locale that owns base-only fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locales {
    pub locale: String,
    pub base_locale: String,
}

impl Locales {
    pub fn new(locale: impl Into<String>, base_locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            base_locale: base_locale.into(),
        }
    }

    pub fn is_base(&self) -> bool {
        self.locale == self.base_locale
    }
}

/// Looks up the variant of `external_key` in `locale`, drafts included:
/// a variant whose publish failed still exists and must be updated.
///
/// More than one match breaks the key uniqueness invariant; the first one
/// wins and the rest are reported.
pub(crate) async fn find_by_external_key<S>(
    store: &S,
    collection: Collection,
    external_key: &str,
    locale: &str,
) -> Result<Option<Document>, DocStoreError>
where
    S: DocumentStore + ?Sized,
{
    let query = ListQuery::new()
        .filter_eq("external_key", external_key)
        .locale(locale)
        .page_size(1)
        .fields(&["documentId"])
        .publication_state(PublicationState::Preview);
    let page = store.list(collection, &query).await?;
    let total = page
        .meta
        .as_ref()
        .and_then(|meta| meta.pagination.as_ref())
        .map(|pagination| pagination.total)
        .unwrap_or(0);
    if total > 1 {
        warn!(
            collection = collection.as_str(),
            key = external_key,
            locale,
            matches = total,
            "duplicate documents share one external key, using the first"
        );
    }
    Ok(page.data.into_iter().next())
}
