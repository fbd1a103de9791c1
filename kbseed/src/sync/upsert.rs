use docstore_core::DocStoreError;
use serde_json::{Map, Value};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};

use super::categories::{CategoryIdMap, CategoryRef};
use super::keys::{KeyError, entry_external_key};
use super::partition::{EntryKind, FieldPartition, WriteMode};
use super::{Locales, find_by_external_key};
use crate::store::{Collection, DocumentStore};

/// A dataset record the upsert engine can write.
pub trait SyncEntry {
    fn kind(&self) -> EntryKind;

    fn explicit_key(&self) -> Option<&str>;

    /// Human label (title or name) used for key derivation and logs.
    fn label(&self) -> &str;

    fn category_ref(&self) -> Option<CategoryRef<'_>>;

    /// Field values excluding `external_key` and `category`.
    fn field_values(&self) -> Map<String, Value>;

    fn external_key(&self) -> Result<String, KeyError> {
        entry_external_key(self.explicit_key(), self.label(), self.kind().key_prefix())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    EmptyKey,
    DuplicateKey,
    MissingBase,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    Localized,
    Skipped(SkipReason),
}

/// Result of one entry. `written` covers the primary write, `published`
/// the follow-up publish, which may fail on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertReport {
    pub key: String,
    pub outcome: UpsertOutcome,
    pub written: bool,
    pub published: bool,
}

impl UpsertReport {
    fn written(key: String, outcome: UpsertOutcome, published: bool) -> Self {
        Self {
            key,
            outcome,
            written: true,
            published,
        }
    }

    pub(crate) fn skipped(key: String, reason: SkipReason) -> Self {
        Self {
            key,
            outcome: UpsertOutcome::Skipped(reason),
            written: false,
            published: false,
        }
    }
}

#[derive(Debug, Error)]
enum UpsertError {
    #[error("store error: {0}")]
    Store(#[from] DocStoreError),
    #[error("store returned a document without documentId")]
    MissingDocumentId,
}

/// Creates, updates or localizes one entry in `locales.locale`, then
/// publishes it. Never fails: problems end up as a skipped report.
pub async fn upsert_entry<S, E>(
    store: &S,
    entry: &E,
    locales: &Locales,
    categories: &CategoryIdMap,
) -> UpsertReport
where
    S: DocumentStore + ?Sized,
    E: SyncEntry + ?Sized,
{
    let key = match entry.external_key() {
        Ok(key) => key,
        Err(err) => {
            warn!(title = entry.label(), locale = %locales.locale, "skipping entry: {err}");
            return UpsertReport::skipped(String::new(), SkipReason::EmptyKey);
        }
    };
    match try_upsert(store, entry, &key, locales, categories).await {
        Ok(report) => report,
        Err(err) => {
            warn!(
                key = %key,
                title = entry.label(),
                locale = %locales.locale,
                "failed to sync entry: {err}"
            );
            UpsertReport::skipped(key, SkipReason::Failed(err.to_string()))
        }
    }
}

async fn try_upsert<S, E>(
    store: &S,
    entry: &E,
    key: &str,
    locales: &Locales,
    categories: &CategoryIdMap,
) -> Result<UpsertReport, UpsertError>
where
    S: DocumentStore + ?Sized,
    E: SyncEntry + ?Sized,
{
    let collection = entry.kind().collection();
    let partition = FieldPartition::for_kind(entry.kind());
    let locale = locales.locale.as_str();

    let mut values = entry.field_values();
    values.insert("external_key".into(), Value::String(key.to_string()));
    if let Some(category) = entry.category_ref() {
        match categories.get(category) {
            Some(id) => {
                values.insert("category".into(), Value::from(id));
            }
            None => warn!(
                key,
                category = category.label(),
                locale,
                "category unresolved, leaving relation unset"
            ),
        }
    }

    if let Some(existing) = find_by_external_key(store, collection, key, locale).await? {
        let document_id = existing
            .document_id
            .ok_or(UpsertError::MissingDocumentId)?;
        let payload = partition.payload(&values, WriteMode::for_update(locales), locale);
        store
            .update(collection, &document_id, Some(locale), &payload)
            .await?;
        let published = publish(store, collection, &document_id, locale).await;
        info!(key, title = entry.label(), locale, "updated");
        return Ok(UpsertReport::written(
            key.to_string(),
            UpsertOutcome::Updated,
            published,
        ));
    }

    if locales.is_base() {
        let payload = partition.payload(&values, WriteMode::Create, locale);
        let created = store.create(collection, &payload).await?;
        let document_id = created.document_id.ok_or(UpsertError::MissingDocumentId)?;
        let published = publish(store, collection, &document_id, locale).await;
        info!(key, title = entry.label(), locale, "created");
        return Ok(UpsertReport::written(
            key.to_string(),
            UpsertOutcome::Created,
            published,
        ));
    }

    let Some(base) = find_by_external_key(store, collection, key, &locales.base_locale).await?
    else {
        warn!(
            key,
            title = entry.label(),
            locale,
            base_locale = %locales.base_locale,
            "missing base entry for key {key}"
        );
        return Ok(UpsertReport::skipped(
            key.to_string(),
            SkipReason::MissingBase,
        ));
    };
    let document_id = base.document_id.ok_or(UpsertError::MissingDocumentId)?;
    let payload = partition.payload(&values, WriteMode::UpdateVariant, locale);
    store
        .update(collection, &document_id, Some(locale), &payload)
        .await?;
    let published = publish(store, collection, &document_id, locale).await;
    info!(key, title = entry.label(), locale, "localized");
    Ok(UpsertReport::written(
        key.to_string(),
        UpsertOutcome::Localized,
        published,
    ))
}

/// Sets `publishedAt` on the locale variant. Failures only leave the entry
/// as a draft, so they are logged and reported as `false`.
async fn publish<S>(store: &S, collection: Collection, document_id: &str, locale: &str) -> bool
where
    S: DocumentStore + ?Sized,
{
    let timestamp = match OffsetDateTime::now_utc().format(&Rfc3339) {
        Ok(timestamp) => timestamp,
        Err(err) => {
            warn!(document_id, locale, "cannot format publish timestamp: {err}");
            return false;
        }
    };
    let mut data = Map::new();
    data.insert("publishedAt".into(), Value::String(timestamp));
    match store
        .update(collection, document_id, Some(locale), &data)
        .await
    {
        Ok(_) => true,
        Err(err) => {
            warn!(
                collection = collection.as_str(),
                document_id, locale, "publish failed, entry stays a draft: {err}"
            );
            false
        }
    }
}
