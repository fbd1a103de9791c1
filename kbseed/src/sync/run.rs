use std::collections::HashSet;

use tracing::{info, warn};

use super::Locales;
use super::bulk::{DeleteScope, DeleteSummary, delete_all};
use super::categories::{CategoryIdMap, CategoryReport, resolve_categories};
use super::upsert::{SkipReason, SyncEntry, UpsertOutcome, UpsertReport, upsert_entry};
use crate::dataset::CategoryDef;
use crate::store::{Collection, DocumentStore};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub created: usize,
    pub updated: usize,
    pub localized: usize,
    pub skipped: usize,
    /// Written but left as drafts because publishing failed.
    pub unpublished: usize,
    pub categories: CategoryReport,
    pub reports: Vec<UpsertReport>,
}

impl RunSummary {
    fn record(&mut self, report: UpsertReport) {
        self.processed += 1;
        match report.outcome {
            UpsertOutcome::Created => self.created += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Localized => self.localized += 1,
            UpsertOutcome::Skipped(_) => self.skipped += 1,
        }
        if report.written {
            self.succeeded += 1;
            if !report.published {
                self.unpublished += 1;
            }
        }
        self.reports.push(report);
    }

    pub fn failed(&self) -> usize {
        self.processed - self.succeeded
    }
}

/// Seeds `entries` into the active locale: categories first, then every
/// entry in order. Per-record failures are counted, never propagated.
pub async fn seed<S, E>(
    store: &S,
    entries: &[E],
    definitions: &[CategoryDef],
    locales: &Locales,
) -> RunSummary
where
    S: DocumentStore + ?Sized,
    E: SyncEntry,
{
    info!(
        count = entries.len(),
        locale = %locales.locale,
        base_locale = %locales.base_locale,
        "seeding entries"
    );
    let mut category_ids = CategoryIdMap::default();
    let categories = resolve_categories(
        store,
        entries.iter().filter_map(|entry| entry.category_ref()),
        definitions,
        locales,
        &mut category_ids,
    )
    .await;

    let mut summary = RunSummary {
        categories,
        ..RunSummary::default()
    };
    let mut seen_keys = HashSet::new();
    for entry in entries {
        if let Ok(key) = entry.external_key()
            && !seen_keys.insert(key.clone())
        {
            warn!(key = %key, title = entry.label(), "duplicate key in dataset, skipping");
            summary.record(UpsertReport::skipped(key, SkipReason::DuplicateKey));
            continue;
        }
        let report = upsert_entry(store, entry, locales, &category_ids).await;
        summary.record(report);
    }

    info!(
        processed = summary.processed,
        succeeded = summary.succeeded,
        created = summary.created,
        updated = summary.updated,
        localized = summary.localized,
        skipped = summary.skipped,
        unpublished = summary.unpublished,
        "synced {} of {} entries",
        summary.succeeded,
        summary.processed
    );
    summary
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionClear {
    pub collection: Collection,
    /// `None` when the collection could not be listed.
    pub summary: Option<DeleteSummary>,
}

/// Clears `collections` in order. A collection whose listing fails is
/// reported and the next one is still processed.
pub async fn clear<S>(
    store: &S,
    collections: &[Collection],
    scope: &DeleteScope,
    verify: bool,
) -> Vec<CollectionClear>
where
    S: DocumentStore + ?Sized,
{
    let mut results = Vec::with_capacity(collections.len());
    for &collection in collections {
        let summary = match delete_all(store, collection, scope, verify).await {
            Ok(summary) => Some(summary),
            Err(err) => {
                warn!(
                    collection = collection.as_str(),
                    "failed to list documents for deletion: {err}"
                );
                None
            }
        };
        results.push(CollectionClear {
            collection,
            summary,
        });
    }
    results
}
