use std::collections::HashSet;

use docstore_core::{DocStoreError, Document, ListQuery, PublicationState};
use futures_util::TryStreamExt;
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::bulk::list_all;
use super::upsert::SyncEntry;
use crate::dataset::ArticleEntry;
use crate::store::{Collection, DocumentStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeaturedReport {
    pub examined: usize,
    pub featured: usize,
    pub unfeatured: usize,
    pub failed: usize,
}

impl FeaturedReport {
    pub fn updated(&self) -> usize {
        self.featured + self.unfeatured
    }
}

/// Dataset articles flagged as featured, by external key and by title.
struct FeaturedSet {
    keys: HashSet<String>,
    titles: HashSet<String>,
}

impl FeaturedSet {
    fn from_articles(articles: &[ArticleEntry]) -> Self {
        let featured = articles.iter().filter(|article| article.featured);
        let mut keys = HashSet::new();
        let mut titles = HashSet::new();
        for article in featured {
            if let Ok(key) = article.external_key() {
                keys.insert(key);
            }
            titles.insert(article.title.clone());
        }
        Self { keys, titles }
    }

    /// Remote records without an external key are matched by title.
    fn contains(&self, doc: &Document) -> bool {
        match doc.attribute_str("external_key").filter(|key| !key.is_empty()) {
            Some(key) => self.keys.contains(key),
            None => doc
                .attribute_str("title")
                .is_some_and(|title| self.titles.contains(title)),
        }
    }
}

/// Aligns the `featured` flag of every published article in `locale` with
/// the dataset, writing only the records whose flag differs.
pub async fn sync_featured<S>(
    store: &S,
    articles: &[ArticleEntry],
    locale: &str,
) -> Result<FeaturedReport, DocStoreError>
where
    S: DocumentStore + ?Sized,
{
    let wanted = FeaturedSet::from_articles(articles);
    let query = ListQuery::new()
        .publication_state(PublicationState::Live)
        .locale(locale)
        .fields(&["documentId", "title", "featured", "external_key"]);
    let existing: Vec<Document> = list_all(store, Collection::Articles, query)
        .try_collect()
        .await?;

    let mut report = FeaturedReport {
        examined: existing.len(),
        ..FeaturedReport::default()
    };
    for doc in &existing {
        let should_feature = wanted.contains(doc);
        if doc.attribute_bool("featured").unwrap_or(false) == should_feature {
            continue;
        }
        let Some(document_id) = doc.document_id.as_deref() else {
            continue;
        };
        let title = doc.attribute_str("title").unwrap_or_default();
        let mut data = Map::new();
        data.insert("featured".into(), Value::Bool(should_feature));
        match store
            .update(Collection::Articles, document_id, Some(locale), &data)
            .await
        {
            Ok(_) if should_feature => {
                report.featured += 1;
                info!(title, locale, "featured");
            }
            Ok(_) => {
                report.unfeatured += 1;
                info!(title, locale, "unfeatured");
            }
            Err(err) => {
                report.failed += 1;
                warn!(title, document_id, locale, "failed to set featured flag: {err}");
            }
        }
    }
    info!(
        locale,
        examined = report.examined,
        updated = report.updated(),
        failed = report.failed,
        "featured sync complete"
    );
    Ok(report)
}
