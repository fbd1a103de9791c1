use std::collections::{HashMap, HashSet};

use docstore_core::{DocStoreError, Document};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::keys::{KeyError, category_external_key};
use super::partition::{EntryKind, FieldPartition, WriteMode};
use super::{Locales, find_by_external_key};
use crate::dataset::CategoryDef;
use crate::store::{Collection, DocumentStore};

/// How an entry points at its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryRef<'a> {
    Key(&'a str),
    Name(&'a str),
}

impl<'a> CategoryRef<'a> {
    /// The key or name as written in the dataset.
    pub fn label(&self) -> &'a str {
        match self {
            CategoryRef::Key(key) => key,
            CategoryRef::Name(name) => name,
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid category key: {0}")]
    Key(#[from] KeyError),
    #[error("store error: {0}")]
    Store(#[from] DocStoreError),
    #[error("category {0} is not defined in the dataset and does not exist remotely")]
    Undefined(String),
    #[error("store returned a category without {0}")]
    MissingIdentifier(&'static str),
}

/// Owned form of a [`CategoryRef`]. A key and a name with the same text
/// are different references.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CategoryLabel {
    Key(String),
    Name(String),
}

impl From<CategoryRef<'_>> for CategoryLabel {
    fn from(category: CategoryRef<'_>) -> Self {
        match category {
            CategoryRef::Key(key) => CategoryLabel::Key(key.to_string()),
            CategoryRef::Name(name) => CategoryLabel::Name(name.to_string()),
        }
    }
}

/// Per-run reference to remote id map. Each reference is resolved at most
/// once; failed references are remembered so they are not retried within
/// the run.
#[derive(Debug, Default)]
pub struct CategoryIdMap {
    ids: HashMap<CategoryLabel, i64>,
    attempted: HashSet<CategoryLabel>,
}

impl CategoryIdMap {
    pub fn get(&self, category: CategoryRef<'_>) -> Option<i64> {
        self.ids.get(&CategoryLabel::from(category)).copied()
    }

    fn is_attempted(&self, category: CategoryRef<'_>) -> bool {
        self.attempted.contains(&CategoryLabel::from(category))
    }

    fn record(&mut self, category: CategoryRef<'_>, id: Option<i64>) {
        let label = CategoryLabel::from(category);
        if let Some(id) = id {
            self.ids.entry(label.clone()).or_insert(id);
        }
        self.attempted.insert(label);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Existing,
    Created,
    Localized,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryReport {
    pub existing: usize,
    pub created: usize,
    pub localized: usize,
    pub unresolved: usize,
}

impl CategoryReport {
    pub fn resolved(&self) -> usize {
        self.existing + self.created + self.localized
    }
}

/// Makes sure every referenced category exists in the active locale and
/// records its id in `ids`. Failures are logged per category and leave the
/// reference out of the map.
pub async fn resolve_categories<'a, S, I>(
    store: &S,
    refs: I,
    definitions: &[CategoryDef],
    locales: &Locales,
    ids: &mut CategoryIdMap,
) -> CategoryReport
where
    S: DocumentStore + ?Sized,
    I: IntoIterator<Item = CategoryRef<'a>>,
{
    let mut report = CategoryReport::default();
    for category in refs {
        let label = category.label();
        if ids.is_attempted(category) {
            continue;
        }
        match resolve_one(store, category, definitions, locales).await {
            Ok((id, resolution)) => {
                ids.record(category, Some(id));
                match resolution {
                    Resolution::Existing => report.existing += 1,
                    Resolution::Created => report.created += 1,
                    Resolution::Localized => report.localized += 1,
                }
            }
            Err(err) => {
                warn!(
                    category = label,
                    locale = %locales.locale,
                    "could not ensure category, entries will be written without it: {err}"
                );
                ids.record(category, None);
                report.unresolved += 1;
            }
        }
    }
    info!(
        locale = %locales.locale,
        resolved = report.resolved(),
        created = report.created,
        localized = report.localized,
        unresolved = report.unresolved,
        "categories ensured"
    );
    report
}

async fn resolve_one<S>(
    store: &S,
    category: CategoryRef<'_>,
    definitions: &[CategoryDef],
    locales: &Locales,
) -> Result<(i64, Resolution), ResolveError>
where
    S: DocumentStore + ?Sized,
{
    let definition = find_definition(category, definitions);
    let external_key = match (&definition, category) {
        (Some(def), _) => category_external_key(def.key.as_deref(), &def.name)?,
        (None, CategoryRef::Key(key)) => category_external_key(Some(key), "")?,
        (None, CategoryRef::Name(name)) => category_external_key(None, name)?,
    };

    let base_document_id = if locales.is_base() {
        None
    } else {
        find_by_external_key(
            store,
            Collection::Categories,
            &external_key,
            &locales.base_locale,
        )
        .await?
        .and_then(|doc| doc.document_id)
    };

    if let Some(existing) =
        find_by_external_key(store, Collection::Categories, &external_key, &locales.locale)
            .await?
    {
        debug!(key = %external_key, locale = %locales.locale, "category exists");
        return Ok((document_numeric_id(&existing)?, Resolution::Existing));
    }

    let definition = match definition {
        Some(def) => def,
        None => match category {
            CategoryRef::Name(name) => CategoryDef {
                key: None,
                name: name.to_string(),
                description: None,
            },
            CategoryRef::Key(key) => return Err(ResolveError::Undefined(key.to_string())),
        },
    };

    let mut values = Map::new();
    values.insert("name".into(), Value::String(definition.name.clone()));
    values.insert(
        "description".into(),
        Value::String(
            definition
                .description
                .clone()
                .unwrap_or_else(|| definition.name.clone()),
        ),
    );
    values.insert("external_key".into(), Value::String(external_key.clone()));
    let partition = FieldPartition::for_kind(EntryKind::Category);

    match base_document_id {
        Some(document_id) if !locales.is_base() => {
            let payload = partition.payload(&values, WriteMode::UpdateVariant, &locales.locale);
            let localized = store
                .update(
                    Collection::Categories,
                    &document_id,
                    Some(&locales.locale),
                    &payload,
                )
                .await?;
            info!(key = %external_key, locale = %locales.locale, "localized category");
            Ok((document_numeric_id(&localized)?, Resolution::Localized))
        }
        _ => {
            let payload = partition.payload(&values, WriteMode::Create, &locales.locale);
            let created = store.create(Collection::Categories, &payload).await?;
            info!(key = %external_key, locale = %locales.locale, "created category");
            Ok((document_numeric_id(&created)?, Resolution::Created))
        }
    }
}

fn find_definition(category: CategoryRef<'_>, definitions: &[CategoryDef]) -> Option<CategoryDef> {
    match category {
        CategoryRef::Key(key) => definitions
            .iter()
            .find(|def| def.key.as_deref() == Some(key)),
        CategoryRef::Name(name) => definitions.iter().find(|def| def.name == name),
    }
    .cloned()
}

fn document_numeric_id(doc: &Document) -> Result<i64, ResolveError> {
    doc.id.ok_or(ResolveError::MissingIdentifier("id"))
}
