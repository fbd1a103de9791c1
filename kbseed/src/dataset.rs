use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::sync::categories::CategoryRef;
use crate::sync::partition::EntryKind;
use crate::sync::upsert::SyncEntry;

pub const DEFAULT_DATASET_LOCALE: &str = "en";
pub const CONTENT_DATASET: &str = "sumup";
pub const ACTION_LINK_DATASET: &str = "action-links";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset {name} not found for locale {locale} in {}", dir.display())]
    NotFound {
        name: String,
        locale: String,
        dir: PathBuf,
    },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CategoryDef {
    #[serde(default)]
    pub key: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleEntry {
    #[serde(default)]
    pub key: Option<String>,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub category_key: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLinkEntry {
    #[serde(default)]
    pub key: Option<String>,
    pub title: String,
    pub description: String,
    pub path: String,
    #[serde(default)]
    pub category_key: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
}

fn category_ref<'a>(key: &'a Option<String>, name: &'a Option<String>) -> Option<CategoryRef<'a>> {
    key.as_deref()
        .filter(|key| !key.is_empty())
        .map(CategoryRef::Key)
        .or_else(|| {
            name.as_deref()
                .filter(|name| !name.is_empty())
                .map(CategoryRef::Name)
        })
}

impl SyncEntry for ArticleEntry {
    fn kind(&self) -> EntryKind {
        EntryKind::Article
    }

    fn explicit_key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn label(&self) -> &str {
        &self.title
    }

    fn category_ref(&self) -> Option<CategoryRef<'_>> {
        category_ref(&self.category_key, &self.category_name)
    }

    fn field_values(&self) -> Map<String, Value> {
        let mut values = Map::new();
        values.insert("title".into(), Value::String(self.title.clone()));
        values.insert("body".into(), Value::String(self.body.clone()));
        values.insert("featured".into(), Value::Bool(self.featured));
        if let Some(path) = &self.path {
            values.insert("path".into(), Value::String(path.clone()));
        }
        values
    }
}

impl SyncEntry for ActionLinkEntry {
    fn kind(&self) -> EntryKind {
        EntryKind::ActionLink
    }

    fn explicit_key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn label(&self) -> &str {
        &self.title
    }

    fn category_ref(&self) -> Option<CategoryRef<'_>> {
        category_ref(&self.category_key, &self.category_name)
    }

    fn field_values(&self) -> Map<String, Value> {
        let mut values = Map::new();
        values.insert("title".into(), Value::String(self.title.clone()));
        values.insert(
            "description".into(),
            Value::String(self.description.clone()),
        );
        values.insert("path".into(), Value::String(self.path.clone()));
        values
    }
}

/// A dataset file together with where it actually came from.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub data: T,
    pub locale: String,
    pub path: PathBuf,
}

impl<T> Loaded<T> {
    pub fn fell_back(&self, requested: &str) -> bool {
        self.locale != requested
    }
}

/// Categories and articles for one locale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentDataset {
    pub categories: Vec<CategoryDef>,
    pub articles: Vec<ArticleEntry>,
}

#[derive(Debug, Deserialize)]
struct RawContentDataset {
    #[serde(default)]
    categories: Vec<CategoryDef>,
    #[serde(default)]
    articles: Option<Vec<ArticleEntry>>,
}

impl ContentDataset {
    /// Loads `sumup.<locale>.json`. A locale file without an `articles`
    /// list borrows the default locale's articles.
    pub fn load(dir: &Path, locale: &str) -> Result<Loaded<Self>, DatasetError> {
        let loaded = load_json::<RawContentDataset>(dir, CONTENT_DATASET, locale)?;
        let articles = match loaded.data.articles {
            Some(articles) => articles,
            None if loaded.locale != DEFAULT_DATASET_LOCALE => {
                warn!(
                    locale = %loaded.locale,
                    "dataset has no articles, mirroring the {DEFAULT_DATASET_LOCALE} articles"
                );
                load_json::<RawContentDataset>(dir, CONTENT_DATASET, DEFAULT_DATASET_LOCALE)?
                    .data
                    .articles
                    .unwrap_or_default()
            }
            None => Vec::new(),
        };
        Ok(Loaded {
            data: ContentDataset {
                categories: loaded.data.categories,
                articles,
            },
            locale: loaded.locale,
            path: loaded.path,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLinkDataset {
    #[serde(default)]
    pub action_links: Vec<ActionLinkEntry>,
}

impl ActionLinkDataset {
    pub fn load(dir: &Path, locale: &str) -> Result<Loaded<Self>, DatasetError> {
        load_json(dir, ACTION_LINK_DATASET, locale)
    }
}

/// Reads `<dir>/<name>.<locale>.json`, falling back to the default locale
/// when the locale file does not exist.
pub fn load_json<T: DeserializeOwned>(
    dir: &Path,
    name: &str,
    locale: &str,
) -> Result<Loaded<T>, DatasetError> {
    match read_dataset(dir, name, locale)? {
        Some(loaded) => Ok(loaded),
        None if locale != DEFAULT_DATASET_LOCALE => {
            warn!(
                dataset = name,
                locale, "dataset not found, falling back to {DEFAULT_DATASET_LOCALE}"
            );
            read_dataset(dir, name, DEFAULT_DATASET_LOCALE)?.ok_or_else(|| {
                DatasetError::NotFound {
                    name: name.to_string(),
                    locale: locale.to_string(),
                    dir: dir.to_path_buf(),
                }
            })
        }
        None => Err(DatasetError::NotFound {
            name: name.to_string(),
            locale: locale.to_string(),
            dir: dir.to_path_buf(),
        }),
    }
}

fn read_dataset<T: DeserializeOwned>(
    dir: &Path,
    name: &str,
    locale: &str,
) -> Result<Option<Loaded<T>>, DatasetError> {
    let path = dir.join(format!("{name}.{locale}.json"));
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(DatasetError::Io { path, source }),
    };
    let data = serde_json::from_str(&text).map_err(|source| DatasetError::Parse {
        path: path.clone(),
        source,
    })?;
    Ok(Some(Loaded {
        data,
        locale: locale.to_string(),
        path,
    }))
}
