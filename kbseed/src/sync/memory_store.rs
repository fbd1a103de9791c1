//! In-memory document store for engine tests.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use docstore_core::{
    DocStoreError, Document, DocumentPage, ListQuery, PageMeta, Pagination, PublicationState,
    StatusCode,
};
use serde_json::{Map, Value};

use crate::store::{Collection, DocumentStore};

const DEFAULT_LOCALE: &str = "en";
const DEFAULT_PAGE_SIZE: u32 = 25;
/// Fields every new locale variant copies from its siblings.
const SHARED_FIELDS: &[&str] = &["external_key", "path"];

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDoc {
    pub collection: Collection,
    pub id: i64,
    pub document_id: String,
    pub locale: String,
    pub attributes: Map<String, Value>,
    pub published_at: Option<String>,
}

impl StoredDoc {
    fn to_document(&self) -> Document {
        let mut attributes = self.attributes.clone();
        if let Some(published_at) = &self.published_at {
            attributes.insert("publishedAt".into(), Value::String(published_at.clone()));
        }
        Document {
            id: Some(self.id),
            document_id: Some(self.document_id.clone()),
            locale: Some(self.locale.clone()),
            attributes,
        }
    }
}

#[derive(Default)]
struct State {
    next_id: i64,
    docs: Vec<StoredDoc>,
    lists: usize,
    writes: usize,
    last_update: Option<Map<String, Value>>,
    fail_publish: bool,
    fail_creates: HashSet<Collection>,
    fail_lists: HashSet<Collection>,
    fail_deletes: HashSet<String>,
    vanished: HashSet<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

fn api_error(status: StatusCode, body: &str) -> DocStoreError {
    DocStoreError::Api {
        status,
        body: body.to_string(),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Adds a published variant in a brand-new document; returns its id.
    pub fn insert(&self, collection: Collection, locale: &str, attributes: Value) -> i64 {
        let mut state = self.state();
        state.next_id += 1;
        let id = state.next_id;
        let Value::Object(attributes) = attributes else {
            panic!("attributes must be an object");
        };
        state.docs.push(StoredDoc {
            collection,
            id,
            document_id: format!("doc-{id}"),
            locale: locale.to_string(),
            attributes,
            published_at: Some("2024-01-01T00:00:00Z".into()),
        });
        id
    }

    /// Adds a variant to an existing document id.
    pub fn insert_variant(
        &self,
        collection: Collection,
        document_id: &str,
        locale: &str,
        attributes: Value,
    ) -> i64 {
        let mut state = self.state();
        state.next_id += 1;
        let id = state.next_id;
        let Value::Object(attributes) = attributes else {
            panic!("attributes must be an object");
        };
        state.docs.push(StoredDoc {
            collection,
            id,
            document_id: document_id.to_string(),
            locale: locale.to_string(),
            attributes,
            published_at: None,
        });
        id
    }

    pub fn variant(
        &self,
        collection: Collection,
        external_key: &str,
        locale: &str,
    ) -> Option<StoredDoc> {
        self.state()
            .docs
            .iter()
            .find(|doc| {
                doc.collection == collection
                    && doc.locale == locale
                    && doc.attributes.get("external_key").and_then(Value::as_str)
                        == Some(external_key)
            })
            .cloned()
    }

    pub fn documents(&self, collection: Collection) -> Vec<StoredDoc> {
        self.state()
            .docs
            .iter()
            .filter(|doc| doc.collection == collection)
            .cloned()
            .collect()
    }

    pub fn count(&self, collection: Collection) -> usize {
        self.documents(collection).len()
    }

    pub fn count_in(&self, collection: Collection, locale: &str) -> usize {
        self.documents(collection)
            .iter()
            .filter(|doc| doc.locale == locale)
            .count()
    }

    pub fn list_count(&self) -> usize {
        self.state().lists
    }

    pub fn write_count(&self) -> usize {
        self.state().writes
    }

    pub fn last_update_payload(&self) -> Option<Map<String, Value>> {
        self.state().last_update.clone()
    }

    pub fn fail_publish(&self) {
        self.state().fail_publish = true;
    }

    pub fn fail_creates_in(&self, collection: Collection) {
        self.state().fail_creates.insert(collection);
    }

    pub fn fail_lists_in(&self, collection: Collection) {
        self.state().fail_lists.insert(collection);
    }

    pub fn fail_delete_of(&self, document_id: &str) {
        self.state().fail_deletes.insert(document_id.to_string());
    }

    /// Drops the document before its delete arrives, so the delete gets 404.
    pub fn vanish_before_delete(&self, document_id: &str) {
        self.state().vanished.insert(document_id.to_string());
    }
}

fn matches_query(doc: &StoredDoc, query: &ListQuery) -> bool {
    if let Some(locale) = &query.locale
        && &doc.locale != locale
    {
        return false;
    }
    if query.publication_state != Some(PublicationState::Preview) && doc.published_at.is_none() {
        return false;
    }
    query.filters.iter().all(|(field, value)| {
        doc.attributes.get(field).and_then(Value::as_str) == Some(value.as_str())
    })
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(
        &self,
        collection: Collection,
        query: &ListQuery,
    ) -> Result<DocumentPage, DocStoreError> {
        let mut state = self.state();
        state.lists += 1;
        if state.fail_lists.contains(&collection) {
            return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "list failed"));
        }
        let matching: Vec<&StoredDoc> = state
            .docs
            .iter()
            .filter(|doc| doc.collection == collection && matches_query(doc, query))
            .collect();
        let page = query.page.unwrap_or(1).max(1);
        let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let total = matching.len() as u64;
        let page_count = total.div_ceil(u64::from(page_size)) as u32;
        let data = matching
            .into_iter()
            .skip(((page - 1) * page_size) as usize)
            .take(page_size as usize)
            .map(StoredDoc::to_document)
            .collect();
        Ok(DocumentPage {
            data,
            meta: Some(PageMeta {
                pagination: Some(Pagination {
                    page,
                    page_size,
                    page_count: Some(page_count),
                    total,
                }),
            }),
        })
    }

    async fn create(
        &self,
        collection: Collection,
        data: &Map<String, Value>,
    ) -> Result<Document, DocStoreError> {
        let mut state = self.state();
        state.writes += 1;
        if state.fail_creates.contains(&collection) {
            return Err(api_error(StatusCode::BAD_REQUEST, "create rejected"));
        }
        state.next_id += 1;
        let id = state.next_id;
        let mut attributes = data.clone();
        let locale = attributes
            .remove("locale")
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_LOCALE.to_string());
        let published_at = attributes
            .remove("publishedAt")
            .and_then(|value| value.as_str().map(str::to_string));
        let doc = StoredDoc {
            collection,
            id,
            document_id: format!("doc-{id}"),
            locale,
            attributes,
            published_at,
        };
        let document = doc.to_document();
        state.docs.push(doc);
        Ok(document)
    }

    async fn update(
        &self,
        collection: Collection,
        document_id: &str,
        locale: Option<&str>,
        data: &Map<String, Value>,
    ) -> Result<Document, DocStoreError> {
        let mut state = self.state();
        state.writes += 1;
        let is_publish = data.len() == 1 && data.contains_key("publishedAt");
        if is_publish && state.fail_publish {
            return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "publish failed"));
        }
        if !is_publish {
            state.last_update = Some(data.clone());
        }
        let locale = locale.unwrap_or(DEFAULT_LOCALE).to_string();
        let mut attributes = data.clone();
        let published_at = attributes
            .remove("publishedAt")
            .and_then(|value| value.as_str().map(str::to_string));

        if let Some(doc) = state.docs.iter_mut().find(|doc| {
            doc.collection == collection && doc.document_id == document_id && doc.locale == locale
        }) {
            doc.attributes.extend(attributes);
            if published_at.is_some() {
                doc.published_at = published_at;
            }
            return Ok(doc.to_document());
        }

        let Some(sibling) = state
            .docs
            .iter()
            .find(|doc| doc.collection == collection && doc.document_id == document_id)
        else {
            return Err(api_error(StatusCode::NOT_FOUND, "document not found"));
        };
        let mut inherited = Map::new();
        for field in SHARED_FIELDS {
            if let Some(value) = sibling.attributes.get(*field) {
                inherited.insert((*field).to_string(), value.clone());
            }
        }
        inherited.extend(attributes);
        state.next_id += 1;
        let doc = StoredDoc {
            collection,
            id: state.next_id,
            document_id: document_id.to_string(),
            locale,
            attributes: inherited,
            published_at,
        };
        let document = doc.to_document();
        state.docs.push(doc);
        Ok(document)
    }

    async fn delete(
        &self,
        collection: Collection,
        document_id: &str,
        locale: Option<&str>,
    ) -> Result<(), DocStoreError> {
        let mut state = self.state();
        state.writes += 1;
        if state.fail_deletes.contains(document_id) {
            return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "delete failed"));
        }
        if state.vanished.contains(document_id) {
            state
                .docs
                .retain(|doc| !(doc.collection == collection && doc.document_id == document_id));
        }
        let before = state.docs.len();
        state.docs.retain(|doc| {
            !(doc.collection == collection
                && doc.document_id == document_id
                && locale.is_none_or(|locale| doc.locale == locale))
        });
        if state.docs.len() == before {
            return Err(api_error(StatusCode::NOT_FOUND, "document not found"));
        }
        Ok(())
    }
}
