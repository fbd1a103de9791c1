use async_trait::async_trait;
use docstore_core::{DocStoreClient, DocStoreError, Document, DocumentPage, ListQuery};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Articles,
    Categories,
    ActionLinks,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Articles,
        Collection::ActionLinks,
        Collection::Categories,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Articles => "articles",
            Collection::Categories => "categories",
            Collection::ActionLinks => "action-links",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The remote document store as seen by the sync engine.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list(
        &self,
        collection: Collection,
        query: &ListQuery,
    ) -> Result<DocumentPage, DocStoreError>;

    async fn create(
        &self,
        collection: Collection,
        data: &Map<String, Value>,
    ) -> Result<Document, DocStoreError>;

    async fn update(
        &self,
        collection: Collection,
        document_id: &str,
        locale: Option<&str>,
        data: &Map<String, Value>,
    ) -> Result<Document, DocStoreError>;

    async fn delete(
        &self,
        collection: Collection,
        document_id: &str,
        locale: Option<&str>,
    ) -> Result<(), DocStoreError>;
}

#[async_trait]
impl DocumentStore for DocStoreClient {
    async fn list(
        &self,
        collection: Collection,
        query: &ListQuery,
    ) -> Result<DocumentPage, DocStoreError> {
        DocStoreClient::list(self, collection.as_str(), query).await
    }

    async fn create(
        &self,
        collection: Collection,
        data: &Map<String, Value>,
    ) -> Result<Document, DocStoreError> {
        DocStoreClient::create(self, collection.as_str(), data).await
    }

    async fn update(
        &self,
        collection: Collection,
        document_id: &str,
        locale: Option<&str>,
        data: &Map<String, Value>,
    ) -> Result<Document, DocStoreError> {
        DocStoreClient::update(self, collection.as_str(), document_id, locale, data).await
    }

    async fn delete(
        &self,
        collection: Collection,
        document_id: &str,
        locale: Option<&str>,
    ) -> Result<(), DocStoreError> {
        DocStoreClient::delete(self, collection.as_str(), document_id, locale).await
    }
}
