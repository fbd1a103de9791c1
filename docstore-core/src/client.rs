use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;
use url::Url;

pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Error)]
pub enum DocStoreError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("api response missing data")]
    MissingData,
}

/// Client for the `/api/<collection>` document endpoints.
///
/// Every request carries `Authorization: Bearer <token>`; how the token was
/// obtained is not this client's concern.
#[derive(Clone)]
pub struct DocStoreClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl DocStoreClient {
    pub fn with_base_url(base_url: &str, token: impl Into<String>) -> Result<Self, DocStoreError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
            token: token.into(),
        })
    }

    pub async fn list(
        &self,
        collection: &str,
        query: &ListQuery,
    ) -> Result<DocumentPage, DocStoreError> {
        let mut url = self.endpoint(&format!("/api/{collection}"))?;
        query.apply(&mut url);
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn create(
        &self,
        collection: &str,
        data: &Map<String, Value>,
    ) -> Result<Document, DocStoreError> {
        let url = self.endpoint(&format!("/api/{collection}"))?;
        let response = self
            .http
            .post(url)
            .header("Authorization", self.auth_header_value())
            .json(&json!({ "data": data }))
            .send()
            .await?;
        let envelope: DataEnvelope = Self::handle_response(response).await?;
        envelope.data.ok_or(DocStoreError::MissingData)
    }

    /// Writes `data` onto `document_id`. With a locale this creates the
    /// locale variant when it does not exist yet.
    pub async fn update(
        &self,
        collection: &str,
        document_id: &str,
        locale: Option<&str>,
        data: &Map<String, Value>,
    ) -> Result<Document, DocStoreError> {
        let url = self.document_endpoint(collection, document_id, locale)?;
        let response = self
            .http
            .put(url)
            .header("Authorization", self.auth_header_value())
            .json(&json!({ "data": data }))
            .send()
            .await?;
        let envelope: DataEnvelope = Self::handle_response(response).await?;
        envelope.data.ok_or(DocStoreError::MissingData)
    }

    pub async fn delete(
        &self,
        collection: &str,
        document_id: &str,
        locale: Option<&str>,
    ) -> Result<(), DocStoreError> {
        let url = self.document_endpoint(collection, document_id, locale)?;
        let response = self
            .http
            .delete(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(DocStoreError::Api { status, body })
    }

    fn auth_header_value(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn endpoint(&self, path: &str) -> Result<Url, DocStoreError> {
        Ok(self.base_url.join(path)?)
    }

    fn document_endpoint(
        &self,
        collection: &str,
        document_id: &str,
        locale: Option<&str>,
    ) -> Result<Url, DocStoreError> {
        let mut url = self.endpoint(&format!("/api/{collection}/"))?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .push(document_id);
        if let Some(locale) = locale {
            url.query_pairs_mut().append_pair("locale", locale);
        }
        Ok(url)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, DocStoreError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(DocStoreError::Api { status, body })
        }
    }
}

impl DocStoreError {
    /// The store answered 404: the document or variant does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DocStoreError::Api { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationState {
    Live,
    Preview,
}

impl PublicationState {
    fn as_str(self) -> &'static str {
        match self {
            PublicationState::Live => "live",
            PublicationState::Preview => "preview",
        }
    }
}

/// Query string for a collection listing: equality filters, locale,
/// pagination and field projection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub filters: Vec<(String, String)>,
    pub locale: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub fields: Vec<String>,
    pub publication_state: Option<PublicationState>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter_eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| (*f).to_string()).collect();
        self
    }

    pub fn publication_state(mut self, state: PublicationState) -> Self {
        self.publication_state = Some(state);
        self
    }

    fn apply(&self, url: &mut Url) {
        let mut query = url.query_pairs_mut();
        for (field, value) in &self.filters {
            query.append_pair(&format!("filters[{field}][$eq]"), value);
        }
        if let Some(locale) = &self.locale {
            query.append_pair("filters[locale][$eq]", locale);
        }
        if let Some(page) = self.page {
            query.append_pair("pagination[page]", &page.to_string());
        }
        if let Some(page_size) = self.page_size {
            query.append_pair("pagination[pageSize]", &page_size.to_string());
        }
        for (index, field) in self.fields.iter().enumerate() {
            query.append_pair(&format!("fields[{index}]"), field);
        }
        if let Some(state) = self.publication_state {
            query.append_pair("publicationState", state.as_str());
        }
    }
}

/// One locale variant of a document. Attributes other than the identifiers
/// are kept as raw JSON.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Document {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(rename = "documentId", default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Document {
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    pub fn attribute_bool(&self, name: &str) -> Option<bool> {
        self.attributes.get(name).and_then(Value::as_bool)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DocumentPage {
    #[serde(default)]
    pub data: Vec<Document>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

impl DocumentPage {
    /// `None` when the server sent no page count, including offset-style
    /// `{ start, limit, total }` pagination.
    pub fn page_count(&self) -> Option<u32> {
        self.meta
            .as_ref()
            .and_then(|meta| meta.pagination.as_ref())
            .and_then(|pagination| pagination.page_count)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PageMeta {
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub page_count: Option<u32>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope {
    data: Option<Document>,
}
