mod auth;
mod client;

pub use auth::{AdminSession, AuthClient, AuthError};
pub use client::{
    DEFAULT_PAGE_SIZE, DocStoreClient, DocStoreError, Document, DocumentPage,
    ListQuery, PageMeta, Pagination, PublicationState,
};
pub use reqwest::StatusCode;
