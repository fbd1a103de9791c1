use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid base url: {0}")]
    Url(#[from] url::ParseError),
    #[error("login returned {status}: {body}")]
    Api { status: StatusCode, body: String },
}

/// Exchanges admin email/password for a bearer token.
#[derive(Clone)]
pub struct AuthClient {
    http: Client,
    base_url: Url,
}

impl AuthClient {
    pub fn with_base_url(base_url: &str) -> Result<Self, AuthError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AdminSession, AuthError> {
        let url = self.base_url.join("/admin/login")?;
        let response = self
            .http
            .post(url)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        if response.status().is_success() {
            let envelope = response.json::<LoginEnvelope>().await?;
            Ok(envelope.data)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(AuthError::Api { status, body })
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AdminSession {
    pub token: String,
    #[serde(default)]
    pub user: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct LoginEnvelope {
    data: AdminSession,
}
