use std::fmt;
use std::path::PathBuf;

use docstore_core::{AuthClient, AuthError, DocStoreClient, DocStoreError};
use thiserror::Error;
use tracing::info;

use crate::sync::Locales;

const DEFAULT_BASE_URL: &str = "http://localhost:1337";
const DEFAULT_LOCALE: &str = "en";
const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no credentials: set STRAPI_API_TOKEN, or STRAPI_EMAIL and STRAPI_PASSWORD")]
    MissingCredentials,
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("admin login failed: {0}")]
    Login(#[from] AuthError),
    #[error("invalid store configuration: {0}")]
    Store(#[from] DocStoreError),
}

#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    ApiToken(String),
    Password { email: String, password: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::ApiToken(_) => f.write_str("ApiToken(<redacted>)"),
            Credentials::Password { email, .. } => f
                .debug_struct("Password")
                .field("email", email)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub base_url: String,
    pub credentials: Credentials,
    pub locale: String,
    pub base_locale: String,
    pub data_dir: PathBuf,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source. Blank values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let credentials = match (
            read("STRAPI_API_TOKEN"),
            read("STRAPI_EMAIL"),
            read("STRAPI_PASSWORD"),
        ) {
            (Some(token), _, _) => Credentials::ApiToken(token),
            (None, Some(email), Some(password)) => Credentials::Password { email, password },
            _ => return Err(ConfigError::MissingCredentials),
        };
        Ok(Self {
            base_url: read("STRAPI_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            credentials,
            locale: read("LOCALE").unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
            base_locale: read("BASE_LOCALE").unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
            data_dir: read("KBSEED_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        })
    }

    pub fn with_locale(mut self, locale: Option<String>) -> Result<Self, ConfigError> {
        if let Some(locale) = locale {
            self.locale = non_empty(locale, "--locale")?;
        }
        Ok(self)
    }

    pub fn with_base_locale(mut self, base_locale: Option<String>) -> Result<Self, ConfigError> {
        if let Some(base_locale) = base_locale {
            self.base_locale = non_empty(base_locale, "--base-locale")?;
        }
        Ok(self)
    }

    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        if let Some(data_dir) = data_dir {
            self.data_dir = data_dir;
        }
        self
    }

    pub fn locales(&self) -> Locales {
        Locales::new(self.locale.clone(), self.base_locale.clone())
    }

    /// Returns the bearer token, logging in first when only email and
    /// password are configured.
    pub async fn resolve_token(&self) -> Result<String, ConfigError> {
        match &self.credentials {
            Credentials::ApiToken(token) => Ok(token.clone()),
            Credentials::Password { email, password } => {
                let auth = AuthClient::with_base_url(&self.base_url)?;
                let session = auth.login(email, password).await?;
                info!(email = %email, "logged in to admin api");
                Ok(session.token)
            }
        }
    }

    pub async fn connect(&self) -> Result<DocStoreClient, ConfigError> {
        let token = self.resolve_token().await?;
        Ok(DocStoreClient::with_base_url(&self.base_url, token)?)
    }
}

fn non_empty(value: String, name: &'static str) -> Result<String, ConfigError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(ConfigError::Empty(name));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_from(vars: &[(&str, &str)]) -> Result<SyncConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        SyncConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_token_is_set() {
        let config = config_from(&[("STRAPI_API_TOKEN", "secret")]).unwrap();
        assert_eq!(config.base_url, "http://localhost:1337");
        assert_eq!(config.locale, "en");
        assert_eq!(config.base_locale, "en");
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.credentials, Credentials::ApiToken("secret".into()));
    }

    #[test]
    fn token_wins_over_email_and_password() {
        let config = config_from(&[
            ("STRAPI_API_TOKEN", "secret"),
            ("STRAPI_EMAIL", "admin@example.com"),
            ("STRAPI_PASSWORD", "pw"),
        ])
        .unwrap();
        assert!(matches!(config.credentials, Credentials::ApiToken(_)));
    }

    #[test]
    fn email_and_password_are_used_without_token() {
        let config = config_from(&[
            ("STRAPI_API_TOKEN", "  "),
            ("STRAPI_EMAIL", "admin@example.com"),
            ("STRAPI_PASSWORD", "pw"),
            ("LOCALE", "de"),
        ])
        .unwrap();
        assert_eq!(
            config.credentials,
            Credentials::Password {
                email: "admin@example.com".into(),
                password: "pw".into()
            }
        );
        assert_eq!(config.locales(), Locales::new("de", "en"));
    }

    #[test]
    fn missing_credentials_is_an_error() {
        let err = config_from(&[("STRAPI_EMAIL", "admin@example.com")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let token = format!("{:?}", Credentials::ApiToken("secret".into()));
        let password = format!(
            "{:?}",
            Credentials::Password {
                email: "admin@example.com".into(),
                password: "hunter2".into()
            }
        );
        assert!(!token.contains("secret"));
        assert!(!password.contains("hunter2"));
        assert!(password.contains("admin@example.com"));
    }

    #[test]
    fn cli_overrides_replace_env_values() {
        let config = config_from(&[("STRAPI_API_TOKEN", "t"), ("LOCALE", "fr")])
            .unwrap()
            .with_locale(Some("de".into()))
            .unwrap()
            .with_base_locale(None)
            .unwrap()
            .with_data_dir(Some(PathBuf::from("/tmp/datasets")));
        assert_eq!(config.locale, "de");
        assert_eq!(config.base_locale, "en");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/datasets"));
    }

    #[test]
    fn blank_locale_override_is_rejected() {
        let config = config_from(&[("STRAPI_API_TOKEN", "t")]).unwrap();
        assert!(matches!(
            config.with_locale(Some(" ".into())),
            Err(ConfigError::Empty("--locale"))
        ));
    }

    #[tokio::test]
    async fn password_credentials_log_in_for_a_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/login"))
            .and(body_json(serde_json::json!({
                "email": "admin@example.com",
                "password": "pw"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "data": { "token": "jwt-token" } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let uri = server.uri();
        let config = config_from(&[
            ("STRAPI_URL", uri.as_str()),
            ("STRAPI_EMAIL", "admin@example.com"),
            ("STRAPI_PASSWORD", "pw"),
        ])
        .unwrap();

        assert_eq!(config.resolve_token().await.unwrap(), "jwt-token");
    }

    #[tokio::test]
    async fn rejected_login_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/login"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid credentials"))
            .mount(&server)
            .await;

        let uri = server.uri();
        let config = config_from(&[
            ("STRAPI_URL", uri.as_str()),
            ("STRAPI_EMAIL", "admin@example.com"),
            ("STRAPI_PASSWORD", "wrong"),
        ])
        .unwrap();

        assert!(matches!(
            config.resolve_token().await,
            Err(ConfigError::Login(_))
        ));
    }
}
