//! Authorization server client
//!
//! Token grants (authorization code on account linking, refresh-token
//! rotation afterwards) and bearer profile lookups against the assistant's
//! login service.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, error};

use crate::errors::BridgeError;

/// A successful token grant
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,

    pub refresh_token: String,

    pub expires_in: i64,

    pub token_type: String,
}

/// The linked user's identity
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub user_id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,
}

/// Authorization server operations, behind a trait for testability
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange an account-linking authorization code for tokens
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, BridgeError>;

    /// Rotate tokens with a refresh-token grant
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, BridgeError>;

    /// Resolve the user a bearer token belongs to
    async fn fetch_profile(&self, access_token: &str) -> Result<Profile, BridgeError>;
}

/// Auth client options
#[derive(Debug, Clone)]
pub struct AuthOptions {
    /// Token grant endpoint
    pub token_url: String,

    /// Profile lookup endpoint
    pub profile_url: String,

    /// OAuth client credentials for this skill
    pub client_id: String,

    pub client_secret: SecretString,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            token_url: "https://api.amazon.com/auth/o2/token".to_string(),
            profile_url: "https://api.amazon.com/user/profile".to_string(),
            client_id: String::new(),
            client_secret: SecretString::from(""),
        }
    }
}

/// HTTP client for the authorization server
pub struct AuthClient {
    client: Client,
    options: AuthOptions,
}

impl AuthClient {
    pub fn new(options: AuthOptions) -> Result<Self, BridgeError> {
        for endpoint in [&options.token_url, &options.profile_url] {
            url::Url::parse(endpoint)
                .map_err(|e| BridgeError::ConfigError(format!("{}: {}", endpoint, e)))?;
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self { client, options })
    }

    async fn grant(&self, form: &[(&str, &str)]) -> Result<TokenGrant, BridgeError> {
        debug!("POST {} (token grant)", self.options.token_url);

        let response = self
            .client
            .post(&self.options.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| BridgeError::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Token grant failed: {} - {}", status, body);
            return Err(BridgeError::AuthExpired(format!("{}: {}", status, body)));
        }

        let grant = response.json().await?;
        Ok(grant)
    }
}

#[async_trait]
impl AuthApi for AuthClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, BridgeError> {
        self.grant(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", &self.options.client_id),
            ("client_secret", self.options.client_secret.expose_secret()),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, BridgeError> {
        self.grant(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &self.options.client_id),
            ("client_secret", self.options.client_secret.expose_secret()),
        ])
        .await
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<Profile, BridgeError> {
        debug!("GET {} (profile)", self.options.profile_url);

        let response = self
            .client
            .get(&self.options.profile_url)
            .header(header::AUTHORIZATION, format!("Bearer {}", access_token))
            .send()
            .await
            .map_err(|e| BridgeError::UpstreamUnavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                let profile = response.json().await?;
                Ok(profile)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let body = response.text().await.unwrap_or_default();
                error!("Profile lookup rejected: {}", body);
                Err(BridgeError::AuthExpired(body))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                error!("Profile lookup failed: {} - {}", status, body);
                Err(BridgeError::UpstreamUnavailable(format!(
                    "{}: {}",
                    status, body
                )))
            }
        }
    }
}
