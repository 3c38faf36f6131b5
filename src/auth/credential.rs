//! Token credential abstraction
//!
//! A credential hands out bearer tokens for a set of scopes. Two production
//! implementations exist: [`DeviceCodeCredential`] for the interactive flow and
//! [`ClientSecretCredential`] for the app-only flow. The executor creates them
//! through a [`CredentialFactory`] so tests can substitute fakes.
//!
//! Device code prompts are not reported through a stored callback. Each
//! acquisition attempt gets a [`DeviceCodeNotifier`] wrapping a one-shot
//! channel; the credential writes the prompt into it and the executor reads it
//! after the attempt returns or times out.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::auth::client_secret::ClientSecretCredential;
use crate::auth::config::AuthConfig;
use crate::auth::device_code::DeviceCodeCredential;
use crate::error::Result;

/// Tokens this close to expiry are treated as expired
pub const TOKEN_EXPIRY_SKEW: Duration = Duration::from_secs(300);

/// A bearer token and its expiry
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// Raw bearer token
    pub token: String,
    /// Absolute expiry time
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Build a token that expires `expires_in` seconds from now
    pub fn expiring_in(token: impl Into<String>, expires_in: u64) -> Self {
        let secs = i64::try_from(expires_in).unwrap_or(i64::MAX / 2);
        Self {
            token: token.into(),
            expires_at: Utc::now() + chrono::Duration::seconds(secs),
        }
    }

    /// True if the token expires within `skew`
    pub fn is_expiring(&self, skew: Duration) -> bool {
        let skew = chrono::Duration::from_std(skew).unwrap_or_else(|_| chrono::Duration::zero());
        self.expires_at <= Utc::now() + skew
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// What the user must do to finish a device code sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCodePrompt {
    /// Page where the code is entered
    pub verification_uri: String,
    /// Short code shown to the user
    pub user_code: String,
    /// Seconds until the code expires
    pub expires_in: u64,
}

/// One-shot sink for a device code prompt
///
/// Only the first prompt is delivered; later calls are ignored, as is a
/// prompt sent after the receiving side has gone away.
#[derive(Debug, Default)]
pub struct DeviceCodeNotifier {
    tx: Option<oneshot::Sender<DeviceCodePrompt>>,
}

impl DeviceCodeNotifier {
    /// Create a notifier and the receiver that observes it
    pub fn channel() -> (Self, oneshot::Receiver<DeviceCodePrompt>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A notifier nobody listens to
    pub fn detached() -> Self {
        Self { tx: None }
    }

    /// Deliver the prompt
    pub fn notify(&mut self, prompt: DeviceCodePrompt) {
        tracing::info!(
            verification_uri = %prompt.verification_uri,
            user_code = %prompt.user_code,
            "Device code authentication required"
        );
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(prompt);
        }
    }
}

/// Which flow a credential implements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// Interactive device code flow
    DeviceCode,
    /// Client credentials flow
    ClientSecret,
}

/// Source of bearer tokens
#[async_trait]
pub trait TokenCredential: Send + Sync + fmt::Debug {
    /// Acquire a token for `scopes`
    ///
    /// Implementations may return a cached token. Interactive
    /// implementations report the prompt through `notifier` before waiting
    /// for the user.
    ///
    /// # Errors
    ///
    /// Returns an error when the identity platform rejects the request or
    /// cannot be reached.
    async fn get_token(&self, scopes: &[String], notifier: DeviceCodeNotifier)
        -> Result<AccessToken>;

    /// Which flow this credential implements
    fn kind(&self) -> CredentialKind;
}

/// Constructs credentials for the executor
pub trait CredentialFactory: Send + Sync {
    /// Credential for the interactive flow
    fn device_code(&self, config: &AuthConfig) -> Arc<dyn TokenCredential>;

    /// Credential for the app-only flow
    fn client_secret(&self, config: &AuthConfig, secret: &str) -> Arc<dyn TokenCredential>;
}

/// Factory producing credentials that talk to the Microsoft identity platform
#[derive(Debug, Clone)]
pub struct IdentityCredentialFactory {
    http: reqwest::Client,
    authority_host: String,
}

impl IdentityCredentialFactory {
    /// Create a factory for the given authority host
    ///
    /// # Arguments
    ///
    /// * `http` - Shared HTTP client
    /// * `authority_host` - e.g. `https://login.microsoftonline.com`
    pub fn new(http: reqwest::Client, authority_host: impl Into<String>) -> Self {
        Self {
            http,
            authority_host: authority_host.into(),
        }
    }
}

impl CredentialFactory for IdentityCredentialFactory {
    fn device_code(&self, config: &AuthConfig) -> Arc<dyn TokenCredential> {
        Arc::new(DeviceCodeCredential::new(
            self.http.clone(),
            &self.authority_host,
            &config.tenant_id,
            &config.client_id,
        ))
    }

    fn client_secret(&self, config: &AuthConfig, secret: &str) -> Arc<dyn TokenCredential> {
        Arc::new(ClientSecretCredential::new(
            self.http.clone(),
            &self.authority_host,
            &config.tenant_id,
            &config.client_id,
            secret,
        ))
    }
}

/// Build the OAuth 2.0 v2 endpoint URL for a tenant
pub(crate) fn tenant_endpoint(authority_host: &str, tenant_id: &str, endpoint: &str) -> String {
    format!(
        "{}/{}/oauth2/v2.0/{}",
        authority_host.trim_end_matches('/'),
        tenant_id,
        endpoint
    )
}

/// Error body returned by the identity platform token endpoints
#[derive(Debug, Deserialize)]
pub(crate) struct IdentityErrorBody {
    pub(crate) error: String,
    #[serde(default)]
    pub(crate) error_description: Option<String>,
}

impl IdentityErrorBody {
    /// `error: description` as a single line
    pub(crate) fn summary(&self) -> String {
        match &self.error_description {
            Some(description) => format!("{}: {}", self.error, description.trim()),
            None => self.error.clone(),
        }
    }
}

/// Successful token endpoint response
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    #[serde(default = "default_expires_in")]
    pub(crate) expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

impl TokenResponse {
    pub(crate) fn into_access_token(self) -> AccessToken {
        AccessToken::expiring_in(self.access_token, self.expires_in)
    }
}
