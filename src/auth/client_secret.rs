//! Client credentials flow for a custom app registration

use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::auth::credential::{
    tenant_endpoint, AccessToken, CredentialKind, DeviceCodeNotifier, IdentityErrorBody,
    TokenCredential, TokenResponse, TOKEN_EXPIRY_SKEW,
};
use crate::error::{GraphMcpError, Result};

/// Credential that authenticates the app itself with a client secret
///
/// The last token is cached and reused until it is within
/// [`TOKEN_EXPIRY_SKEW`] of expiring.
pub struct ClientSecretCredential {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    cache: Mutex<Option<AccessToken>>,
}

impl ClientSecretCredential {
    /// Create a credential for one tenant / app registration
    ///
    /// # Arguments
    ///
    /// * `http` - Shared HTTP client
    /// * `authority_host` - Identity platform host
    /// * `tenant_id` - Directory the app is registered in
    /// * `client_id` - Application id
    /// * `client_secret` - Secret value (not the secret id)
    pub fn new(
        http: reqwest::Client,
        authority_host: &str,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Self {
        Self {
            http,
            token_url: tenant_endpoint(authority_host, tenant_id, "token"),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            cache: Mutex::new(None),
        }
    }

    fn cached_token(&self) -> Option<AccessToken> {
        let cache = self.cache.lock().ok()?;
        cache
            .as_ref()
            .filter(|t| !t.is_expiring(TOKEN_EXPIRY_SKEW))
            .cloned()
    }

    fn store_token(&self, token: &AccessToken) {
        match self.cache.lock() {
            Ok(mut cache) => *cache = Some(token.clone()),
            Err(_) => tracing::warn!("Token cache lock poisoned; token not cached"),
        }
    }
}

impl fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn get_token(
        &self,
        scopes: &[String],
        _notifier: DeviceCodeNotifier,
    ) -> Result<AccessToken> {
        if let Some(token) = self.cached_token() {
            tracing::debug!("Using cached client credentials token");
            return Ok(token);
        }

        let scope = scopes.join(" ");
        tracing::debug!(client_id = %self.client_id, "Requesting client credentials token");

        let resp = self
            .http
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GraphMcpError::Transport(format!("Token request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read error body>".to_string());
            let detail = serde_json::from_str::<IdentityErrorBody>(&body)
                .map(|b| b.summary())
                .unwrap_or(body);
            return Err(GraphMcpError::Authentication(format!(
                "Token request returned {}: {}",
                status, detail
            ))
            .into());
        }

        let token = resp
            .json::<TokenResponse>()
            .await
            .map_err(|e| GraphMcpError::Authentication(format!("Failed to parse token: {}", e)))?
            .into_access_token();

        self.store_token(&token);
        tracing::info!("Acquired client credentials token");
        Ok(token)
    }

    fn kind(&self) -> CredentialKind {
        CredentialKind::ClientSecret
    }
}
