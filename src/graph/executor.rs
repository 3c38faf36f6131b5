//! Command executor
//!
//! Relays one Graph command per call: make sure a credential exists, acquire
//! a token within a short bound, send the request, and normalize the
//! response. Every outcome, including every failure, comes back as a
//! [`CommandResult`]; [`CommandExecutor::execute`] never returns an error.
//!
//! # Credential lifecycle
//!
//! The executor holds at most one credential. It is created lazily on the
//! first call and reused afterwards. A failed acquisition discards it so the
//! next call starts fresh; a timed-out acquisition keeps it, because a
//! device code sign-in may still be in progress and will complete in the
//! background.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::auth::config::{AuthConfig, AuthStrategy};
use crate::auth::credential::{
    AccessToken, CredentialFactory, DeviceCodeNotifier, DeviceCodePrompt,
    IdentityCredentialFactory, TokenCredential,
};
use crate::auth::secret_matcher::InvalidSecretMatcher;
use crate::config::{Config, DEFAULT_AUTHORITY_HOST, DEFAULT_GRAPH_API_BASE};
use crate::error::{GraphMcpError, Result};
use crate::graph::instructions;
use crate::graph::method::HttpMethod;
use crate::graph::result::{AppRegistration, AuthRequiredKind, CommandResult, ErrorKind};

/// Upper bound on a single token acquisition attempt
pub const DEFAULT_TOKEN_WAIT: Duration = Duration::from_secs(3);

/// Default timeout for the outbound Graph request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Mutable credential state, guarded by the executor's mutex
#[derive(Default)]
struct CredentialState {
    credential: Option<Arc<dyn TokenCredential>>,
    client_secret: Option<String>,
}

/// Relays commands to Microsoft Graph
///
/// Share one instance behind an `Arc`; `execute` may be called concurrently.
pub struct CommandExecutor {
    auth: AuthConfig,
    api_base: String,
    http: reqwest::Client,
    factory: Arc<dyn CredentialFactory>,
    matcher: InvalidSecretMatcher,
    token_wait: Duration,
    state: Mutex<CredentialState>,
}

/// Builder for [`CommandExecutor`]
pub struct CommandExecutorBuilder {
    auth: AuthConfig,
    api_base: String,
    client_secret: Option<String>,
    matcher: InvalidSecretMatcher,
    http: Option<reqwest::Client>,
    factory: Option<Arc<dyn CredentialFactory>>,
    authority_host: String,
    request_timeout: Duration,
    token_wait: Duration,
}

impl CommandExecutorBuilder {
    fn new(auth: AuthConfig) -> Self {
        Self {
            auth,
            api_base: DEFAULT_GRAPH_API_BASE.to_string(),
            client_secret: None,
            matcher: InvalidSecretMatcher::default(),
            http: None,
            factory: None,
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            token_wait: DEFAULT_TOKEN_WAIT,
        }
    }

    /// Base URL commands are joined onto
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Initial client secret; blank values are ignored
    pub fn client_secret(mut self, secret: Option<String>) -> Self {
        self.client_secret = secret.filter(|s| !s.trim().is_empty());
        self
    }

    /// Matcher used to recognise rejected secrets
    pub fn secret_matcher(mut self, matcher: InvalidSecretMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// HTTP client for Graph requests
    ///
    /// When set, the request timeout is whatever the client was built with.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Factory used to construct credentials
    pub fn credential_factory(mut self, factory: Arc<dyn CredentialFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Identity platform host used by the default credential factory
    pub fn authority_host(mut self, host: impl Into<String>) -> Self {
        self.authority_host = host.into();
        self
    }

    /// Timeout for the outbound Graph request
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Bound on token acquisition
    pub fn token_wait(mut self, wait: Duration) -> Self {
        self.token_wait = wait;
        self
    }

    /// Build the executor
    ///
    /// # Errors
    ///
    /// Returns error if the API base is not a valid URL or the HTTP client
    /// cannot be constructed
    pub fn build(self) -> Result<CommandExecutor> {
        url::Url::parse(&self.api_base).map_err(|e| {
            GraphMcpError::Config(format!("Invalid Graph API base {}: {}", self.api_base, e))
        })?;
        let api_base = if self.api_base.ends_with('/') {
            self.api_base
        } else {
            format!("{}/", self.api_base)
        };

        let http = match self.http {
            Some(http) => http,
            None => reqwest::Client::builder()
                .timeout(self.request_timeout)
                .build()?,
        };

        let factory = self.factory.unwrap_or_else(|| {
            Arc::new(IdentityCredentialFactory::new(
                http.clone(),
                self.authority_host.clone(),
            ))
        });

        match self.auth.auth_strategy() {
            AuthStrategy::DeviceCode => tracing::info!(
                client_id = %self.auth.client_id,
                "Command executor initialized in read-only mode (device code)"
            ),
            AuthStrategy::ClientSecret => {
                let secret_source = match self.client_secret {
                    Some(_) => "configuration",
                    None => "parameter",
                };
                tracing::info!(
                    client_id = %self.auth.client_id,
                    secret_source,
                    "Command executor initialized in read/write mode (client secret)"
                );
            }
        }

        Ok(CommandExecutor {
            auth: self.auth,
            api_base,
            http,
            factory,
            matcher: self.matcher,
            token_wait: self.token_wait,
            state: Mutex::new(CredentialState {
                credential: None,
                client_secret: self.client_secret,
            }),
        })
    }
}

impl CommandExecutor {
    /// Start building an executor for the given auth configuration
    pub fn builder(auth: AuthConfig) -> CommandExecutorBuilder {
        CommandExecutorBuilder::new(auth)
    }

    /// Build an executor from loaded configuration
    ///
    /// # Errors
    ///
    /// Returns error if the Graph base URL is invalid or the HTTP client
    /// cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::builder(config.auth_config())
            .api_base(config.graph.api_base.clone())
            .authority_host(config.auth.authority_host.clone())
            .client_secret(config.client_secret())
            .secret_matcher(config.secret_matcher())
            .request_timeout(Duration::from_secs(config.graph.request_timeout_seconds))
            .build()
    }

    /// The resolved auth configuration
    pub fn auth_config(&self) -> &AuthConfig {
        &self.auth
    }

    /// The credential currently held, if any
    pub async fn current_credential(&self) -> Option<Arc<dyn TokenCredential>> {
        self.state.lock().await.credential.clone()
    }

    /// True if a client secret is known
    pub async fn has_client_secret(&self) -> bool {
        self.state.lock().await.client_secret.is_some()
    }

    /// Run one Graph command
    ///
    /// # Arguments
    ///
    /// * `command` - Path relative to the Graph base, e.g. `me/messages`
    /// * `method` - HTTP verb, case-insensitive
    /// * `body` - JSON body, sent for POST, PUT and PATCH only
    /// * `secret_override` - Client secret that replaces the known one for
    ///   this and all later calls
    pub async fn execute(
        &self,
        command: &str,
        method: &str,
        body: Option<Value>,
        secret_override: Option<String>,
    ) -> CommandResult {
        tracing::info!("Executing Microsoft Graph command: {} {}", method, command);

        self.remember_secret(secret_override).await;

        let verb = match method.parse::<HttpMethod>() {
            Ok(verb) => verb,
            Err(_) => {
                tracing::warn!("Unsupported HTTP method: {}", method);
                return CommandResult::error(
                    ErrorKind::UnsupportedOperation,
                    format!("Unsupported HTTP method: {}", method),
                );
            }
        };

        let credential = match self.ensure_credential().await {
            Ok(credential) => credential,
            Err(result) => return result,
        };

        let token = match self.acquire_token(credential).await {
            Ok(token) => token,
            Err(result) => return result,
        };

        self.send(verb, command, body, &token).await
    }

    async fn remember_secret(&self, secret_override: Option<String>) {
        if let Some(secret) = secret_override.filter(|s| !s.trim().is_empty()) {
            tracing::debug!("Caching client secret supplied with the command");
            self.state.lock().await.client_secret = Some(secret);
        }
    }

    /// Return the held credential, creating it if needed
    async fn ensure_credential(&self) -> std::result::Result<Arc<dyn TokenCredential>, CommandResult> {
        let mut state = self.state.lock().await;
        if let Some(credential) = &state.credential {
            return Ok(Arc::clone(credential));
        }

        let credential = match self.auth.auth_strategy() {
            AuthStrategy::ClientSecret => {
                let Some(secret) = state.client_secret.as_deref() else {
                    tracing::info!("Client secret required but not configured");
                    return Err(CommandResult::AuthRequired {
                        kind: AuthRequiredKind::ClientSecretMissing,
                        error: instructions::CLIENT_SECRET_REQUIRED_ERROR.to_string(),
                        instructions: instructions::client_secret_required(&self.auth),
                        error_details: None,
                        device_code: None,
                        registration: Some(AppRegistration {
                            client_id: self.auth.client_id.clone(),
                            tenant_id: self.auth.tenant_id.clone(),
                        }),
                    });
                };
                tracing::info!("Using client secret credential for custom app registration");
                self.factory.client_secret(&self.auth, secret)
            }
            AuthStrategy::DeviceCode => {
                tracing::info!("Using device code credential for read-only access");
                self.factory.device_code(&self.auth)
            }
        };

        state.credential = Some(Arc::clone(&credential));
        Ok(credential)
    }

    /// Acquire a token on a worker task, waiting at most `token_wait`
    async fn acquire_token(
        &self,
        credential: Arc<dyn TokenCredential>,
    ) -> std::result::Result<AccessToken, CommandResult> {
        tracing::debug!("Getting access token");

        let (notifier, mut prompt_rx) = DeviceCodeNotifier::channel();
        let scopes = self.auth.scopes.clone();
        let worker = Arc::clone(&credential);
        let handle = tokio::spawn(async move { worker.get_token(&scopes, notifier).await });

        // Dropping the handle on timeout detaches the task; it keeps running.
        let outcome = tokio::time::timeout(self.token_wait, handle).await;
        let prompt = prompt_rx.try_recv().ok();

        match outcome {
            Ok(Ok(Ok(token))) => Ok(token),
            Ok(Ok(Err(e))) => Err(self.acquisition_failed(&credential, e.to_string(), prompt).await),
            Ok(Err(join_error)) => {
                let message = format!("Token acquisition task failed: {}", join_error);
                Err(self.acquisition_failed(&credential, message, prompt).await)
            }
            Err(_) => match prompt {
                Some(prompt) => {
                    tracing::info!("Token acquisition waiting on device code sign-in");
                    Err(device_code_required(prompt))
                }
                None => {
                    tracing::warn!("Token acquisition timed out after {:?}", self.token_wait);
                    Err(CommandResult::AuthRequired {
                        kind: AuthRequiredKind::Timeout,
                        error: instructions::AUTH_TIMEOUT_ERROR.to_string(),
                        instructions: instructions::AUTH_TIMEOUT_INSTRUCTIONS.to_string(),
                        error_details: None,
                        device_code: None,
                        registration: None,
                    })
                }
            },
        }
    }

    /// Discard the failed credential and classify the failure
    async fn acquisition_failed(
        &self,
        credential: &Arc<dyn TokenCredential>,
        message: String,
        prompt: Option<DeviceCodePrompt>,
    ) -> CommandResult {
        tracing::error!("Authentication failed: {}", message);
        self.discard_credential(credential).await;

        if let Some(prompt) = prompt {
            return device_code_required(prompt);
        }

        if self.matcher.matches(&message) {
            return CommandResult::AuthRequired {
                kind: AuthRequiredKind::InvalidClientSecret,
                error: instructions::INVALID_CLIENT_SECRET_ERROR.to_string(),
                instructions: instructions::invalid_client_secret(&self.auth),
                error_details: Some(Value::String(message)),
                device_code: None,
                registration: None,
            };
        }

        CommandResult::AuthRequired {
            kind: AuthRequiredKind::AuthenticationFailed,
            error: format!("Authentication failed: {}", message),
            instructions: instructions::RETRY_INSTRUCTIONS.to_string(),
            error_details: None,
            device_code: None,
            registration: None,
        }
    }

    /// Clear the held credential if it is still the one that failed
    async fn discard_credential(&self, failed: &Arc<dyn TokenCredential>) {
        let mut state = self.state.lock().await;
        let same = state
            .credential
            .as_ref()
            .is_some_and(|held| Arc::ptr_eq(held, failed));
        if same {
            tracing::debug!("Discarding failed {:?} credential", failed.kind());
            state.credential = None;
        }
    }

    fn command_url(&self, command: &str) -> String {
        format!("{}{}", self.api_base, command.trim_start_matches('/'))
    }

    async fn send(
        &self,
        method: HttpMethod,
        command: &str,
        body: Option<Value>,
        token: &AccessToken,
    ) -> CommandResult {
        let url = self.command_url(command);
        tracing::info!("Making {} request to: {}", method, url);

        let mut request = self
            .http
            .request(method.into(), &url)
            .bearer_auth(&token.token)
            .header(CONTENT_TYPE, "application/json");

        if method.has_body() {
            if let Some(body) = body {
                tracing::debug!(body = %body, "Request body");
                request = request.json(&body);
            }
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Graph request failed: {}", e);
                return CommandResult::error(
                    ErrorKind::Transport,
                    format!("Request to Microsoft Graph failed: {}", e),
                );
            }
        };

        let status = response.status().as_u16();
        tracing::info!("Response status: {}", status);

        match response.text().await {
            Ok(text) => normalize_response(status, &text),
            Err(e) => CommandResult::Error {
                kind: ErrorKind::Transport,
                message: format!("Failed to read Microsoft Graph response: {}", e),
                error_details: None,
                status_code: Some(status),
            },
        }
    }
}

fn device_code_required(prompt: DeviceCodePrompt) -> CommandResult {
    CommandResult::AuthRequired {
        kind: AuthRequiredKind::DeviceCode,
        error: instructions::DEVICE_CODE_REQUIRED_ERROR.to_string(),
        instructions: instructions::device_code(&prompt),
        error_details: None,
        device_code: Some(prompt),
        registration: None,
    }
}

/// Turn a Graph status and body into a result
fn normalize_response(status: u16, text: &str) -> CommandResult {
    match status {
        204 => CommandResult::success(
            json!({ "message": "Operation completed successfully (no content returned)" }),
            status,
        ),
        200 | 201 | 202 => match serde_json::from_str::<Value>(text) {
            Ok(data) => CommandResult::success(data, status),
            Err(_) => CommandResult::success(
                json!({
                    "message": "Operation completed successfully",
                    "response_text": text,
                }),
                status,
            ),
        },
        _ => match serde_json::from_str::<Value>(text) {
            Ok(details) => {
                let message = details
                    .get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(Value::as_str)
                    .unwrap_or(text)
                    .to_string();
                CommandResult::Error {
                    kind: ErrorKind::Transport,
                    message: format!("HTTP {}: {}", status, message),
                    error_details: Some(details),
                    status_code: Some(status),
                }
            }
            Err(_) => CommandResult::Error {
                kind: ErrorKind::Transport,
                message: format!("HTTP {}: {}", status, text),
                error_details: None,
                status_code: Some(status),
            },
        },
    }
}
