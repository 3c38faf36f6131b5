//! Device code flow against the Microsoft identity platform
//!
//! The flow has two halves. A request to the `devicecode` endpoint returns a
//! short user code and a verification URL, which are handed to the caller
//! through the [`DeviceCodeNotifier`]. The credential then polls the `token`
//! endpoint until the user finishes signing in, the code expires, or the
//! platform reports a fatal error.
//!
//! Polling usually outlives the caller's bounded wait. The poll future is
//! therefore shared: a later `get_token` while the user has still not signed
//! in re-delivers the same prompt and joins the existing poll instead of
//! issuing a fresh code.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::auth::credential::{
    tenant_endpoint, AccessToken, CredentialKind, DeviceCodeNotifier, DeviceCodePrompt,
    IdentityErrorBody, TokenCredential, TokenResponse, TOKEN_EXPIRY_SKEW,
};
use crate::error::{GraphMcpError, Result};

/// OAuth device code grant type
const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Extra back-off applied when the platform answers `slow_down`
const SLOW_DOWN_BACKOFF: Duration = Duration::from_secs(5);

/// Response from the `devicecode` endpoint
#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    expires_in: u64,
    #[serde(default = "default_interval")]
    interval: u64,
}

fn default_interval() -> u64 {
    5
}

/// Result of one poll of the token endpoint
#[derive(Debug)]
enum PollStatus {
    Token(AccessToken),
    Pending,
    SlowDown,
}

type PollOutcome = std::result::Result<AccessToken, String>;
type SharedPoll = Shared<BoxFuture<'static, PollOutcome>>;

struct PendingFlow {
    /// Identifies the flow; a finishing poll only clears its own entry
    device_code: String,
    prompt: DeviceCodePrompt,
    expires_at: Instant,
    poll: SharedPoll,
}

#[derive(Default)]
struct FlowState {
    token: Option<AccessToken>,
    pending: Option<PendingFlow>,
}

/// Credential that signs a user in with the device code flow
pub struct DeviceCodeCredential {
    http: reqwest::Client,
    device_code_url: String,
    token_url: String,
    client_id: String,
    state: Arc<Mutex<FlowState>>,
}

impl DeviceCodeCredential {
    /// Create a credential for a public client
    ///
    /// # Arguments
    ///
    /// * `http` - Shared HTTP client
    /// * `authority_host` - Identity platform host
    /// * `tenant_id` - Tenant, or `common`
    /// * `client_id` - Public client application id
    pub fn new(http: reqwest::Client, authority_host: &str, tenant_id: &str, client_id: &str) -> Self {
        Self {
            http,
            device_code_url: tenant_endpoint(authority_host, tenant_id, "devicecode"),
            token_url: tenant_endpoint(authority_host, tenant_id, "token"),
            client_id: client_id.to_string(),
            state: Arc::new(Mutex::new(FlowState::default())),
        }
    }

    /// Request a new device code and start polling for its token
    async fn start_flow(&self, scopes: &[String]) -> Result<PendingFlow> {
        let scope = scopes.join(" ");
        let resp = self
            .http
            .post(&self.device_code_url)
            .header("Accept", "application/json")
            .form(&[("client_id", self.client_id.as_str()), ("scope", scope.as_str())])
            .send()
            .await
            .map_err(|e| GraphMcpError::Transport(format!("Device code request failed: {}", e)))?;

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
                "Device code request returned {}: {}",
                status, detail
            ))
            .into());
        }

        let device: DeviceCodeResponse = resp
            .json()
            .await
            .map_err(|e| GraphMcpError::DeviceFlow(format!("Failed to parse device code: {}", e)))?;

        let prompt = DeviceCodePrompt {
            verification_uri: device.verification_uri,
            user_code: device.user_code,
            expires_in: device.expires_in,
        };
        let expires_at = Instant::now() + Duration::from_secs(device.expires_in);

        let poll = poll_for_token(
            self.http.clone(),
            self.token_url.clone(),
            self.client_id.clone(),
            device.device_code.clone(),
            Duration::from_secs(device.interval.max(1)),
            expires_at,
            Arc::clone(&self.state),
        )
        .boxed()
        .shared();

        Ok(PendingFlow {
            device_code: device.device_code,
            prompt,
            expires_at,
            poll,
        })
    }
}

impl fmt::Debug for DeviceCodeCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCodeCredential")
            .field("device_code_url", &self.device_code_url)
            .field("client_id", &self.client_id)
            .finish()
    }
}

#[async_trait]
impl TokenCredential for DeviceCodeCredential {
    async fn get_token(
        &self,
        scopes: &[String],
        mut notifier: DeviceCodeNotifier,
    ) -> Result<AccessToken> {
        let poll = {
            let mut state = self.state.lock().await;

            if let Some(token) = state
                .token
                .as_ref()
                .filter(|t| !t.is_expiring(TOKEN_EXPIRY_SKEW))
            {
                tracing::debug!("Using cached device code token");
                return Ok(token.clone());
            }

            let reusable = state
                .pending
                .as_ref()
                .filter(|p| p.expires_at > Instant::now())
                .map(|p| (p.prompt.clone(), p.poll.clone()));

            match reusable {
                Some((prompt, poll)) => {
                    tracing::debug!("Joining device code flow already in progress");
                    notifier.notify(prompt);
                    poll
                }
                None => {
                    tracing::info!(client_id = %self.client_id, "Starting device code flow");
                    let pending = self.start_flow(scopes).await?;
                    notifier.notify(pending.prompt.clone());
                    let poll = pending.poll.clone();
                    state.pending = Some(pending);
                    poll
                }
            }
        };

        poll.await
            .map_err(|message| GraphMcpError::DeviceFlow(message).into())
    }

    fn kind(&self) -> CredentialKind {
        CredentialKind::DeviceCode
    }
}

/// Poll the token endpoint until the user finishes, the code expires, or a fatal error
async fn poll_for_token(
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    device_code: String,
    interval: Duration,
    expires_at: Instant,
    state: Arc<Mutex<FlowState>>,
) -> PollOutcome {
    let outcome = poll_loop(&http, &token_url, &client_id, &device_code, interval, expires_at).await;

    let mut state = state.lock().await;
    let own_flow = state
        .pending
        .as_ref()
        .is_some_and(|p| p.device_code == device_code);
    if own_flow {
        state.pending = None;
    }
    match &outcome {
        Ok(token) => {
            tracing::info!("Device code flow completed successfully");
            state.token = Some(token.clone());
        }
        Err(message) => tracing::warn!("Device code flow ended: {}", message),
    }

    outcome
}

async fn poll_loop(
    http: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    device_code: &str,
    interval: Duration,
    expires_at: Instant,
) -> PollOutcome {
    let mut attempt: u32 = 0;
    let mut delay = interval;

    loop {
        tokio::time::sleep(delay).await;
        if Instant::now() >= expires_at {
            return Err("Device code expired before sign-in completed".to_string());
        }
        attempt += 1;

        let response = http
            .post(token_url)
            .header("Accept", "application/json")
            .form(&[
                ("grant_type", DEVICE_CODE_GRANT),
                ("client_id", client_id),
                ("device_code", device_code),
            ])
            .send()
            .await
            .map_err(|e| format!("Token poll failed: {}", e))?;

        // Pending and error states arrive as 400 with a JSON body.
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse token poll response: {}", e))?;

        match parse_token_poll(&body)? {
            PollStatus::Token(token) => return Ok(token),
            PollStatus::Pending => {
                tracing::debug!("authorization_pending; poll attempt {}", attempt);
                delay = interval;
            }
            PollStatus::SlowDown => {
                tracing::debug!("slow_down received; backing off");
                delay = interval + SLOW_DOWN_BACKOFF;
            }
        }
    }
}

/// Classify a token endpoint response during device code polling
fn parse_token_poll(value: &serde_json::Value) -> std::result::Result<PollStatus, String> {
    if value.get("access_token").is_some() {
        let token: TokenResponse = serde_json::from_value(value.clone())
            .map_err(|e| format!("Failed to parse token: {}", e))?;
        return Ok(PollStatus::Token(token.into_access_token()));
    }

    match value.get("error").and_then(|v| v.as_str()) {
        Some("authorization_pending") => Ok(PollStatus::Pending),
        Some("slow_down") => Ok(PollStatus::SlowDown),
        Some("expired_token") => Err("Device code expired before sign-in completed".to_string()),
        Some("authorization_declined") => Err("Sign-in was declined by the user".to_string()),
        Some(_) => {
            let summary = serde_json::from_value::<IdentityErrorBody>(value.clone())
                .map(|b| b.summary())
                .unwrap_or_else(|_| value.to_string());
            Err(format!("Device code flow error from identity platform: {}", summary))
        }
        None => Ok(PollStatus::Pending),
    }
}
