use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use graph_mcp::auth::config::{AuthConfig, AuthInputs};
use graph_mcp::auth::credential::{
    AccessToken, CredentialFactory, CredentialKind, DeviceCodeNotifier, DeviceCodePrompt,
    TokenCredential,
};
use graph_mcp::error::{GraphMcpError, Result};
use graph_mcp::graph::{CommandExecutor, CommandExecutorBuilder};

/// Scripted behaviour of a fake credential
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum Behavior {
    /// Return this token immediately
    Token(String),
    /// Never finish
    Hang,
    /// Deliver a prompt, then never finish
    PromptThenHang(DeviceCodePrompt),
    /// Fail with an authentication error
    Fail(String),
    /// Deliver a prompt, then fail
    PromptThenFail(DeviceCodePrompt, String),
    /// Panic inside the worker task
    Panic,
}

#[derive(Debug)]
pub struct FakeCredential {
    behavior: Behavior,
    kind: CredentialKind,
    calls: AtomicUsize,
}

#[async_trait]
impl TokenCredential for FakeCredential {
    async fn get_token(
        &self,
        _scopes: &[String],
        mut notifier: DeviceCodeNotifier,
    ) -> Result<AccessToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Token(token) => Ok(AccessToken::expiring_in(token.clone(), 3600)),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(GraphMcpError::Authentication("unreachable".to_string()).into())
            }
            Behavior::PromptThenHang(prompt) => {
                notifier.notify(prompt.clone());
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(GraphMcpError::Authentication("unreachable".to_string()).into())
            }
            Behavior::Fail(message) => {
                Err(GraphMcpError::Authentication(message.clone()).into())
            }
            Behavior::PromptThenFail(prompt, message) => {
                notifier.notify(prompt.clone());
                Err(GraphMcpError::DeviceFlow(message.clone()).into())
            }
            Behavior::Panic => panic!("credential worker exploded"),
        }
    }

    fn kind(&self) -> CredentialKind {
        self.kind
    }
}

/// Factory handing out fake credentials and counting constructions
///
/// Each construction takes the next scripted behaviour; the last one repeats.
#[derive(Debug)]
pub struct FakeFactory {
    behaviors: Mutex<VecDeque<Behavior>>,
    pub device_code_built: AtomicUsize,
    pub client_secret_built: AtomicUsize,
    pub secrets: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FakeFactory {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Self::sequence(vec![behavior])
    }

    pub fn sequence(behaviors: Vec<Behavior>) -> Arc<Self> {
        Arc::new(Self {
            behaviors: Mutex::new(behaviors.into()),
            device_code_built: AtomicUsize::new(0),
            client_secret_built: AtomicUsize::new(0),
            secrets: Mutex::new(Vec::new()),
        })
    }

    pub fn constructions(&self) -> usize {
        self.device_code_built.load(Ordering::SeqCst) + self.client_secret_built.load(Ordering::SeqCst)
    }

    pub fn secrets(&self) -> Vec<String> {
        self.secrets.lock().unwrap().clone()
    }

    fn next_behavior(&self) -> Behavior {
        let mut behaviors = self.behaviors.lock().unwrap();
        if behaviors.len() > 1 {
            behaviors.pop_front().unwrap()
        } else {
            behaviors.front().cloned().unwrap_or(Behavior::Hang)
        }
    }

    fn build(&self, kind: CredentialKind) -> Arc<dyn TokenCredential> {
        Arc::new(FakeCredential {
            behavior: self.next_behavior(),
            kind,
            calls: AtomicUsize::new(0),
        })
    }
}

impl CredentialFactory for FakeFactory {
    fn device_code(&self, _config: &AuthConfig) -> Arc<dyn TokenCredential> {
        self.device_code_built.fetch_add(1, Ordering::SeqCst);
        self.build(CredentialKind::DeviceCode)
    }

    fn client_secret(&self, _config: &AuthConfig, secret: &str) -> Arc<dyn TokenCredential> {
        self.client_secret_built.fetch_add(1, Ordering::SeqCst);
        self.secrets.lock().unwrap().push(secret.to_string());
        self.build(CredentialKind::ClientSecret)
    }
}

#[allow(dead_code)]
pub fn default_auth() -> AuthConfig {
    AuthConfig::resolve(AuthInputs {
        default_client_id: "14d82eec-204b-4c2f-b7e8-296a70dab67e".to_string(),
        ..Default::default()
    })
}

#[allow(dead_code)]
pub fn custom_auth() -> AuthConfig {
    AuthConfig::resolve(AuthInputs {
        custom_client_id: Some("custom-app-id".to_string()),
        custom_tenant_id: Some("custom-tenant-id".to_string()),
        default_client_id: "14d82eec-204b-4c2f-b7e8-296a70dab67e".to_string(),
        ..Default::default()
    })
}

#[allow(dead_code)]
pub fn prompt(uri: &str, code: &str, expires_in: u64) -> DeviceCodePrompt {
    DeviceCodePrompt {
        verification_uri: uri.to_string(),
        user_code: code.to_string(),
        expires_in,
    }
}

/// Executor wired to a fake factory and a mock Graph base
#[allow(dead_code)]
pub fn executor_builder(
    auth: AuthConfig,
    graph_uri: &str,
    factory: Arc<FakeFactory>,
) -> CommandExecutorBuilder {
    CommandExecutor::builder(auth)
        .api_base(format!("{}/v1.0/", graph_uri))
        .credential_factory(factory)
        .token_wait(Duration::from_millis(300))
}
