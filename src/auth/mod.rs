//! Authentication against the Microsoft identity platform
//!
//! Two mutually exclusive flows are supported: the interactive device code
//! flow for the default public client, and the client credentials flow for a
//! custom app registration.
//!
//! # Module Layout
//!
//! - `config`         -- Auth mode resolution from the configured overrides
//! - `credential`     -- `TokenCredential` trait, tokens, prompts, factory
//! - `device_code`    -- Device code credential with a shared pending flow
//! - `client_secret`  -- Client credentials credential
//! - `secret_matcher` -- Recognises "invalid client secret" rejections

pub mod client_secret;
pub mod config;
pub mod credential;
pub mod device_code;
pub mod secret_matcher;

pub use client_secret::ClientSecretCredential;
pub use config::{AuthConfig, AuthInputs, AuthMode, AuthStrategy};
pub use credential::{
    AccessToken, CredentialFactory, CredentialKind, DeviceCodeNotifier, DeviceCodePrompt,
    IdentityCredentialFactory, TokenCredential,
};
pub use device_code::DeviceCodeCredential;
pub use secret_matcher::InvalidSecretMatcher;
