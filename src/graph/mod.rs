//! Microsoft Graph command relay
//!
//! - `executor`     -- Credential handling, bounded token wait, dispatch
//! - `method`       -- Supported HTTP verbs
//! - `result`       -- `CommandResult` and its serializable envelope
//! - `instructions` -- Remediation texts shown when auth is required

pub mod executor;
pub mod instructions;
pub mod method;
pub mod result;

pub use executor::{CommandExecutor, CommandExecutorBuilder, DEFAULT_TOKEN_WAIT};
pub use method::HttpMethod;
pub use result::{AppRegistration, AuthRequiredKind, CommandEnvelope, CommandResult, ErrorKind};
