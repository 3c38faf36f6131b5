//! Command executor integration tests
//!
//! Graph is mocked with wiremock; credentials come from a scripted fake
//! factory so each auth branch can be driven deterministically.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{any, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{custom_auth, default_auth, executor_builder, prompt, Behavior, FakeFactory};
use graph_mcp::graph::{AuthRequiredKind, CommandResult, ErrorKind};

fn token() -> Behavior {
    Behavior::Token("test-token".to_string())
}

// ---------------------------------------------------------------------------
// Response normalization
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_delete_no_content_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1.0/users/1"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor_builder(default_auth(), &server.uri(), FakeFactory::new(token()))
        .build()
        .unwrap();
    let result = executor.execute("users/1", "DELETE", None, None).await;

    assert_eq!(
        serde_json::to_value(result.envelope()).unwrap(),
        json!({
            "success": true,
            "data": {"message": "Operation completed successfully (no content returned)"},
            "status_code": 204,
            "auth_required": false
        })
    );
}

#[tokio::test]
async fn test_not_found_error_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0/users/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": {"message": "Not found"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor_builder(default_auth(), &server.uri(), FakeFactory::new(token()))
        .build()
        .unwrap();
    let result = executor.execute("/users/missing", "get", None, None).await;

    match result {
        CommandResult::Error {
            kind,
            message,
            error_details,
            status_code,
        } => {
            assert_eq!(kind, ErrorKind::Transport);
            assert_eq!(message, "HTTP 404: Not found");
            assert_eq!(error_details, Some(json!({"error": {"message": "Not found"}})));
            assert_eq!(status_code, Some(404));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_put_body_round_trips() {
    let server = MockServer::start().await;
    let body = json!({"displayName": "Contoso", "tags": ["a", "b"], "nested": {"n": 1}});
    Mock::given(method("PUT"))
        .and(path("/v1.0/groups/g1"))
        .and(body_json(body.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "g1"})))
        .expect(1)
        .mount(&server)
        .await;

    let executor = executor_builder(default_auth(), &server.uri(), FakeFactory::new(token()))
        .build()
        .unwrap();
    let result = executor.execute("groups/g1", "PUT", Some(body), None).await;

    assert_eq!(result, CommandResult::success(json!({"id": "g1"}), 200));
}

#[tokio::test]
async fn test_non_json_success_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1.0/me/sendMail"))
        .respond_with(ResponseTemplate::new(202).set_body_string("queued"))
        .mount(&server)
        .await;

    let executor = executor_builder(default_auth(), &server.uri(), FakeFactory::new(token()))
        .build()
        .unwrap();
    let result = executor
        .execute("me/sendMail", "POST", Some(json!({"message": {}})), None)
        .await;

    assert_eq!(
        result,
        CommandResult::success(
            json!({"message": "Operation completed successfully", "response_text": "queued"}),
            202
        )
    );
}

#[tokio::test]
async fn test_network_fault_is_transport_error() {
    let factory = FakeFactory::new(token());
    // Nothing listens on port 1.
    let executor = executor_builder(default_auth(), "http://127.0.0.1:1", factory)
        .build()
        .unwrap();
    let result = executor.execute("me", "GET", None, None).await;

    match result {
        CommandResult::Error { kind, message, .. } => {
            assert_eq!(kind, ErrorKind::Transport);
            assert!(message.starts_with("Request to Microsoft Graph failed"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_unsupported_method_makes_no_calls() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let factory = FakeFactory::new(token());
    let executor = executor_builder(default_auth(), &server.uri(), factory.clone())
        .build()
        .unwrap();
    let result = executor.execute("users", "HEAD", None, None).await;

    assert_eq!(
        result,
        CommandResult::error(ErrorKind::UnsupportedOperation, "Unsupported HTTP method: HEAD")
    );
    assert_eq!(factory.constructions(), 0);
}

// ---------------------------------------------------------------------------
// Credential lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_client_secret_missing_makes_no_calls() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let factory = FakeFactory::new(token());
    let executor = executor_builder(custom_auth(), &server.uri(), factory.clone())
        .build()
        .unwrap();
    let result = executor.execute("users", "GET", None, None).await;

    match &result {
        CommandResult::AuthRequired {
            kind,
            error,
            instructions,
            ..
        } => {
            assert_eq!(*kind, AuthRequiredKind::ClientSecretMissing);
            assert_eq!(error, "Client secret required for custom app registration");
            assert!(instructions.contains("custom-app-id"));
            assert!(instructions.contains("custom-tenant-id"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    let envelope = result.envelope();
    assert!(envelope.auth_required);
    assert_eq!(envelope.auth_type.as_deref(), Some("client_secret"));
    assert_eq!(envelope.client_id.as_deref(), Some("custom-app-id"));
    assert_eq!(envelope.tenant_id.as_deref(), Some("custom-tenant-id"));
    assert_eq!(factory.constructions(), 0);
    assert!(executor.current_credential().await.is_none());
}

#[tokio::test]
async fn test_secret_override_is_cached_for_later_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .expect(2)
        .mount(&server)
        .await;

    let factory = FakeFactory::new(token());
    let executor = executor_builder(custom_auth(), &server.uri(), factory.clone())
        .build()
        .unwrap();

    let first = executor
        .execute("users", "GET", None, Some("override-secret".to_string()))
        .await;
    let second = executor.execute("users", "GET", None, None).await;

    assert!(first.is_success());
    assert!(second.is_success());
    assert!(executor.has_client_secret().await);
    assert_eq!(factory.secrets(), vec!["override-secret".to_string()]);
}

#[tokio::test]
async fn test_credential_constructed_once_across_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "me"})))
        .expect(2)
        .mount(&server)
        .await;

    let factory = FakeFactory::new(token());
    let executor = executor_builder(default_auth(), &server.uri(), factory.clone())
        .build()
        .unwrap();

    assert!(executor.execute("me", "GET", None, None).await.is_success());
    let first = executor.current_credential().await.unwrap();
    assert!(executor.execute("me", "GET", None, None).await.is_success());
    let second = executor.current_credential().await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(factory.device_code_built.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_timeout_without_prompt() {
    let factory = FakeFactory::new(Behavior::Hang);
    let executor = executor_builder(default_auth(), "http://127.0.0.1:1", factory.clone())
        .token_wait(Duration::from_millis(100))
        .build()
        .unwrap();

    let result = executor.execute("me", "GET", None, None).await;

    match &result {
        CommandResult::AuthRequired {
            kind,
            error,
            instructions,
            device_code,
            ..
        } => {
            assert_eq!(*kind, AuthRequiredKind::Timeout);
            assert_eq!(error, "Authentication timeout");
            assert_eq!(instructions, "Authentication timed out. Please try again.");
            assert!(device_code.is_none());
        }
        other => panic!("unexpected result: {:?}", other),
    }
    // A timed-out credential is kept.
    assert!(executor.current_credential().await.is_some());
}

#[tokio::test]
async fn test_device_code_prompt_surfaces_on_timeout() {
    let factory = FakeFactory::new(Behavior::PromptThenHang(prompt("https://x", "ABC-123", 600)));
    let executor = executor_builder(default_auth(), "http://127.0.0.1:1", factory.clone())
        .build()
        .unwrap();

    let result = executor.execute("me", "GET", None, None).await;
    let envelope = result.envelope();

    assert_eq!(result.auth_kind(), Some(AuthRequiredKind::DeviceCode));
    assert!(!envelope.success);
    assert!(envelope.auth_required);
    assert_eq!(envelope.error.as_deref(), Some("Device code authentication required"));
    assert_eq!(envelope.verification_uri.as_deref(), Some("https://x"));
    assert_eq!(envelope.user_code.as_deref(), Some("ABC-123"));
    assert_eq!(envelope.expires_in, Some(600));
    let instructions = envelope.instructions.unwrap();
    assert!(instructions.contains("1. Open this URL in your browser: https://x"));
    assert!(instructions.contains("2. Enter this code: ABC-123"));
    assert!(executor.current_credential().await.is_some());
}

#[tokio::test]
async fn test_device_code_prompt_with_failure_discards_credential() {
    let factory = FakeFactory::new(Behavior::PromptThenFail(
        prompt("https://microsoft.com/devicelogin", "XYZ-999", 900),
        "expired_token".to_string(),
    ));
    let executor = executor_builder(default_auth(), "http://127.0.0.1:1", factory.clone())
        .build()
        .unwrap();

    let result = executor.execute("me", "GET", None, None).await;

    assert_eq!(result.auth_kind(), Some(AuthRequiredKind::DeviceCode));
    assert_eq!(result.envelope().user_code.as_deref(), Some("XYZ-999"));
    assert!(executor.current_credential().await.is_none());
}

#[tokio::test]
async fn test_invalid_client_secret_discards_credential() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .expect(1)
        .mount(&server)
        .await;

    let factory = FakeFactory::sequence(vec![
        Behavior::Fail(
            "invalid_client: AADSTS7000215: Invalid client secret provided.".to_string(),
        ),
        token(),
    ]);
    let executor = executor_builder(custom_auth(), &server.uri(), factory.clone())
        .client_secret(Some("secret-id-not-value".to_string()))
        .build()
        .unwrap();

    let result = executor.execute("users", "GET", None, None).await;
    match &result {
        CommandResult::AuthRequired {
            kind,
            error,
            instructions,
            error_details,
            ..
        } => {
            assert_eq!(*kind, AuthRequiredKind::InvalidClientSecret);
            assert_eq!(error, "Invalid client secret provided");
            assert!(instructions.contains("Secret ID instead of the Secret Value"));
            assert!(error_details
                .as_ref()
                .and_then(|d| d.as_str())
                .unwrap()
                .contains("AADSTS7000215"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(executor.current_credential().await.is_none());

    // A corrected secret builds a fresh credential.
    let retry = executor
        .execute("users", "GET", None, Some("real-secret-value".to_string()))
        .await;
    assert!(retry.is_success());
    assert_eq!(
        factory.secrets(),
        vec!["secret-id-not-value".to_string(), "real-secret-value".to_string()]
    );
}

#[tokio::test]
async fn test_other_failure_is_authentication_failed() {
    let factory = FakeFactory::new(Behavior::Fail("AADSTS700016: Application not found".to_string()));
    let executor = executor_builder(custom_auth(), "http://127.0.0.1:1", factory.clone())
        .client_secret(Some("s".to_string()))
        .build()
        .unwrap();

    let result = executor.execute("users", "GET", None, None).await;

    match &result {
        CommandResult::AuthRequired {
            kind,
            error,
            instructions,
            ..
        } => {
            assert_eq!(*kind, AuthRequiredKind::AuthenticationFailed);
            assert!(error.starts_with("Authentication failed: "));
            assert!(error.contains("AADSTS700016"));
            assert_eq!(
                instructions,
                "Please try again. If the issue persists, you may need to clear cached credentials."
            );
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(executor.current_credential().await.is_none());
}

#[tokio::test]
async fn test_worker_panic_is_authentication_failure() {
    let factory = FakeFactory::new(Behavior::Panic);
    let executor = executor_builder(default_auth(), "http://127.0.0.1:1", factory)
        .build()
        .unwrap();

    let result = executor.execute("me", "GET", None, None).await;

    assert_eq!(result.auth_kind(), Some(AuthRequiredKind::AuthenticationFailed));
    assert!(result
        .error_message()
        .unwrap()
        .contains("Token acquisition task failed"));
    assert!(executor.current_credential().await.is_none());
}

#[tokio::test]
async fn test_custom_matcher_pattern_classifies_expired_secret() {
    let factory = FakeFactory::new(Behavior::Fail(
        "AADSTS7000222: The provided client secret keys are expired.".to_string(),
    ));
    let executor = executor_builder(custom_auth(), "http://127.0.0.1:1", factory)
        .client_secret(Some("s".to_string()))
        .secret_matcher(
            graph_mcp::auth::InvalidSecretMatcher::default().with_patterns(["AADSTS7000222"]),
        )
        .build()
        .unwrap();

    let result = executor.execute("users", "GET", None, None).await;
    assert_eq!(result.auth_kind(), Some(AuthRequiredKind::InvalidClientSecret));
}

#[tokio::test]
async fn test_concurrent_calls_share_one_credential() {
    let factory = FakeFactory::new(Behavior::PromptThenHang(prompt("https://x", "ABC-123", 600)));
    let executor = Arc::new(
        executor_builder(default_auth(), "http://127.0.0.1:1", factory.clone())
            .build()
            .unwrap(),
    );

    let (a, b) = tokio::join!(
        executor.execute("me", "GET", None, None),
        executor.execute("users", "GET", None, None)
    );

    assert_eq!(a.auth_kind(), Some(AuthRequiredKind::DeviceCode));
    assert_eq!(b.auth_kind(), Some(AuthRequiredKind::DeviceCode));
    assert_eq!(a.envelope().user_code.as_deref(), Some("ABC-123"));
    assert_eq!(b.envelope().user_code.as_deref(), Some("ABC-123"));
    assert_eq!(factory.constructions(), 1);
}

#[tokio::test]
async fn test_device_code_prompt_does_not_leak_into_next_attempt() {
    let factory = FakeFactory::sequence(vec![
        Behavior::PromptThenFail(prompt("https://x", "ABC-123", 600), "expired_token".to_string()),
        Behavior::Hang,
    ]);
    let executor = executor_builder(default_auth(), "http://127.0.0.1:1", factory.clone())
        .token_wait(Duration::from_millis(100))
        .build()
        .unwrap();

    let first = executor.execute("me", "GET", None, None).await;
    assert_eq!(first.auth_kind(), Some(AuthRequiredKind::DeviceCode));

    let second = executor.execute("me", "GET", None, None).await;
    match &second {
        CommandResult::AuthRequired {
            kind, device_code, ..
        } => {
            assert_eq!(*kind, AuthRequiredKind::Timeout);
            assert!(device_code.is_none());
        }
        other => panic!("unexpected result: {:?}", other),
    }
    let envelope = second.envelope();
    assert!(envelope.verification_uri.is_none());
    assert!(envelope.user_code.is_none());
    assert_eq!(factory.constructions(), 2);
}
