use super::*;
use crate::frame::ErrorCode;

#[test]
fn message_constructors_set_roles() {
    assert_eq!(Message::system("s"), Message { role: "system".into(), content: "s".into() });
    assert_eq!(Message::user("u").role, "user");
}

#[test]
fn message_serializes_as_openai_shape() {
    let json = serde_json::to_value(Message::user("hi")).unwrap();
    assert_eq!(json, serde_json::json!({ "role": "user", "content": "hi" }));
}

#[test]
fn error_codes_are_grepable() {
    assert_eq!(LlmError::ApiRequest("x".into()).error_code(), "E_API_REQUEST");
    assert_eq!(LlmError::ApiResponse { status: 400, body: String::new() }.error_code(), "E_API_RESPONSE");
    assert_eq!(LlmError::ApiParse("x".into()).error_code(), "E_API_PARSE");
    assert_eq!(LlmError::HttpClientBuild("x".into()).error_code(), "E_HTTP_CLIENT_BUILD");
}

#[test]
fn retryable_covers_transient_failures() {
    assert!(LlmError::ApiRequest("timeout".into()).retryable());
    assert!(LlmError::ApiResponse { status: 429, body: String::new() }.retryable());
    assert!(LlmError::ApiResponse { status: 503, body: String::new() }.retryable());
    assert!(!LlmError::ApiResponse { status: 401, body: String::new() }.retryable());
    assert!(!LlmError::ApiParse("x".into()).retryable());
}

#[test]
fn status_error_message_names_the_status() {
    let err = LlmError::ApiResponse { status: 500, body: "boom".into() };
    assert_eq!(err.to_string(), "API error: 500");
}
