use super::*;
use serde_json::json;

#[test]
fn requests_parse_from_action_tagged_json() {
    let start: Request = serde_json::from_value(json!({ "action": "startAnalysis", "tabId": 7 })).unwrap();
    assert_eq!(start, Request::StartAnalysis { tab_id: 7 });

    let status: Request = serde_json::from_value(json!({ "action": "getAnalysisStatus" })).unwrap();
    assert_eq!(status, Request::GetAnalysisStatus);

    let pushed: Request = serde_json::from_value(json!({
        "action": "messagesExtracted",
        "messages": [{ "sender": "Me", "text": "hi", "timestamp": "" }]
    }))
    .unwrap();
    assert_eq!(pushed, Request::MessagesExtracted { messages: vec![ChatMessage::new("Me", "hi", "")] });

    let key: Request = serde_json::from_value(json!({ "action": "saveApiKey", "apiKey": "sk-1" })).unwrap();
    assert_eq!(key, Request::SaveApiKey { api_key: "sk-1".into() });
}

#[test]
fn unknown_action_is_rejected() {
    assert!(serde_json::from_value::<Request>(json!({ "action": "selfDestruct" })).is_err());
    assert!(serde_json::from_value::<Request>(json!({ "tabId": 1 })).is_err());
}

#[test]
fn inbound_carries_optional_id() {
    let id = Uuid::new_v4();
    let with_id: Inbound = serde_json::from_value(json!({ "id": id, "action": "getAnalysisStatus" })).unwrap();
    assert_eq!(with_id.id, Some(id));
    assert_eq!(with_id.request, Request::GetAnalysisStatus);

    let without: Inbound = serde_json::from_value(json!({ "action": "startAnalysis", "tabId": 3 })).unwrap();
    assert_eq!(without.id, None);
    assert_eq!(without.request.action(), "startAnalysis");
}

#[test]
fn events_serialize_with_action_tag() {
    let result = Arc::new(AnalysisResult { percentage: 82, explanation: "82% - warm".into(), timestamp: 5 });
    assert_eq!(serde_json::to_value(Event::AnalysisStarted).unwrap(), json!({ "action": "analysisStarted" }));
    assert_eq!(
        serde_json::to_value(Event::AnalysisComplete { result }).unwrap(),
        json!({
            "action": "analysisComplete",
            "result": { "percentage": 82, "explanation": "82% - warm", "timestamp": 5 }
        })
    );
}

#[test]
fn error_event_from_typed_error() {
    #[derive(Debug, thiserror::Error)]
    #[error("not found")]
    struct NotFound;

    impl ErrorCode for NotFound {
        fn error_code(&self) -> &'static str {
            "E_NOT_FOUND"
        }
    }

    assert!(!NotFound.retryable());
    assert_eq!(
        Event::error_from(&NotFound),
        Event::AnalysisError { error: "not found".into(), code: "E_NOT_FOUND".into() }
    );
}

#[test]
fn status_reply_uses_camel_case() {
    let reply = StatusReply { is_analyzing: true, last_result: None, success: true };
    assert_eq!(
        serde_json::to_value(&reply).unwrap(),
        json!({ "isAnalyzing": true, "lastResult": null, "success": true })
    );
}

#[test]
fn extract_reply_success_tracks_emptiness() {
    assert!(!ExtractReply::from_messages(Vec::new()).success);
    assert!(ExtractReply::from_messages(vec![ChatMessage::new("Me", "x", "")]).success);
}

#[test]
fn outbound_frames_flatten_kind_and_parent() {
    let id = Uuid::new_v4();
    let reply = Frame::reply(Some(id), Outbound::ApiKey(SaveKeyReply { success: true, error: None }));
    let value = serde_json::to_value(&reply).unwrap();
    assert_eq!(value["kind"], "apiKey");
    assert_eq!(value["parentId"], json!(id));
    assert_eq!(value["success"], true);
    assert!(value.get("error").is_none());
    assert!(value["ts"].as_i64().unwrap() > 0);

    let event = serde_json::to_value(Frame::push(Outbound::Event(Event::AnalysisStarted))).unwrap();
    assert_eq!(event["kind"], "event");
    assert_eq!(event["action"], "analysisStarted");
    assert!(event.get("parentId").is_none());
}
