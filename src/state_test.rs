use super::*;
use crate::state::test_helpers::{MockLlm, MockPages, test_app_state};

#[test]
fn session_starts_idle() {
    let session = SessionState::default();
    assert!(!session.is_analyzing);
    assert!(session.last_result.is_none());
    assert!(session.api_key.is_none());
    assert!(session.current_tab_id.is_none());
    assert_eq!(session.generation, 0);
    assert!(session.settled.is_none());
}

#[test]
fn analysis_result_serde_shape() {
    let result = AnalysisResult { percentage: 0, explanation: "0% - Just basic info exchange.".into(), timestamp: 17 };
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["percentage"], 0);
    assert_eq!(json["explanation"], "0% - Just basic info exchange.");
    let restored: AnalysisResult = serde_json::from_value(json).unwrap();
    assert_eq!(restored, result);
}

#[tokio::test]
async fn publish_reaches_subscribers() {
    let state = test_app_state(Arc::new(MockLlm::new(Vec::new())), Arc::new(MockPages::new(Vec::new())), None);
    let mut rx = state.events.subscribe();
    state.publish(Event::AnalysisStarted);
    assert_eq!(rx.recv().await.unwrap(), Event::AnalysisStarted);
}

#[test]
fn publish_without_subscribers_is_harmless() {
    let state = test_app_state(Arc::new(MockLlm::new(Vec::new())), Arc::new(MockPages::new(Vec::new())), None);
    state.publish(Event::AnalysisStarted);
}

#[tokio::test]
async fn clones_share_the_session() {
    let state = test_app_state(Arc::new(MockLlm::new(Vec::new())), Arc::new(MockPages::new(Vec::new())), None);
    let other = state.clone();
    other.session.lock().await.generation = 9;
    assert_eq!(state.session.lock().await.generation, 9);
}
