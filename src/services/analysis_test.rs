use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::frame::ExtractReply;
use crate::presenter::{Presenter, ToneSequence, VibeBand, ViewState};
use crate::services::pages::{PageChannel, PageError};
use crate::state::test_helpers::{MockLlm, MockPages, recorded, test_app_state, text_response, transcript};

fn ready_state(replies: &[&str]) -> (AppState, Arc<MockLlm>, Arc<MockPages>) {
    let llm = Arc::new(MockLlm::replying(replies));
    let pages = Arc::new(MockPages::with_messages(transcript(), 4));
    let state = test_app_state(llm.clone(), pages.clone(), Some("sk-test"));
    (state, llm, pages)
}

// =============================================================================
// parse_percentage
// =============================================================================

#[test]
fn percentage_from_formatted_reply() {
    assert_eq!(parse_percentage("0% - Just basic info exchange.").unwrap(), 0);
    assert_eq!(parse_percentage("75% - Clear tension.").unwrap(), 75);
}

#[test]
fn percentage_found_mid_text() {
    assert_eq!(parse_percentage("Well hello there, 82% if you ask me").unwrap(), 82);
}

#[test]
fn bare_number_falls_back() {
    assert_eq!(parse_percentage("Score: 45 out of a hundred").unwrap(), 45);
}

#[test]
fn percentage_clamps_to_hundred() {
    assert_eq!(parse_percentage("150% - off the charts").unwrap(), 100);
    assert_eq!(parse_percentage("99999999999999999999999 points").unwrap(), 100);
}

#[test]
fn reply_without_number_is_parse_error() {
    assert!(matches!(parse_percentage("No idea, honestly."), Err(AnalysisError::Parse)));
    assert!(matches!(parse_percentage(""), Err(AnalysisError::Parse)));
}

// =============================================================================
// ERRORS
// =============================================================================

#[test]
fn http_status_error_keeps_both_prefixes() {
    // Popup text is the transport prefix around the client's own message.
    let err = AnalysisError::from(LlmError::ApiResponse { status: 401, body: "nope".into() });
    assert_eq!(LlmError::ApiResponse { status: 401, body: String::new() }.to_string(), "API error: 401");
    assert_eq!(err.to_string(), "API Error: API error: 401");
    assert_eq!(Event::error_from(&err), Event::AnalysisError {
        error: "API Error: API error: 401".into(),
        code: "E_TRANSPORT".into(),
    });
}

#[test]
fn llm_errors_map_to_transport_or_malformed() {
    let err = AnalysisError::from(LlmError::ApiResponse { status: 401, body: "nope".into() });
    assert_eq!(err.error_code(), "E_TRANSPORT");

    let err = AnalysisError::from(LlmError::ApiParse("no choices".into()));
    assert_eq!(err.error_code(), "E_MALFORMED_RESPONSE");
    assert!(err.to_string().contains("no choices"));
}

#[test]
fn only_retryable_transport_is_retryable() {
    assert!(AnalysisError::from(LlmError::ApiRequest("reset".into())).retryable());
    assert!(!AnalysisError::from(LlmError::ApiResponse { status: 401, body: String::new() }).retryable());
    assert!(!AnalysisError::Parse.retryable());
}

// =============================================================================
// start_analysis
// =============================================================================

#[tokio::test]
async fn successful_analysis_stores_and_publishes() {
    let (state, llm, pages) = ready_state(&["64% - Decent banter."]);
    let mut rx = state.events.subscribe();

    let result = start_analysis(&state, 7).await.unwrap();
    assert_eq!(result.percentage, 64);
    assert_eq!(result.explanation, "64% - Decent banter.");
    assert!(result.timestamp > 0);

    assert_eq!(rx.try_recv().unwrap(), Event::AnalysisStarted);
    assert_eq!(rx.try_recv().unwrap(), Event::AnalysisComplete { result: result.clone() });

    let status = analysis_status(&state).await;
    assert!(!status.is_analyzing);
    assert!(status.success);
    assert_eq!(status.last_result.as_deref(), Some(&*result));

    assert_eq!(recorded(&pages.requested), vec![7]);
    let calls = recorded(&llm.calls);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "sk-test");
    assert!(calls[0].1.messages[1].content.contains("A: hey\nB: hey what's up\n"));
    assert_eq!(state.session.lock().await.current_tab_id, Some(7));
}

#[tokio::test]
async fn status_reads_share_one_result() {
    let (state, _llm, _pages) = ready_state(&["12% - meh"]);
    start_analysis(&state, 1).await.unwrap();

    let first = analysis_status(&state).await.last_result.unwrap();
    let second = analysis_status(&state).await.last_result.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn missing_credential_fails_without_calling_out() {
    let llm = Arc::new(MockLlm::replying(&["50%"]));
    let pages = Arc::new(MockPages::with_messages(transcript(), 1));
    let state = test_app_state(llm.clone(), pages.clone(), None);
    let mut rx = state.events.subscribe();

    let err = start_analysis(&state, 1).await.unwrap_err();
    assert!(matches!(err, AnalysisError::CredentialMissing));
    assert_eq!(
        rx.try_recv().unwrap(),
        Event::AnalysisError { error: "API key not found".into(), code: "E_CREDENTIAL_MISSING".into() }
    );
    assert!(!analysis_status(&state).await.is_analyzing);
    assert_eq!(llm.call_count(), 0);
    assert!(recorded(&pages.requested).is_empty());
}

#[tokio::test]
async fn empty_page_is_no_messages_found() {
    let llm = Arc::new(MockLlm::replying(&["50%"]));
    let pages = Arc::new(MockPages::with_messages(Vec::new(), 1));
    let state = test_app_state(llm.clone(), pages, Some("k"));

    let err = start_analysis(&state, 1).await.unwrap_err();
    assert!(matches!(err, AnalysisError::NoMessagesFound));
    assert_eq!(err.to_string(), "No chat messages found on this page!");
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn unreachable_tab_is_extraction_failed() {
    let llm = Arc::new(MockLlm::replying(&[]));
    let pages = Arc::new(MockPages::new(vec![Err(PageError::NoPageContext(3))]));
    let state = test_app_state(llm, pages, Some("k"));

    let err = start_analysis(&state, 3).await.unwrap_err();
    assert!(matches!(err, AnalysisError::ExtractionFailed));
    assert_eq!(err.to_string(), "Could not extract messages. Make sure you're on a chat page!");
}

struct SilentPages;

#[async_trait]
impl PageChannel for SilentPages {
    async fn extract_messages(&self, _tab_id: TabId) -> Result<ExtractReply, PageError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn silent_page_times_out_as_extraction_failed() {
    let llm = Arc::new(MockLlm::replying(&[]));
    let mut state = test_app_state(llm, Arc::new(SilentPages), Some("k"));
    state.options.extract_timeout = Duration::from_millis(20);

    let err = start_analysis(&state, 9).await.unwrap_err();
    assert!(matches!(err, AnalysisError::ExtractionFailed));
    assert!(!analysis_status(&state).await.is_analyzing);
}

#[tokio::test]
async fn unparseable_reply_clears_previous_result() {
    let (state, _llm, _pages) = ready_state(&["40% - fine", "I refuse to score this."]);
    start_analysis(&state, 1).await.unwrap();
    assert!(analysis_status(&state).await.last_result.is_some());

    let err = start_analysis(&state, 1).await.unwrap_err();
    assert!(matches!(err, AnalysisError::Parse));
    let status = analysis_status(&state).await;
    assert!(status.last_result.is_none());
    assert!(!status.is_analyzing);
}

#[tokio::test]
async fn transport_failure_publishes_api_error() {
    let llm = Arc::new(MockLlm::new(vec![Err(LlmError::ApiResponse { status: 500, body: "down".into() })]));
    let pages = Arc::new(MockPages::with_messages(transcript(), 1));
    let state = test_app_state(llm, pages, Some("k"));
    let mut rx = state.events.subscribe();

    start_analysis(&state, 1).await.unwrap_err();
    assert_eq!(rx.try_recv().unwrap(), Event::AnalysisStarted);
    assert_eq!(
        rx.try_recv().unwrap(),
        Event::AnalysisError { error: "API Error: API error: 500".into(), code: "E_TRANSPORT".into() }
    );
}

/// Holds the first extraction until released; later ones answer at once.
struct GatedPages {
    gate: Notify,
    calls: AtomicUsize,
}

#[async_trait]
impl PageChannel for GatedPages {
    async fn extract_messages(&self, _tab_id: TabId) -> Result<ExtractReply, PageError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.gate.notified().await;
        }
        Ok(ExtractReply::from_messages(transcript()))
    }
}

#[tokio::test]
async fn stale_attempt_cannot_overwrite_newer_result() {
    let llm = Arc::new(MockLlm::new(vec![Ok(text_response("20% - newer")), Ok(text_response("90% - stale"))]));
    let pages = Arc::new(GatedPages { gate: Notify::new(), calls: AtomicUsize::new(0) });
    let state = test_app_state(llm, pages.clone(), Some("k"));

    let older = {
        let state = state.clone();
        tokio::spawn(async move { start_analysis(&state, 1).await })
    };
    for _ in 0..100 {
        if pages.calls.load(Ordering::SeqCst) > 0 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(pages.calls.load(Ordering::SeqCst), 1);

    let newer = start_analysis(&state, 2).await.unwrap();
    assert_eq!(newer.percentage, 20);

    let mut rx = state.events.subscribe();
    pages.gate.notify_one();
    let stale = older.await.unwrap();
    assert!(matches!(stale, Err(AnalysisError::Superseded)));
    assert!(rx.try_recv().is_err());

    let status = analysis_status(&state).await;
    assert!(!status.is_analyzing);
    assert_eq!(status.last_result.unwrap().percentage, 20);
}

#[tokio::test]
async fn pull_cannot_settle_after_push_won() {
    let llm = Arc::new(MockLlm::replying(&["40% - pushed", "90% - pulled"]));
    let pages = Arc::new(GatedPages { gate: Notify::new(), calls: AtomicUsize::new(0) });
    let state = test_app_state(llm.clone(), pages.clone(), Some("k"));
    let mut rx = state.events.subscribe();

    let pull = {
        let state = state.clone();
        tokio::spawn(async move { start_analysis(&state, 1).await })
    };
    for _ in 0..100 {
        if pages.calls.load(Ordering::SeqCst) > 0 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(pages.calls.load(Ordering::SeqCst), 1);

    let pushed = messages_extracted(&state, &transcript()).await.unwrap().unwrap();
    assert_eq!(pushed.percentage, 40);

    pages.gate.notify_one();
    assert!(matches!(pull.await.unwrap(), Err(AnalysisError::Superseded)));
    assert_eq!(llm.call_count(), 2);

    assert_eq!(rx.try_recv().unwrap(), Event::AnalysisStarted);
    let Ok(Event::AnalysisComplete { result }) = rx.try_recv() else {
        panic!("expected one completion");
    };
    assert_eq!(result.percentage, 40);
    assert!(rx.try_recv().is_err());

    let status = analysis_status(&state).await;
    assert!(!status.is_analyzing);
    assert_eq!(status.last_result.unwrap().percentage, 40);
}

#[tokio::test]
async fn push_after_settle_is_ignored() {
    let (state, llm, _pages) = ready_state(&["10% - first"]);
    start_analysis(&state, 1).await.unwrap();
    state.session.lock().await.is_analyzing = true;

    let outcome = messages_extracted(&state, &transcript()).await.unwrap();
    assert!(matches!(outcome, Err(AnalysisError::Superseded)));
    assert_eq!(llm.call_count(), 2);
    assert_eq!(analysis_status(&state).await.last_result.unwrap().percentage, 10);
}

// =============================================================================
// WORKED EXAMPLE
// =============================================================================

#[tokio::test]
async fn small_talk_transcript_renders_low_band() {
    let (state, llm, _pages) = ready_state(&["0% - Just basic info exchange."]);
    let mut rx = state.events.subscribe();

    let result = start_analysis(&state, 7).await.unwrap();
    assert_eq!(result.percentage, 0);
    assert_eq!(result.explanation, "0% - Just basic info exchange.");
    let (_, request) = &recorded(&llm.calls)[0];
    assert!(request.messages.iter().any(|m| m.content.contains("A: hey\nB: hey what's up")));

    let mut presenter = Presenter::new();
    presenter.analyze_clicked(true);
    assert_eq!(presenter.apply(&rx.try_recv().unwrap()).view, ViewState::Loading);
    let model = presenter.apply(&rx.try_recv().unwrap());
    assert!(matches!(
        model.view,
        ViewState::Result { percentage: 0, band: VibeBand::Low, color: "--bad-vibe-color", .. }
    ));
    assert_eq!(presenter.view(), &model.view);
    assert_eq!(model.tone, Some(ToneSequence::success(0)));
}

// =============================================================================
// messages_extracted
// =============================================================================

#[tokio::test]
async fn pushed_messages_ignored_when_idle() {
    let (state, llm, _pages) = ready_state(&["50%"]);
    assert!(messages_extracted(&state, &transcript()).await.is_none());
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn pushed_messages_settle_running_attempt() {
    let (state, _llm, _pages) = ready_state(&["33% - pushed"]);
    {
        let mut session = state.session.lock().await;
        session.generation = 4;
        session.is_analyzing = true;
    }

    let result = messages_extracted(&state, &transcript()).await.unwrap().unwrap();
    assert_eq!(result.percentage, 33);
    let status = analysis_status(&state).await;
    assert!(!status.is_analyzing);
    assert_eq!(status.last_result.unwrap().percentage, 33);
}

#[tokio::test]
async fn pushed_empty_list_is_no_messages_found() {
    let (state, llm, _pages) = ready_state(&["50%"]);
    state.session.lock().await.is_analyzing = true;

    let outcome = messages_extracted(&state, &[]).await.unwrap();
    assert!(matches!(outcome, Err(AnalysisError::NoMessagesFound)));
    assert_eq!(llm.call_count(), 0);
}

// =============================================================================
// extract_messages / credential
// =============================================================================

#[tokio::test]
async fn extract_messages_returns_reply_without_analyzing() {
    let (state, llm, _pages) = ready_state(&[]);
    let reply = extract_messages(&state, 5).await.unwrap();
    assert!(reply.success);
    assert_eq!(reply.messages, transcript());
    assert_eq!(llm.call_count(), 0);
    assert!(analysis_status(&state).await.last_result.is_none());
}

#[tokio::test]
async fn save_api_key_trims_and_caches() {
    let state = test_app_state(Arc::new(MockLlm::replying(&[])), Arc::new(MockPages::new(Vec::new())), None);
    assert!(!has_credential(&state).await.unwrap());

    save_api_key(&state, "  sk-new \n").await.unwrap();
    assert_eq!(state.settings.get(API_KEY).await.unwrap().as_deref(), Some("sk-new"));
    assert_eq!(state.session.lock().await.api_key.as_deref(), Some("sk-new"));
    assert!(has_credential(&state).await.unwrap());
}

#[tokio::test]
async fn save_api_key_rejects_blank() {
    let state = test_app_state(Arc::new(MockLlm::replying(&[])), Arc::new(MockPages::new(Vec::new())), Some("old"));
    let err = save_api_key(&state, "   ").await.unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidApiKey));
    assert_eq!(state.settings.get(API_KEY).await.unwrap().as_deref(), Some("old"));
}

#[tokio::test]
async fn credential_read_once_then_cached() {
    let (state, _llm, _pages) = ready_state(&[]);
    assert!(state.session.lock().await.api_key.is_none());
    assert_eq!(cached_credential(&state).await.unwrap().as_deref(), Some("sk-test"));
    assert_eq!(state.session.lock().await.api_key.as_deref(), Some("sk-test"));
}
