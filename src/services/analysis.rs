//! Analysis service — the coordinator's session state machine.
//!
//! DESIGN
//! ======
//! `startAnalysis` asks the page channel for messages, sends them to the
//! analyzer, parses a percentage out of the reply, and records the result.
//! Every failure lands on one error path: `isAnalyzing` goes false,
//! `lastResult` is cleared, and an `analysisError` event carries a
//! human-readable message. Nothing is retried.
//!
//! CONCURRENCY
//! ===========
//! Each `startAnalysis` claims a new generation before its first await.
//! Only the attempt holding the current generation may flip `isAnalyzing`,
//! write `lastResult`, or publish a terminal event, and it does so once; a
//! superseded or already-settled attempt finishes quietly with
//! [`AnalysisError::Superseded`]. Events are
//! published while the session lock is held so subscribers see them in
//! state order. The lock is never held across I/O.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::frame::{ErrorCode, Event, ExtractReply, StatusReply, TabId, now_ms};
use crate::llm::LlmError;
use crate::scraper::ChatMessage;
use crate::services::prompt;
use crate::services::settings::{API_KEY, SettingsError};
use crate::state::{AnalysisResult, AppState};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("API key not found")]
    CredentialMissing,

    #[error("Please enter a valid API key!")]
    InvalidApiKey,

    #[error("Could not extract messages. Make sure you're on a chat page!")]
    ExtractionFailed,

    #[error("No chat messages found on this page!")]
    NoMessagesFound,

    #[error("API Error: {0}")]
    Transport(LlmError),

    #[error("Could not parse percentage from AI response. Try again.")]
    Parse,

    #[error("Could not parse the API response: {0}")]
    MalformedResponse(String),

    #[error("Could not access settings: {0}")]
    Settings(#[from] SettingsError),

    /// A newer attempt started before this one finished.
    #[error("analysis superseded by a newer request")]
    Superseded,
}

impl ErrorCode for AnalysisError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::CredentialMissing => "E_CREDENTIAL_MISSING",
            Self::InvalidApiKey => "E_INVALID_API_KEY",
            Self::ExtractionFailed => "E_EXTRACTION_FAILED",
            Self::NoMessagesFound => "E_NO_MESSAGES_FOUND",
            Self::Transport(_) => "E_TRANSPORT",
            Self::Parse => "E_PARSE",
            Self::MalformedResponse(_) => "E_MALFORMED_RESPONSE",
            Self::Settings(_) => "E_SETTINGS",
            Self::Superseded => "E_SUPERSEDED",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Transport(e) if e.retryable())
    }
}

impl From<LlmError> for AnalysisError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::ApiParse(detail) => Self::MalformedResponse(detail),
            other => Self::Transport(other),
        }
    }
}

// =============================================================================
// PERCENTAGE PARSING
// =============================================================================

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(err) => {
            tracing::error!(%pattern, %err, "analysis: pattern failed to compile");
            None
        }
    })
    .as_ref()
}

/// `NN%` with ASCII word boundaries on both sides, anywhere in the text.
fn percent_pattern() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&CELL, r"(?-u:\b)([0-9]{1,3})%(?-u:\b)")
}

/// The first run of digits.
fn leading_number_pattern() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&CELL, r"^[^0-9]*([0-9]+)[^0-9%]*")
}

/// Pull a percentage out of an analyzer reply, clamped to `0..=100`.
///
/// The `NN%` pattern is tried first, then the first bare number. A reply
/// with neither is [`AnalysisError::Parse`]; there is no zero default.
///
/// # Errors
///
/// Returns [`AnalysisError::Parse`] when no number is found.
pub fn parse_percentage(content: &str) -> Result<u8, AnalysisError> {
    let digits = [percent_pattern(), leading_number_pattern()]
        .into_iter()
        .flatten()
        .find_map(|re| re.captures(content).and_then(|caps| caps.get(1)))
        .ok_or(AnalysisError::Parse)?;
    let value = digits.as_str().parse::<u64>().unwrap_or(u64::MAX).min(100);
    u8::try_from(value).map_err(|_| AnalysisError::Parse)
}

// =============================================================================
// CREDENTIAL
// =============================================================================

/// The cached credential, reading and caching it from settings on first use.
///
/// # Errors
///
/// Returns a [`SettingsError`] if the store cannot be read.
pub async fn cached_credential(state: &AppState) -> Result<Option<String>, SettingsError> {
    if let Some(key) = state.session.lock().await.api_key.clone() {
        return Ok(Some(key));
    }
    let stored = state
        .settings
        .get(API_KEY)
        .await?
        .filter(|key| !key.trim().is_empty());
    if let Some(key) = &stored {
        state.session.lock().await.api_key = Some(key.clone());
        debug!("analysis: credential cached");
    }
    Ok(stored)
}

/// Whether a credential is available.
///
/// # Errors
///
/// Returns a [`SettingsError`] if the store cannot be read.
pub async fn has_credential(state: &AppState) -> Result<bool, SettingsError> {
    Ok(cached_credential(state).await?.is_some())
}

async fn require_credential(state: &AppState) -> Result<String, AnalysisError> {
    cached_credential(state)
        .await?
        .ok_or(AnalysisError::CredentialMissing)
}

/// Store a new credential and refresh the cache.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidApiKey`] for a blank key, or
/// [`AnalysisError::Settings`] if the store cannot be written.
pub async fn save_api_key(state: &AppState, raw: &str) -> Result<(), AnalysisError> {
    let key = raw.trim();
    if key.is_empty() {
        return Err(AnalysisError::InvalidApiKey);
    }
    state.settings.set(API_KEY, key).await?;
    state.session.lock().await.api_key = Some(key.to_string());
    info!(key_len = key.len(), "analysis: credential saved");
    Ok(())
}

// =============================================================================
// ENTRY POINTS
// =============================================================================

/// `startAnalysis{tabId}`: run one full attempt against a tab.
///
/// The outcome is also published as an event; callers may ignore the
/// return value.
///
/// # Errors
///
/// Returns the [`AnalysisError`] that ended the attempt.
pub async fn start_analysis(state: &AppState, tab_id: TabId) -> Result<Arc<AnalysisResult>, AnalysisError> {
    let generation = {
        let mut session = state.session.lock().await;
        session.generation += 1;
        session.generation
    };
    info!(%tab_id, generation, "analysis: start requested");

    if let Err(err) = require_credential(state).await {
        return settle(state, generation, Err(err)).await;
    }

    {
        let mut session = state.session.lock().await;
        if session.generation != generation {
            debug!(generation, "analysis: superseded before start");
            return Err(AnalysisError::Superseded);
        }
        session.is_analyzing = true;
        session.current_tab_id = Some(tab_id);
        state.publish(Event::AnalysisStarted);
    }

    let outcome = match request_messages(state, tab_id).await {
        Ok(messages) => run_analyzer(state, &messages).await,
        Err(err) => Err(err),
    };
    settle(state, generation, outcome).await
}

/// `messagesExtracted{messages}`: a page pushed messages unprompted.
///
/// Analyzed under the current generation while an attempt is running;
/// ignored otherwise (`None`). If the running pull settles first, the
/// pushed outcome is dropped as [`AnalysisError::Superseded`].
pub async fn messages_extracted(
    state: &AppState,
    messages: &[ChatMessage],
) -> Option<Result<Arc<AnalysisResult>, AnalysisError>> {
    let generation = {
        let session = state.session.lock().await;
        if !session.is_analyzing {
            debug!(count = messages.len(), "analysis: pushed messages ignored, idle");
            return None;
        }
        session.generation
    };
    info!(generation, count = messages.len(), "analysis: pushed messages received");
    let outcome = if messages.is_empty() {
        Err(AnalysisError::NoMessagesFound)
    } else {
        run_analyzer(state, messages).await
    };
    Some(settle(state, generation, outcome).await)
}

/// `getAnalysisStatus`: pure read.
pub async fn analysis_status(state: &AppState) -> StatusReply {
    let session = state.session.lock().await;
    StatusReply { is_analyzing: session.is_analyzing, last_result: session.last_result.clone(), success: true }
}

/// `extractMessages{tabId}`: ask a tab for its messages, bounded by the
/// extraction timeout.
///
/// # Errors
///
/// Returns [`AnalysisError::ExtractionFailed`] when the tab has no page
/// context, the channel fails, or the reply does not arrive in time.
pub async fn extract_messages(state: &AppState, tab_id: TabId) -> Result<ExtractReply, AnalysisError> {
    match tokio::time::timeout(state.options.extract_timeout, state.pages.extract_messages(tab_id)).await {
        Ok(Ok(reply)) => Ok(reply),
        Ok(Err(err)) => {
            warn!(%tab_id, %err, "analysis: extraction failed");
            Err(AnalysisError::ExtractionFailed)
        }
        Err(elapsed) => {
            warn!(%tab_id, %elapsed, "analysis: extraction timed out");
            Err(AnalysisError::ExtractionFailed)
        }
    }
}

// =============================================================================
// STEPS
// =============================================================================

async fn request_messages(state: &AppState, tab_id: TabId) -> Result<Vec<ChatMessage>, AnalysisError> {
    let reply = extract_messages(state, tab_id).await?;
    if !reply.success || reply.messages.is_empty() {
        return Err(AnalysisError::NoMessagesFound);
    }
    Ok(reply.messages)
}

async fn run_analyzer(state: &AppState, messages: &[ChatMessage]) -> Result<AnalysisResult, AnalysisError> {
    let api_key = require_credential(state).await?;
    let request = prompt::build_request(messages, &state.options);
    info!(count = messages.len(), "analysis: calling analyzer");
    let response = state.llm.chat(&api_key, &request).await?;
    info!(
        model = %response.model,
        output_tokens = response.output_tokens,
        content_len = response.content.len(),
        "analysis: analyzer replied"
    );
    let percentage = parse_percentage(&response.content)?;
    Ok(AnalysisResult { percentage, explanation: response.content, timestamp: now_ms() })
}

/// Record the outcome of attempt `generation`, if it is still current and
/// nothing has settled it yet. A pushed batch and the pull it raced share a
/// generation; whichever settles first wins.
async fn settle(
    state: &AppState,
    generation: u64,
    outcome: Result<AnalysisResult, AnalysisError>,
) -> Result<Arc<AnalysisResult>, AnalysisError> {
    let mut session = state.session.lock().await;
    if session.generation != generation || session.settled == Some(generation) {
        match &outcome {
            Ok(result) => debug!(generation, percentage = result.percentage, "analysis: stale result dropped"),
            Err(err) => debug!(generation, %err, "analysis: stale error dropped"),
        }
        return Err(AnalysisError::Superseded);
    }

    session.settled = Some(generation);
    session.is_analyzing = false;
    match outcome {
        Ok(result) => {
            let result = Arc::new(result);
            session.last_result = Some(Arc::clone(&result));
            info!(generation, percentage = result.percentage, "analysis: complete");
            state.publish(Event::AnalysisComplete { result: Arc::clone(&result) });
            Ok(result)
        }
        Err(err) => {
            session.last_result = None;
            warn!(generation, code = err.error_code(), %err, "analysis: failed");
            state.publish(Event::error_from(&err));
            Err(err)
        }
    }
}

#[cfg(test)]
#[path = "analysis_test.rs"]
mod tests;
