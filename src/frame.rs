//! Frame — inter-context message types.
//!
//! ARCHITECTURE
//! ============
//! The popup, the coordinator and the page script exchange small JSON
//! objects tagged by an `action` field. Inbound requests may carry an `id`;
//! every direct reply echoes it back as `parentId` so a client can match
//! replies to requests. Coordinator events are broadcast to every popup and
//! carry no parent.
//!
//! DESIGN
//! ======
//! - Field names are camelCase on the wire (`tabId`, `isAnalyzing`).
//! - Outbound frames are tagged by `kind` so a client can tell replies,
//!   events and renders apart before looking at the payload.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::presenter::ViewModel;
use crate::scraper::ChatMessage;
use crate::state::AnalysisResult;

/// Browser tab identifier.
pub type TabId = u64;

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for structured error frames.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// INBOUND
// =============================================================================

/// A request from the popup or page context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    StartAnalysis {
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },
    GetAnalysisStatus,
    MessagesExtracted {
        messages: Vec<ChatMessage>,
    },
    /// Run the scraper on a tab and return the messages without analyzing.
    ExtractMessages {
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },
    SaveApiKey {
        #[serde(rename = "apiKey")]
        api_key: String,
    },
}

impl Request {
    /// Wire name of the action, for logs.
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Request::StartAnalysis { .. } => "startAnalysis",
            Request::GetAnalysisStatus => "getAnalysisStatus",
            Request::MessagesExtracted { .. } => "messagesExtracted",
            Request::ExtractMessages { .. } => "extractMessages",
            Request::SaveApiKey { .. } => "saveApiKey",
        }
    }
}

/// A request plus its optional correlation id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Inbound {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(flatten)]
    pub request: Request,
}

// =============================================================================
// EVENTS
// =============================================================================

/// Coordinator broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Event {
    AnalysisStarted,
    AnalysisComplete { result: Arc<AnalysisResult> },
    AnalysisError { error: String, code: String },
}

impl Event {
    /// Error event from a typed error.
    pub fn error_from(err: &(impl ErrorCode + ?Sized)) -> Self {
        Event::AnalysisError { error: err.to_string(), code: err.error_code().to_string() }
    }
}

// =============================================================================
// REPLIES
// =============================================================================

/// Reply to `getAnalysisStatus`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReply {
    pub is_analyzing: bool,
    pub last_result: Option<Arc<AnalysisResult>>,
    pub success: bool,
}

/// Reply to `extractMessages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractReply {
    pub success: bool,
    pub messages: Vec<ChatMessage>,
}

impl ExtractReply {
    /// `success` is true exactly when at least one message was found.
    #[must_use]
    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self { success: !messages.is_empty(), messages }
    }
}

/// Reply to `saveApiKey`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveKeyReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// Payload of one outbound socket frame.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Outbound {
    Event(Event),
    Status(StatusReply),
    Extract(ExtractReply),
    ApiKey(SaveKeyReply),
    Render { view: ViewModel },
    Error { error: String, code: String },
}

/// An outbound frame: payload, timestamp, and the request it answers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    pub ts: i64,
    #[serde(flatten)]
    pub body: Outbound,
}

impl Frame {
    /// Unsolicited frame (events, renders).
    #[must_use]
    pub fn push(body: Outbound) -> Self {
        Self { parent_id: None, ts: now_ms(), body }
    }

    /// Reply to the request with correlation id `parent_id`.
    #[must_use]
    pub fn reply(parent_id: Option<Uuid>, body: Outbound) -> Self {
        Self { parent_id, ts: now_ms(), body }
    }

    /// Structured error reply from a typed error.
    #[must_use]
    pub fn error_from(parent_id: Option<Uuid>, err: &(impl ErrorCode + ?Sized)) -> Self {
        Self::reply(parent_id, Outbound::Error { error: err.to_string(), code: err.error_code().to_string() })
    }
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
