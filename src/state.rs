//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor and
//! handed to the coordinator functions by reference. It owns the single
//! [`SessionState`] behind a mutex, the collaborators the coordinator talks
//! to (settings store, page channel, analyzer), and the event fan-out.
//!
//! The session mutex guards only in-memory fields and is never held across
//! an await on I/O.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, broadcast};

use crate::config::AnalysisOptions;
use crate::frame::{Event, TabId};
use crate::llm::LlmChat;
use crate::services::pages::{PageChannel, SnapshotPages};
use crate::services::settings::SettingsStore;

/// Events buffered per subscriber before lagging ones start dropping.
const EVENT_CAPACITY: usize = 64;

// =============================================================================
// RESULT
// =============================================================================

/// Outcome of one successful analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Always within `0..=100`.
    pub percentage: u8,
    /// Raw analyzer reply, unedited.
    pub explanation: String,
    /// Milliseconds since Unix epoch.
    pub timestamp: i64,
}

// =============================================================================
// SESSION
// =============================================================================

/// The coordinator's process-lifetime state.
#[derive(Debug, Default)]
pub struct SessionState {
    /// True only between "extraction requested" and "result or error".
    pub is_analyzing: bool,
    /// Shared so repeated status reads hand out the same allocation.
    pub last_result: Option<Arc<AnalysisResult>>,
    /// Cached credential; filled on first successful settings read.
    pub api_key: Option<String>,
    pub current_tab_id: Option<TabId>,
    /// Bumped by every `startAnalysis`; only the newest attempt may settle.
    pub generation: u64,
    /// The last generation that recorded an outcome; each settles once.
    pub settled: Option<u64>,
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<SessionState>>,
    pub settings: Arc<dyn SettingsStore>,
    /// How the coordinator asks a tab for its messages.
    pub pages: Arc<dyn PageChannel>,
    /// Uploaded tab snapshots. Usually also `pages`, but routes need the
    /// concrete type to publish into.
    pub snapshots: Arc<SnapshotPages>,
    pub llm: Arc<dyn LlmChat>,
    pub events: broadcast::Sender<Event>,
    pub options: AnalysisOptions,
}

impl AppState {
    /// State whose page channel is the snapshot registry itself.
    #[must_use]
    pub fn new(settings: Arc<dyn SettingsStore>, llm: Arc<dyn LlmChat>, options: AnalysisOptions) -> Self {
        let snapshots = Arc::new(SnapshotPages::new());
        let pages: Arc<dyn PageChannel> = snapshots.clone();
        Self::with_pages(settings, pages, snapshots, llm, options)
    }

    #[must_use]
    pub fn with_pages(
        settings: Arc<dyn SettingsStore>,
        pages: Arc<dyn PageChannel>,
        snapshots: Arc<SnapshotPages>,
        llm: Arc<dyn LlmChat>,
        options: AnalysisOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { session: Arc::new(Mutex::new(SessionState::default())), settings, pages, snapshots, llm, events, options }
    }

    /// Publish an event to every subscriber. Having none is normal.
    pub fn publish(&self, event: Event) {
        if self.events.send(event).is_err() {
            tracing::debug!("state: event dropped, no subscribers");
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
