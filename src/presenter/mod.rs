//! Presenter — popup view state driven by coordinator events.
//!
//! DESIGN
//! ======
//! One presenter per connected popup. It owns the current [`ViewState`]
//! and the credential status line, and turns events and clicks into a
//! [`ViewModel`] the popup paints as-is. A model carries a [`ToneSequence`]
//! only on the transition that should play it.
//!
//! The four view states are mutually exclusive; setup doubles as the idle
//! screen before any analysis has run.

pub mod format;
pub mod tones;

use serde::Serialize;

use crate::frame::{Event, StatusReply};
use crate::state::AnalysisResult;

pub use format::{VibeBand, format_result_message};
pub use tones::{Note, ToneSequence};

pub const KEY_MISSING: &str = "Please set your API key first!";
pub const KEY_INVALID: &str = "Please enter a valid API key!";
pub const KEY_SAVED: &str = "API key saved! Ready to analyze vibes!";

// =============================================================================
// VIEW TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ViewState {
    Setup,
    Loading,
    Result {
        percentage: u8,
        message: String,
        band: VibeBand,
        color: &'static str,
    },
    Error {
        message: String,
    },
}

impl ViewState {
    fn result(result: &AnalysisResult) -> Self {
        let band = VibeBand::for_percentage(result.percentage);
        ViewState::Result {
            percentage: result.percentage,
            message: format_result_message(result.percentage, &result.explanation),
            band,
            color: band.css_var(),
        }
    }
}

/// The credential status line under the key input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyStatus {
    pub message: &'static str,
    pub color: &'static str,
}

impl KeyStatus {
    fn ok(message: &'static str) -> Self {
        Self { message, color: VibeBand::High.css_var() }
    }

    fn bad(message: &'static str) -> Self {
        Self { message, color: VibeBand::Low.css_var() }
    }
}

/// Everything the popup needs to paint one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    #[serde(flatten)]
    pub view: ViewState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_status: Option<KeyStatus>,
    /// Show the key input as dots.
    pub key_masked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<ToneSequence>,
}

// =============================================================================
// PRESENTER
// =============================================================================

#[derive(Debug, Clone)]
pub struct Presenter {
    view: ViewState,
    key_status: Option<KeyStatus>,
    has_key: bool,
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Presenter {
    #[must_use]
    pub fn new() -> Self {
        Self { view: ViewState::Setup, key_status: None, has_key: false }
    }

    #[must_use]
    pub fn view(&self) -> &ViewState {
        &self.view
    }

    #[must_use]
    pub fn has_key(&self) -> bool {
        self.has_key
    }

    /// Current model, without a tone.
    #[must_use]
    pub fn model(&self) -> ViewModel {
        self.render(None)
    }

    fn render(&self, tone: Option<ToneSequence>) -> ViewModel {
        ViewModel { view: self.view.clone(), key_status: self.key_status.clone(), key_masked: self.has_key, tone }
    }

    /// Popup opened: pick up the stored credential and whatever the
    /// coordinator is doing.
    pub fn restore(&mut self, has_key: bool, status: &StatusReply) -> ViewModel {
        self.has_key = has_key;
        if has_key {
            self.key_status = Some(KeyStatus::ok(KEY_SAVED));
        }
        if status.success {
            if status.is_analyzing {
                self.view = ViewState::Loading;
            } else if let Some(result) = &status.last_result {
                self.view = ViewState::result(result);
            }
        }
        self.model()
    }

    /// Coordinator event.
    pub fn apply(&mut self, event: &Event) -> ViewModel {
        match event {
            Event::AnalysisStarted => {
                // The click already played the loading cue.
                let tone = (self.view != ViewState::Loading).then(ToneSequence::loading);
                self.view = ViewState::Loading;
                self.render(tone)
            }
            Event::AnalysisComplete { result } => {
                self.view = ViewState::result(result);
                self.render(Some(ToneSequence::success(result.percentage)))
            }
            Event::AnalysisError { error, .. } => {
                self.view = ViewState::Error { message: error.clone() };
                self.render(Some(ToneSequence::error()))
            }
        }
    }

    /// Analyze button. Returns the model and whether to start an analysis.
    pub fn analyze_clicked(&mut self, has_key: bool) -> (ViewModel, bool) {
        self.has_key = has_key;
        if !has_key {
            self.view = ViewState::Setup;
            self.key_status = Some(KeyStatus::bad(KEY_MISSING));
            return (self.model(), false);
        }
        self.view = ViewState::Loading;
        (self.render(Some(ToneSequence::loading())), true)
    }

    /// The store accepted a new key.
    pub fn key_saved(&mut self) -> ViewModel {
        self.has_key = true;
        self.key_status = Some(KeyStatus::ok(KEY_SAVED));
        self.model()
    }

    /// The key was blank.
    pub fn key_rejected(&mut self) -> ViewModel {
        self.key_status = Some(KeyStatus::bad(KEY_INVALID));
        self.model()
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
