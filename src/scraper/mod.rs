//! Page scraper — chat messages out of a document snapshot.
//!
//! ARCHITECTURE
//! ============
//! Pages are classified by URL substring against an ordered
//! [`ExtractorRegistry`]; the first entry with a matching marker wins and its
//! extractor runs over the [`Document`]. Unrecognized pages fall through to
//! the heuristic extractor in [`generic`].
//!
//! Extractors are pure functions of the document. They never fail: elements
//! missing the pieces an extractor needs are skipped, and an empty result is
//! a normal outcome for the caller to report.

pub mod generic;
pub mod platforms;

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::dom::Document;

/// Sender label for messages written by the local user.
pub const ME: &str = "Me";
/// Sender label for the counterpart when the page shows no display name.
pub const OTHER: &str = "Other";

/// One scraped chat line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `"Me"`, `"Other"`, or a display name taken from the page.
    pub sender: String,
    /// Trimmed, never empty.
    pub text: String,
    /// Best-effort, frequently empty.
    #[serde(default)]
    pub timestamp: String,
}

impl ChatMessage {
    #[must_use]
    pub fn new(sender: impl Into<String>, text: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self { sender: sender.into(), text: text.into(), timestamp: timestamp.into() }
    }
}

/// A platform extractor.
pub type ExtractFn = fn(&Document) -> Vec<ChatMessage>;

/// One registered chat platform.
#[derive(Debug, Clone, Copy)]
pub struct PlatformEntry {
    pub name: &'static str,
    /// Any of these appearing in the page URL selects this platform.
    pub url_markers: &'static [&'static str],
    pub extract: ExtractFn,
}

impl PlatformEntry {
    fn claims(&self, url: &str) -> bool {
        self.url_markers.iter().any(|marker| url.contains(marker))
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Ordered platform table. Registration order is detection priority.
#[derive(Debug, Clone, Default)]
pub struct ExtractorRegistry {
    entries: Vec<PlatformEntry>,
}

/// Name reported for pages no entry claims.
pub const GENERIC: &str = "generic";

impl ExtractorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in platforms in their detection order.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for entry in platforms::BUILTIN {
            registry.register(*entry);
        }
        registry
    }

    /// Append an entry at the lowest priority.
    pub fn register(&mut self, entry: PlatformEntry) {
        self.entries.push(entry);
    }

    #[must_use]
    pub fn entries(&self) -> &[PlatformEntry] {
        &self.entries
    }

    /// First entry whose URL markers match.
    #[must_use]
    pub fn detect(&self, url: &str) -> Option<&PlatformEntry> {
        self.entries.iter().find(|entry| entry.claims(url))
    }

    /// Platform name for `url`, or [`GENERIC`].
    #[must_use]
    pub fn platform_name(&self, url: &str) -> &'static str {
        self.detect(url).map_or(GENERIC, |entry| entry.name)
    }

    /// Run the matching extractor, falling back to the generic heuristics.
    #[must_use]
    pub fn extract(&self, doc: &Document) -> Vec<ChatMessage> {
        let messages = match self.detect(doc.url()) {
            Some(entry) => (entry.extract)(doc),
            None => generic::extract(doc),
        };
        tracing::debug!(
            platform = self.platform_name(doc.url()),
            count = messages.len(),
            "scraper: extracted messages"
        );
        messages
    }
}

fn builtin() -> &'static ExtractorRegistry {
    static REGISTRY: OnceLock<ExtractorRegistry> = OnceLock::new();
    REGISTRY.get_or_init(ExtractorRegistry::with_builtin)
}

/// Extract messages with the built-in registry.
#[must_use]
pub fn extract_messages(doc: &Document) -> Vec<ChatMessage> {
    builtin().extract(doc)
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
