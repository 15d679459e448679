//! Page channel — how the coordinator reaches a tab's page context.
//!
//! The in-page script uploads document snapshots; [`SnapshotPages`] keeps
//! the latest one per tab and answers `extractMessages` by running the
//! scraper over it. A tab with no snapshot has no page context, the same
//! condition as a browser tab without the content script injected.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::dom::{Document, PageSnapshot, SnapshotError};
use crate::frame::{ErrorCode, ExtractReply, TabId};
use crate::scraper::ExtractorRegistry;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PageError {
    #[error("no page context for tab {0}")]
    NoPageContext(TabId),

    #[error("page channel failed: {0}")]
    Channel(String),
}

impl ErrorCode for PageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NoPageContext(_) => "E_NO_PAGE_CONTEXT",
            Self::Channel(_) => "E_PAGE_CHANNEL",
        }
    }
}

impl ErrorCode for SnapshotError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Empty => "E_SNAPSHOT_EMPTY",
            Self::InvalidRoot => "E_SNAPSHOT_ROOT",
            Self::InvalidParent { .. } | Self::Detached { .. } => "E_SNAPSHOT_PARENT",
        }
    }
}

/// Asks a tab for its chat messages.
#[async_trait]
pub trait PageChannel: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`PageError`] if the tab cannot be reached.
    async fn extract_messages(&self, tab_id: TabId) -> Result<ExtractReply, PageError>;
}

// =============================================================================
// SNAPSHOT PAGES
// =============================================================================

/// Latest uploaded snapshot per tab.
pub struct SnapshotPages {
    registry: ExtractorRegistry,
    tabs: RwLock<HashMap<TabId, Arc<Document>>>,
}

impl Default for SnapshotPages {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotPages {
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(ExtractorRegistry::with_builtin())
    }

    #[must_use]
    pub fn with_registry(registry: ExtractorRegistry) -> Self {
        Self { registry, tabs: RwLock::new(HashMap::new()) }
    }

    /// Index and store a tab's snapshot, replacing any earlier one.
    /// Returns the detected platform name.
    ///
    /// # Errors
    ///
    /// Returns a [`SnapshotError`] for a malformed snapshot; the previous
    /// snapshot for the tab is kept.
    pub async fn publish(&self, tab_id: TabId, snapshot: &PageSnapshot) -> Result<&'static str, SnapshotError> {
        let doc = Document::from_snapshot(snapshot)?;
        let platform = self.registry.platform_name(doc.url());
        tracing::info!(%tab_id, platform, nodes = doc.len(), "pages: snapshot stored");
        self.tabs.write().await.insert(tab_id, Arc::new(doc));
        Ok(platform)
    }

    /// Drop a tab. Returns whether it was known.
    pub async fn forget(&self, tab_id: TabId) -> bool {
        let removed = self.tabs.write().await.remove(&tab_id).is_some();
        if removed {
            tracing::info!(%tab_id, "pages: tab forgotten");
        }
        removed
    }

    pub async fn contains(&self, tab_id: TabId) -> bool {
        self.tabs.read().await.contains_key(&tab_id)
    }
}

#[async_trait]
impl PageChannel for SnapshotPages {
    async fn extract_messages(&self, tab_id: TabId) -> Result<ExtractReply, PageError> {
        let doc = self
            .tabs
            .read()
            .await
            .get(&tab_id)
            .cloned()
            .ok_or(PageError::NoPageContext(tab_id))?;
        let messages = self.registry.extract(&doc);
        tracing::debug!(%tab_id, count = messages.len(), "pages: extracted");
        Ok(ExtractReply::from_messages(messages))
    }
}

#[cfg(test)]
#[path = "pages_test.rs"]
mod tests;
