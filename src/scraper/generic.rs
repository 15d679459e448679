//! Heuristic extractor for pages no platform entry claims.
//!
//! The candidate selector with the most matches is taken to be the message
//! container. Each container is classified outgoing or not from its class
//! names, computed alignment, or receipt markers in its markup, and its text
//! is stripped of clock times and receipt words before filtering.

use std::sync::OnceLock;

use regex::Regex;

use crate::dom::{Document, ElementRef};

use super::platforms::query_all;
use super::{ChatMessage, ME, OTHER};

/// Tried in order; the first selector with the strictly highest count wins.
pub const CANDIDATE_SELECTORS: &[&str] = &[
    ".message",
    "[class*=\"message\"]",
    "[class*=\"msg\"]",
    ".chat-message",
    "li.chat",
    "[role=\"listitem\"]",
    "[role=\"row\"]",
    ".bubble",
    ".chat-bubble",
    "[class*=\"bubble\"]",
    ".content",
    ".text-content",
    "[class*=\"content-\"]",
];

/// Class-name fragments that mark an outgoing bubble. Substring match, so
/// `out` also hits classes like `layout`.
const OUTGOING_CLASS_MARKERS: &[&str] = &["sent", "outgoing", "out", "message-out", "self", "right"];

/// Longest message text kept, in characters.
pub const MAX_MESSAGE_CHARS: usize = 1000;

/// Texts this short are dropped when they are only symbols or emoji.
const SYMBOLIC_MAX_CHARS: usize = 4;

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(err) => {
            tracing::error!(%pattern, %err, "scraper: pattern failed to compile");
            None
        }
    })
    .as_ref()
}

fn clock_pattern() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&CELL, r"[0-9]{1,2}:[0-9]{2}(\s?[AP]M)?")
}

fn receipt_word_pattern() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&CELL, r"(?i)seen|read|delivered|sent")
}

fn read_marker_pattern() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&CELL, r"(?i)read|seen|delivered|tick|check")
}

// =============================================================================
// EXTRACTION
// =============================================================================

/// Generic extraction over the whole document.
#[must_use]
pub fn extract(doc: &Document) -> Vec<ChatMessage> {
    let Some((css, elements)) = best_candidate(doc) else {
        return Vec::new();
    };
    tracing::debug!(selector = css, matches = elements.len(), "scraper: generic candidate chosen");
    elements
        .into_iter()
        .filter_map(|el| {
            let text = clean_message_text(&el.text_content())?;
            let sender = if has_outgoing_indicators(el) { ME } else { OTHER };
            Some(ChatMessage::new(sender, text, ""))
        })
        .collect()
}

/// The candidate selector with the most matches, and its matches.
///
/// Ties keep the earlier selector; `None` when every candidate matches
/// nothing.
#[must_use]
pub fn best_candidate(doc: &Document) -> Option<(&'static str, Vec<ElementRef<'_>>)> {
    let mut best: Option<(&'static str, Vec<ElementRef<'_>>)> = None;
    for &css in CANDIDATE_SELECTORS {
        let elements = query_all(doc, css);
        let best_len = best.as_ref().map_or(0, |(_, found)| found.len());
        if elements.len() > best_len {
            best = Some((css, elements));
        }
    }
    best
}

/// Whether `el` looks like a message sent by the local user.
#[must_use]
pub fn has_outgoing_indicators(el: ElementRef<'_>) -> bool {
    let by_class = el
        .classes()
        .iter()
        .any(|class| OUTGOING_CLASS_MARKERS.iter().any(|marker| class.contains(marker)));
    if by_class {
        return true;
    }

    let style = el.style();
    if style.text_align_is("right")
        || style.align_self_is("flex-end")
        || style.margin_left_is("auto")
        || style.justify_content_is("flex-end")
    {
        return true;
    }

    read_marker_pattern().is_some_and(|re| re.is_match(&el.inner_markup()))
}

/// Strip clock times and receipt words, trim, and apply the discard rules.
/// `None` means the text is not worth keeping.
#[must_use]
pub fn clean_message_text(raw: &str) -> Option<String> {
    let mut text = raw.to_string();
    if let Some(re) = clock_pattern() {
        text = re.replace_all(&text, "").into_owned();
    }
    if let Some(re) = receipt_word_pattern() {
        text = re.replace_all(&text, "").into_owned();
    }
    let text = text.trim();

    let chars = text.chars().count();
    if chars == 0 || chars > MAX_MESSAGE_CHARS {
        return None;
    }
    if chars <= SYMBOLIC_MAX_CHARS && is_pure_symbolic(text) {
        return None;
    }
    Some(text.to_string())
}

/// Every non-whitespace character is a symbol or emoji, and there is at
/// least one.
#[must_use]
pub fn is_pure_symbolic(text: &str) -> bool {
    let mut seen = false;
    for c in text.chars().filter(|c| !c.is_whitespace()) {
        if !is_symbolic_char(c) {
            return false;
        }
        seen = true;
    }
    seen
}

fn is_symbolic_char(c: char) -> bool {
    matches!(c, '\u{00A9}' | '\u{00AE}' | '\u{2000}'..='\u{3300}' | '\u{FE00}'..='\u{FE0F}' | '\u{1F000}'..='\u{1FFFF}')
}

#[cfg(test)]
#[path = "generic_test.rs"]
mod tests;
