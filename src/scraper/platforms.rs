//! Per-site extractors for the built-in chat platforms.

use crate::dom::{Document, ElementRef, Selector};

use super::{ChatMessage, ME, OTHER, PlatformEntry};

/// Built-in platforms in detection priority order.
pub const BUILTIN: &[PlatformEntry] = &[
    PlatformEntry { name: "whatsapp", url_markers: &["web.whatsapp.com"], extract: whatsapp },
    PlatformEntry { name: "messenger", url_markers: &["messenger.com", "facebook.com/messages"], extract: messenger },
    PlatformEntry { name: "telegram", url_markers: &["telegram.org", "t.me"], extract: telegram },
    PlatformEntry { name: "discord", url_markers: &["discord.com"], extract: discord },
    PlatformEntry { name: "slack", url_markers: &["slack.com"], extract: slack },
    PlatformEntry { name: "instagram", url_markers: &["instagram.com"], extract: instagram },
    PlatformEntry { name: "twitter", url_markers: &["twitter.com", "x.com"], extract: twitter },
    PlatformEntry { name: "tinder", url_markers: &["tinder.com"], extract: tinder },
];

// =============================================================================
// QUERY HELPERS
// =============================================================================

fn parse(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(err) => {
            tracing::warn!(%css, %err, "scraper: bad selector");
            None
        }
    }
}

pub(crate) fn query_all<'a>(doc: &'a Document, css: &str) -> Vec<ElementRef<'a>> {
    parse(css).map(|selector| doc.select(&selector)).unwrap_or_default()
}

fn first<'a>(el: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    parse(css).and_then(|selector| el.select_first(&selector))
}

/// Trimmed text of the first descendant matching `css`, if any.
fn trimmed_text(el: ElementRef<'_>, css: &str) -> Option<String> {
    first(el, css).map(|found| found.text_content().trim().to_string())
}

/// Non-empty trimmed text of the first match; `None` skips the element.
fn message_text(el: ElementRef<'_>, css: &str) -> Option<String> {
    trimmed_text(el, css).filter(|text| !text.is_empty())
}

fn timestamp(el: ElementRef<'_>, css: &str) -> String {
    trimmed_text(el, css).unwrap_or_default()
}

fn me_or_other(outgoing: bool) -> &'static str {
    if outgoing { ME } else { OTHER }
}

/// Contents of the first `[...]` group, as WhatsApp's `data-pre-plain-text`
/// carries `"[10:42, 3/4/2024] Name: "`.
fn bracketed(value: &str) -> Option<&str> {
    let open = value.find('[')?;
    let rest = &value[open + 1..];
    let close = rest.find(']')?;
    Some(&rest[..close])
}

// =============================================================================
// EXTRACTORS
// =============================================================================

fn whatsapp(doc: &Document) -> Vec<ChatMessage> {
    query_all(doc, "div.message-in, div.message-out")
        .into_iter()
        .filter_map(|el| {
            let text = message_text(el, "span.selectable-text")?;
            let timestamp = first(el, "div.copyable-text")
                .and_then(|meta| meta.attr("data-pre-plain-text"))
                .and_then(bracketed)
                .unwrap_or_default();
            Some(ChatMessage::new(me_or_other(el.has_class("message-out")), text, timestamp))
        })
        .collect()
}

fn messenger(doc: &Document) -> Vec<ChatMessage> {
    let Some(table) = parse("[data-scope=\"messages_table\"]") else {
        return Vec::new();
    };
    query_all(doc, "div[role=\"row\"]")
        .into_iter()
        .filter_map(|el| {
            let text = message_text(el, "div[data-content-type=\"message\"]")?;
            let outgoing = el.attr("data-is-outgoing") == Some("true")
                || (el.closest(&table).is_some() && el.style().text_align_is("right"));
            let timestamp = first(el, "span[role=\"tooltip\"]")
                .map(|tip| tip.text_content())
                .unwrap_or_default();
            Some(ChatMessage::new(me_or_other(outgoing), text, timestamp))
        })
        .collect()
}

fn telegram(doc: &Document) -> Vec<ChatMessage> {
    query_all(doc, ".message")
        .into_iter()
        .filter_map(|el| {
            let text = message_text(el, ".text-content")?;
            Some(ChatMessage::new(me_or_other(el.has_class("message-out")), text, timestamp(el, ".time")))
        })
        .collect()
}

/// Consecutive messages from one author only show the name on the first,
/// so the last seen display name carries forward.
fn discord(doc: &Document) -> Vec<ChatMessage> {
    let mut last_sender: Option<String> = None;
    let mut messages = Vec::new();
    for el in query_all(doc, "[class*=\"message-\"]") {
        let sender = match trimmed_text(el, "[class*=\"username-\"]") {
            Some(name) => name,
            None => match &last_sender {
                Some(name) => name.clone(),
                None => continue,
            },
        };
        if sender.is_empty() {
            continue;
        }
        last_sender = Some(sender.clone());

        let outgoing =
            el.has_class("sending") || el.has_class("mentioned") || el.attr("data-is-author-self") == Some("true");
        let sender = if outgoing { ME.to_string() } else { sender };

        let Some(text) = message_text(el, "[class*=\"content-\"]") else {
            continue;
        };
        messages.push(ChatMessage::new(sender, text, timestamp(el, "[class*=\"timestamp-\"]")));
    }
    messages
}

fn slack(doc: &Document) -> Vec<ChatMessage> {
    query_all(doc, ".c-message")
        .into_iter()
        .filter_map(|el| {
            let name = trimmed_text(el, ".c-message__sender")?;
            let sender = if el.has_class("c-message--me") { ME.to_string() } else { name };
            let text = message_text(el, ".c-message__body")?;
            Some(ChatMessage::new(sender, text, timestamp(el, ".c-timestamp")))
        })
        .collect()
}

fn instagram(doc: &Document) -> Vec<ChatMessage> {
    query_all(doc, "div[role=\"listitem\"]")
        .into_iter()
        .filter_map(|el| {
            let text = message_text(el, "div[dir=\"auto\"]")?;
            let outgoing = el.parent()?.style().justify_content_is("flex-end");
            Some(ChatMessage::new(me_or_other(outgoing), text, ""))
        })
        .collect()
}

fn twitter(doc: &Document) -> Vec<ChatMessage> {
    query_all(doc, "[data-testid=\"messageEntry\"]")
        .into_iter()
        .filter_map(|el| {
            let text = message_text(el, "[data-testid=\"messageEntry-content\"]")?;
            let outgoing = el.has_class("outgoing") || el.style().align_self_is("flex-end");
            Some(ChatMessage::new(me_or_other(outgoing), text, timestamp(el, "time")))
        })
        .collect()
}

fn tinder(doc: &Document) -> Vec<ChatMessage> {
    query_all(doc, ".msg")
        .into_iter()
        .filter_map(|el| {
            let text = el.text_content().trim().to_string();
            if text.is_empty() {
                return None;
            }
            Some(ChatMessage::new(me_or_other(el.has_class("sent")), text, timestamp(el, ".date")))
        })
        .collect()
}

#[cfg(test)]
#[path = "platforms_test.rs"]
mod tests;
