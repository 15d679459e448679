use super::*;
use crate::dom::element;

fn chat_page(url: &str) -> Document {
    let snapshot = element("html")
        .child(
            element("div")
                .child(element("div").class("message").class("message-out").child(element("div").class("text-content").text("hello")))
                .child(element("div").class("message").child(element("div").class("text-content").text("hey"))),
        )
        .into_snapshot(url);
    Document::from_snapshot(&snapshot).unwrap()
}

#[test]
fn detect_follows_priority_order() {
    let registry = ExtractorRegistry::with_builtin();
    assert_eq!(registry.platform_name("https://web.whatsapp.com/"), "whatsapp");
    assert_eq!(registry.platform_name("https://www.facebook.com/messages/t/1"), "messenger");
    assert_eq!(registry.platform_name("https://web.telegram.org/a/"), "telegram");
    assert_eq!(registry.platform_name("https://discord.com/channels/@me"), "discord");
    assert_eq!(registry.platform_name("https://app.slack.com/client"), "slack");
    assert_eq!(registry.platform_name("https://www.instagram.com/direct/inbox/"), "instagram");
    assert_eq!(registry.platform_name("https://twitter.com/messages"), "twitter");
    assert_eq!(registry.platform_name("https://tinder.com/app/matches"), "tinder");
    assert_eq!(registry.platform_name("https://example.org/chat"), GENERIC);
}

#[test]
fn detect_uses_plain_substrings() {
    let registry = ExtractorRegistry::with_builtin();
    // "t.me" and "x.com" are matched anywhere in the URL.
    assert_eq!(registry.platform_name("https://chat.meetup.example/"), "telegram");
    assert_eq!(registry.platform_name("https://box.company.test/"), "twitter");
    // Earlier entries win when several markers match.
    assert_eq!(registry.platform_name("https://web.whatsapp.com/?ref=t.me"), "whatsapp");
}

#[test]
fn builtin_registry_order_is_stable() {
    let names: Vec<&str> = ExtractorRegistry::with_builtin().entries().iter().map(|e| e.name).collect();
    assert_eq!(
        names,
        vec!["whatsapp", "messenger", "telegram", "discord", "slack", "instagram", "twitter", "tinder"]
    );
}

#[test]
fn extract_dispatches_to_platform() {
    let doc = chat_page("https://web.telegram.org/k/#@friend");
    assert_eq!(
        extract_messages(&doc),
        vec![ChatMessage::new(ME, "hello", ""), ChatMessage::new(OTHER, "hey", "")]
    );
}

#[test]
fn extract_falls_back_to_generic() {
    let doc = chat_page("https://chat.example.org/");
    let messages = extract_messages(&doc);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender, ME);
    assert_eq!(messages[1].sender, OTHER);
}

#[test]
fn extract_is_idempotent() {
    let doc = chat_page("https://chat.example.org/");
    assert_eq!(extract_messages(&doc), extract_messages(&doc));
}

#[test]
fn registered_platform_takes_effect_without_dispatch_changes() {
    fn custom(_: &Document) -> Vec<ChatMessage> {
        vec![ChatMessage::new(OTHER, "custom", "")]
    }
    let mut registry = ExtractorRegistry::new();
    registry.register(PlatformEntry { name: "custom", url_markers: &["chat.example.org"], extract: custom });
    let doc = chat_page("https://chat.example.org/");
    assert_eq!(registry.platform_name(doc.url()), "custom");
    assert_eq!(registry.extract(&doc), vec![ChatMessage::new(OTHER, "custom", "")]);
}

#[test]
fn chat_message_serializes_with_plain_fields() {
    let json = serde_json::to_value(ChatMessage::new("Me", "hi", "10:00")).unwrap();
    assert_eq!(json, serde_json::json!({ "sender": "Me", "text": "hi", "timestamp": "10:00" }));
    let parsed: ChatMessage = serde_json::from_value(serde_json::json!({ "sender": "A", "text": "b" })).unwrap();
    assert_eq!(parsed.timestamp, "");
}
