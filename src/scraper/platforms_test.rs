use super::*;
use crate::dom::{ComputedStyle, Element, element};

fn doc(url: &str, body: Element) -> Document {
    Document::from_snapshot(&element("html").child(body).into_snapshot(url)).unwrap()
}

fn style(f: impl FnOnce(&mut ComputedStyle)) -> ComputedStyle {
    let mut style = ComputedStyle::default();
    f(&mut style);
    style
}

#[test]
fn bracketed_takes_first_group() {
    assert_eq!(bracketed("[10:42, 3/4/2024] Ana: "), Some("10:42, 3/4/2024"));
    assert_eq!(bracketed("no brackets"), None);
    assert_eq!(bracketed("[open"), None);
}

#[test]
fn whatsapp_reads_direction_text_and_timestamp() {
    let page = doc(
        "https://web.whatsapp.com/",
        element("div")
            .child(
                element("div").class("message-in").child(
                    element("div")
                        .class("copyable-text")
                        .attr("data-pre-plain-text", "[9:01 PM, 1/2/2025] Sam: ")
                        .child(element("span").class("selectable-text").text("  hey you  ")),
                ),
            )
            .child(element("div").class("message-out").child(element("span").class("selectable-text").text("hi!")))
            .child(element("div").class("message-in").child(element("span").text("no selectable text")))
            .child(element("div").class("message-in").child(element("span").class("selectable-text").text("   "))),
    );
    assert_eq!(
        whatsapp(&page),
        vec![ChatMessage::new("Other", "hey you", "9:01 PM, 1/2/2025"), ChatMessage::new("Me", "hi!", ""),]
    );
}

#[test]
fn messenger_uses_flag_or_right_alignment_inside_table() {
    let row = |text: &str| element("div").attr("role", "row").child(element("div").attr("data-content-type", "message").text(text));
    let page = doc(
        "https://www.messenger.com/t/123",
        element("div")
            .attr("data-scope", "messages_table")
            .child(row("flagged").attr("data-is-outgoing", "true"))
            .child(row("aligned").style(style(|s| s.text_align = Some("right".into()))))
            .child(
                row("plain").child(element("span").attr("role", "tooltip").text("Mon 10:00")),
            ),
    );
    let outside = doc(
        "https://www.messenger.com/t/123",
        element("div").child(row("outside").style(style(|s| s.text_align = Some("right".into())))),
    );
    assert_eq!(
        messenger(&page),
        vec![
            ChatMessage::new("Me", "flagged", ""),
            ChatMessage::new("Me", "aligned", ""),
            ChatMessage::new("Other", "plain", "Mon 10:00"),
        ]
    );
    assert_eq!(messenger(&outside), vec![ChatMessage::new("Other", "outside", "")]);
}

#[test]
fn telegram_reads_message_out_class() {
    let page = doc(
        "https://web.telegram.org/k/",
        element("div")
            .child(
                element("div")
                    .class("message")
                    .class("message-out")
                    .child(element("div").class("text-content").text("sent this"))
                    .child(element("span").class("time").text(" 12:01 ")),
            )
            .child(element("div").class("message").child(element("div").class("text-content").text("got it"))),
    );
    assert_eq!(
        telegram(&page),
        vec![ChatMessage::new("Me", "sent this", "12:01"), ChatMessage::new("Other", "got it", "")]
    );
}

#[test]
fn discord_carries_display_name_forward() {
    let message = |name: Option<&str>, text: &str| {
        let mut el = element("li").class("message-abc12");
        if let Some(name) = name {
            el = el.child(element("span").class("username-x1").text(name));
        }
        el.child(element("div").class("content-q9").text(text))
    };
    let page = doc(
        "https://discord.com/channels/1/2",
        element("ol")
            .child(message(None, "orphan"))
            .child(message(Some("Riley"), "first"))
            .child(message(None, "second"))
            .child(message(Some("Kai"), "mine").attr("data-is-author-self", "true"))
            .child(message(None, "still mine")),
    );
    assert_eq!(
        discord(&page),
        vec![
            ChatMessage::new("Riley", "first", ""),
            ChatMessage::new("Riley", "second", ""),
            ChatMessage::new("Me", "mine", ""),
            ChatMessage::new("Kai", "still mine", ""),
        ]
    );
}

#[test]
fn slack_requires_sender_element() {
    let page = doc(
        "https://app.slack.com/client/T1/C1",
        element("div")
            .child(
                element("div")
                    .class("c-message")
                    .child(element("span").class("c-message__sender").text("Jo"))
                    .child(element("div").class("c-message__body").text("lunch?"))
                    .child(element("a").class("c-timestamp").text("11:58")),
            )
            .child(
                element("div")
                    .class("c-message")
                    .class("c-message--me")
                    .child(element("span").class("c-message__sender").text("Me Myself"))
                    .child(element("div").class("c-message__body").text("sure")),
            )
            .child(element("div").class("c-message").child(element("div").class("c-message__body").text("anon"))),
    );
    assert_eq!(
        slack(&page),
        vec![ChatMessage::new("Jo", "lunch?", "11:58"), ChatMessage::new("Me", "sure", "")]
    );
}

#[test]
fn instagram_checks_parent_justification() {
    let item = |text: &str| element("div").attr("role", "listitem").child(element("div").attr("dir", "auto").text(text));
    let page = doc(
        "https://www.instagram.com/direct/t/1",
        element("div")
            .child(element("div").style(style(|s| s.justify_content = Some("flex-end".into()))).child(item("mine")))
            .child(element("div").child(item("theirs"))),
    );
    assert_eq!(
        instagram(&page),
        vec![ChatMessage::new("Me", "mine", ""), ChatMessage::new("Other", "theirs", "")]
    );
}

#[test]
fn twitter_uses_class_or_alignment() {
    let entry = |text: &str| {
        element("div")
            .attr("data-testid", "messageEntry")
            .child(element("div").attr("data-testid", "messageEntry-content").text(text))
    };
    let page = doc(
        "https://x.com/messages/1-2",
        element("div")
            .child(entry("a").class("outgoing"))
            .child(entry("b").style(style(|s| s.align_self = Some("flex-end".into()))))
            .child(entry("c").child(element("time").text("3:15 PM"))),
    );
    assert_eq!(
        twitter(&page),
        vec![ChatMessage::new("Me", "a", ""), ChatMessage::new("Me", "b", ""), ChatMessage::new("Other", "c", "3:15 PM")]
    );
}

#[test]
fn tinder_uses_whole_element_text() {
    let page = doc(
        "https://tinder.com/app/messages/1",
        element("div")
            .child(element("div").class("msg").class("sent").text("hello there"))
            .child(element("div").class("msg").text("hi").child(element("span").class("date").text("Today")))
            .child(element("div").class("msg").text("  ")),
    );
    assert_eq!(
        tinder(&page),
        vec![ChatMessage::new("Me", "hello there", ""), ChatMessage::new("Other", "hiToday", "Today")]
    );
}
