//! Analyzer prompt construction.
//!
//! The system instruction and the scoring rubric demand a reply that starts
//! with a percentage followed by `" - "`. The parser in `analysis` is more
//! lenient than that (it takes the first `NN%` anywhere), so a reply that
//! ignores the format can still score.

use crate::config::AnalysisOptions;
use crate::llm::{ChatRequest, Message};
use crate::scraper::ChatMessage;

pub const SYSTEM_INSTRUCTION: &str = "You are a ruthlessly honest relationship analyzer who uses a 0-100% scale to measure romantic connection. IMPORTANT RULES: (1) If there's NO flirting or romantic interest, the score MUST be 0% - not 10%, not 40%, ZERO. (2) Be extremely strict with your scoring. (3) For scores below 50%, include ONE BRIEF improvement tip (1-2 lines max). (4) Only high chemistry with clear romantic interest gets scores above 70%. (5) YOU MUST START YOUR RESPONSE WITH A PERCENTAGE (e.g. \"80%\", \"25%\", \"0%\") followed by \" - \" and then your assessment. (6) BE EXTREMELY CONCISE but make sure your entire message is visible. Use Tyler Durden's direct style from Fight Club - brutal honesty with no sugar-coating.";

const RUBRIC: &str = "SCORING RULES:
- If there's NO flirting or romantic interest at all: SCORE MUST BE 0%
- Be EXTREMELY strict with scoring: casual chitchat = 0%, mild flirting = 20-30%, strong flirting = 50-70%, obvious mutual attraction = 70%+
- For scores below 50%, include ONE very short tip (1-2 lines max)
- YOU MUST START YOUR RESPONSE WITH THE PERCENTAGE (e.g., \"75%\") followed by \" - \" (dash)
- Make sure all your text is visible - avoid cutting off sentences
- Be brutally honest and direct like Tyler Durden from Fight Club

FORMAT EXACTLY LIKE THIS:
[0-100]% - [Your brutal assessment] + [Short tip if score < 50%]

Examples of properly formatted responses:
- \"0% - Just basic information exchange. No flirting at all. Tip: Ask personal questions.\"
- \"25% - Weak flirting attempts, mostly one-sided. Tip: Be more direct.\"
- \"75% - Clear sexual tension. Messages dripping with mutual interest.\"
- \"90% - You're both one message away from setting up a date.\"";

/// The first two distinct senders, in order of first appearance.
#[must_use]
pub fn participants(messages: &[ChatMessage]) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::with_capacity(2);
    for msg in messages {
        if seen.len() == 2 {
            break;
        }
        if !seen.contains(&msg.sender.as_str()) {
            seen.push(&msg.sender);
        }
    }
    seen
}

/// `sender: text` per message, newline-terminated, in order.
#[must_use]
pub fn transcript(messages: &[ChatMessage]) -> String {
    let mut out = String::new();
    for msg in messages {
        out.push_str(&msg.sender);
        out.push_str(": ");
        out.push_str(&msg.text);
        out.push('\n');
    }
    out
}

/// The user prompt embedding participants and transcript.
#[must_use]
pub fn user_prompt(messages: &[ChatMessage]) -> String {
    format!(
        "\nAnalyze this chat for romantic connection between {}:\n\n{RUBRIC}\n\nConversation:\n{}\n\nYour brutally honest assessment (START WITH PERCENTAGE):",
        participants(messages).join(" and "),
        transcript(messages),
    )
}

/// The full analyzer request for `messages`.
#[must_use]
pub fn build_request(messages: &[ChatMessage], options: &AnalysisOptions) -> ChatRequest {
    ChatRequest {
        messages: vec![Message::system(SYSTEM_INSTRUCTION), Message::user(user_prompt(messages))],
        temperature: options.temperature,
        max_tokens: options.max_tokens,
    }
}

#[cfg(test)]
#[path = "prompt_test.rs"]
mod tests;
