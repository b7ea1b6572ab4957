//! Short request classifiers recorded alongside each interaction.

use attest0::message::Message;

/// Intent recorded when nothing better can be derived.
pub const DEFAULT_INTENT: &str = "agent_interaction";

/// Longest intent the ledger accepts, in characters.
pub const MAX_INTENT_LEN: usize = 50;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "be", "can", "could", "do", "for", "from", "i", "in", "is", "it",
    "me", "my", "of", "on", "or", "please", "the", "this", "to", "with", "would", "you", "your",
];

/// Derive an intent from the message's first text part.
///
/// Keywords are lowercased, stripped of stopwords, and joined with `_`
/// until the next one would overflow [`MAX_INTENT_LEN`]. Text with no
/// keywords falls back to its own trimmed prefix; no text at all gives
/// [`DEFAULT_INTENT`].
pub fn derive_intent(message: &Message) -> String {
    let Some(text) = message.first_text() else {
        return DEFAULT_INTENT.to_owned();
    };

    let mut intent = String::new();
    let keywords = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .filter(|word| !STOPWORDS.contains(&word.as_str()));
    for word in keywords {
        let extra = if intent.is_empty() { 0 } else { 1 };
        if intent.chars().count() + extra + word.chars().count() > MAX_INTENT_LEN {
            break;
        }
        if extra == 1 {
            intent.push('_');
        }
        intent.push_str(&word);
    }
    if !intent.is_empty() {
        return intent;
    }

    let fallback = clamp_intent(text.trim());
    if fallback.is_empty() {
        DEFAULT_INTENT.to_owned()
    } else {
        fallback
    }
}

/// Truncate a caller-supplied intent to [`MAX_INTENT_LEN`] characters.
pub fn clamp_intent(intent: &str) -> String {
    intent.chars().take(MAX_INTENT_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use attest0::message::{Part, Role};

    #[test]
    fn keywords_without_stopwords() {
        let msg = Message::user_text("m1", "Please summarize the quarterly report for me");
        assert_eq!(derive_intent(&msg), "summarize_quarterly_report");
    }

    #[test]
    fn single_word() {
        assert_eq!(derive_intent(&Message::user_text("m1", "ping")), "ping");
    }

    #[test]
    fn long_text_is_bounded() {
        let text = "translate ".repeat(20);
        let intent = derive_intent(&Message::user_text("m1", text));
        assert!(intent.chars().count() <= MAX_INTENT_LEN);
        assert!(intent.starts_with("translate_translate"));
        assert!(!intent.ends_with('_'));
    }

    #[test]
    fn only_stopwords_falls_back_to_text() {
        assert_eq!(derive_intent(&Message::user_text("m1", "  to be  ")), "to be");
    }

    #[test]
    fn no_text_gives_default() {
        let msg = Message {
            message_id: "m1".into(),
            role: Role::User,
            parts: vec![Part::Data {
                data: serde_json::json!({"x": 1}),
            }],
            context_id: None,
            task_id: None,
            metadata: None,
            extensions: None,
        };
        assert_eq!(derive_intent(&msg), DEFAULT_INTENT);
        assert_eq!(derive_intent(&Message::user_text("m1", "   ")), DEFAULT_INTENT);
    }

    #[test]
    fn clamp_counts_chars_not_bytes() {
        let s = "é".repeat(60);
        assert_eq!(clamp_intent(&s).chars().count(), MAX_INTENT_LEN);
    }
}
