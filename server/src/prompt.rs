use blueprint_shared::chat::ChatRequest;
use serde::Serialize;

pub const SYSTEM_PROMPT: &str = "You help homeowners and contractors plan flooring. \
You are given the user's current floor-area estimate as plain text. \
Answer in a few short sentences using square feet. \
When suggesting material quantities add a waste allowance and say how much. \
Do not invent rooms or measurements that are not in the estimate.";

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

/// System prompt, the estimate as context, then the user's question.
pub fn build_messages(request: &ChatRequest, question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: "system",
            content: SYSTEM_PROMPT.to_string(),
        },
        ChatMessage {
            role: "system",
            content: format!("Current estimate:\n{}", strip_control(&request.estimate_context())),
        },
        ChatMessage {
            role: "user",
            content: strip_control(question),
        },
    ]
}

fn strip_control(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_shared::Snapshot;

    #[test]
    fn estimate_rides_between_system_and_user() {
        let request = ChatRequest::new("How many boxes?", Snapshot::default());
        let messages = build_messages(&request, "How many boxes?");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert!(messages[1].content.contains("No areas measured yet."));
        assert_eq!(messages[2].role, "user");
    }

    #[test]
    fn control_characters_are_dropped() {
        assert_eq!(strip_control("a\u{0}b\nc\u{7}"), "ab\nc");
    }
}
