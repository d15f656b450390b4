use crate::types::{FinalizeReason, Message, ToolResult, ERROR_FALLBACK_MESSAGE};

/// Conversation transcript plus the streaming state of the current turn.
///
/// At most one assistant message is "open" at a time; all streamed content and
/// tool results land there. Closing the turn freezes it.
#[derive(Default)]
pub struct Transcript {
    messages: Vec<Message>,
    open: Option<usize>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_streaming(&self) -> bool {
        self.open.is_some()
    }

    pub fn push_user_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Opens an empty assistant message for the incoming turn. No-op when a
    /// turn is already open.
    pub fn begin_assistant_turn(&mut self) {
        if self.open.is_none() {
            self.messages.push(Message::assistant());
            self.open = Some(self.messages.len() - 1);
        }
    }

    /// Appends streamed text to the open assistant message, opening one first
    /// when content arrives before an explicit turn start.
    pub fn apply_content(&mut self, delta: &str) {
        if delta.is_empty() {
            return;
        }
        self.begin_assistant_turn();
        let index = self.open.expect("begin_assistant_turn opened a message");
        self.messages[index].content.push_str(delta);
    }

    /// Attaches a tool result to the open assistant message. A message hosts
    /// at most one result, so a second result in the same turn opens a fresh
    /// assistant message and moves the open cursor there.
    pub fn apply_tool_result(&mut self, result: ToolResult) {
        self.begin_assistant_turn();
        let index = self.open.expect("begin_assistant_turn opened a message");
        if self.messages[index].tool_result.is_some() {
            self.messages.push(Message::assistant());
            let index = self.messages.len() - 1;
            self.open = Some(index);
            self.messages[index].tool_result = Some(result);
        } else {
            self.messages[index].tool_result = Some(result);
        }
    }

    /// Closes the current turn. An error turn that produced nothing gets the
    /// fallback text so the user never sees an empty assistant bubble.
    /// Returns the index of the message that was open, if any.
    pub fn finalize(&mut self, reason: FinalizeReason) -> Option<usize> {
        let index = self.open.take()?;
        if reason == FinalizeReason::Error && self.messages[index].is_empty() {
            self.messages[index].content = ERROR_FALLBACK_MESSAGE.to_string();
        }
        Some(index)
    }

    /// Drops everything, including any open turn.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.open = None;
    }

    /// Messages appended by the turn that started at `turn_start`, cloned.
    pub fn turn_slice(&self, turn_start: usize) -> Vec<Message> {
        self.messages[turn_start..].to_vec()
    }

    /// Replays an already-finalized turn, e.g. from a response cache.
    pub fn append_finalized(&mut self, messages: &[Message]) {
        self.messages.extend_from_slice(messages);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Role, SkillInfo};

    fn skill(name: &str) -> ToolResult {
        ToolResult::SkillDetail {
            skill: SkillInfo {
                name: name.to_string(),
                ..SkillInfo::default()
            },
        }
    }

    #[test]
    fn test_content_accumulates_into_one_open_message() {
        let mut transcript = Transcript::new();
        transcript.push_user_message("hi");
        transcript.begin_assistant_turn();
        transcript.apply_content("Hel");
        transcript.apply_content("lo");
        transcript.finalize(FinalizeReason::Done);

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[1].role, Role::Assistant);
        assert_eq!(transcript.messages()[1].content, "Hello");
        assert!(!transcript.is_streaming());
    }

    #[test]
    fn test_content_before_turn_start_opens_message() {
        let mut transcript = Transcript::new();
        transcript.apply_content("eager");
        assert!(transcript.is_streaming());
        assert_eq!(transcript.messages()[0].content, "eager");
    }

    #[test]
    fn test_second_tool_result_opens_new_message() {
        let mut transcript = Transcript::new();
        transcript.begin_assistant_turn();
        transcript.apply_content("x");
        transcript.apply_tool_result(skill("Rust"));
        transcript.apply_tool_result(skill("TypeScript"));
        transcript.finalize(FinalizeReason::Done);

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[0].content, "x");
        assert_eq!(transcript.messages()[0].tool_result, Some(skill("Rust")));
        assert_eq!(transcript.messages()[1].content, "");
        assert_eq!(
            transcript.messages()[1].tool_result,
            Some(skill("TypeScript"))
        );
    }

    #[test]
    fn test_content_after_split_lands_on_new_open_message() {
        let mut transcript = Transcript::new();
        transcript.begin_assistant_turn();
        transcript.apply_tool_result(skill("Rust"));
        transcript.apply_tool_result(skill("Go"));
        transcript.apply_content("tail");
        transcript.finalize(FinalizeReason::Done);

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[1].content, "tail");
    }

    #[test]
    fn test_error_finalize_fills_empty_message_with_fallback() {
        let mut transcript = Transcript::new();
        transcript.begin_assistant_turn();
        transcript.finalize(FinalizeReason::Error);
        assert_eq!(transcript.messages()[0].content, ERROR_FALLBACK_MESSAGE);
    }

    #[test]
    fn test_error_finalize_keeps_partial_content() {
        let mut transcript = Transcript::new();
        transcript.begin_assistant_turn();
        transcript.apply_content("partial answer");
        transcript.finalize(FinalizeReason::Error);
        assert_eq!(transcript.messages()[0].content, "partial answer");
    }

    #[test]
    fn test_finalize_without_open_turn_is_noop() {
        let mut transcript = Transcript::new();
        assert_eq!(transcript.finalize(FinalizeReason::Done), None);
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_reset_clears_open_turn() {
        let mut transcript = Transcript::new();
        transcript.push_user_message("hi");
        transcript.begin_assistant_turn();
        transcript.apply_content("str");
        transcript.reset();
        assert!(transcript.is_empty());
        assert!(!transcript.is_streaming());
    }
}
