use serde::{Deserialize, Serialize};

/// Shown in place of an empty assistant bubble when a turn ends in error.
pub const ERROR_FALLBACK_MESSAGE: &str = "Sorry, there was an error processing your request.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn in a conversation transcript.
///
/// `content` grows while the assistant message is streaming and is frozen once
/// the turn is finalized. A message hosts at most one tool result; additional
/// tool invocations in the same turn become additional assistant messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<ToolResult>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_result: None,
        }
    }

    pub fn assistant() -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            tool_result: None,
        }
    }

    /// True when the message carries neither text nor a tool result.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.tool_result.is_none()
    }
}

/// Structured payload attached to an assistant message, rendered as a card
/// rather than as text. Shapes mirror what the backend tools produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolResult {
    ProjectRecommendation {
        projects: Vec<ProjectCard>,
        reason: String,
    },
    SkillDetail {
        skill: SkillInfo,
    },
    ExperienceDetail {
        experience: Vec<ExperienceEntry>,
    },
}

/// Display fields default so that the inline call path, which only knows
/// project ids, deserializes into the same type as the full structured payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectCard {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ProjectCard {
    pub fn from_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillInfo {
    pub name: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub years: u32,
    #[serde(default)]
    pub projects: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub company: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub duration: String,
}

/// Why a streaming assistant turn was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeReason {
    Done,
    Error,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serializes_without_absent_tool_result() {
        let message = Message::user("hello");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["content"], "hello");
        assert!(value.get("tool_result").is_none());
    }

    #[test]
    fn test_project_card_deserializes_with_id_only() {
        let card: ProjectCard = serde_json::from_str(r#"{"id":"tetris-ai"}"#).unwrap();
        assert_eq!(card.id, "tetris-ai");
        assert!(card.title.is_empty());
        assert!(card.tags.is_empty());
    }
}
