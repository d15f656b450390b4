use serde::{Deserialize, Serialize};

use super::chat::{ExperienceEntry, Message, ProjectCard, Role, SkillInfo, ToolResult};

/// Request body for one chat turn: the visible history as plain text pairs.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<WireMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl ChatRequest {
    /// Assistant messages that only host a tool card carry no text and are
    /// not sent back to the backend.
    pub fn from_history(history: &[Message]) -> Self {
        let messages = history
            .iter()
            .filter(|message| !message.content.is_empty())
            .map(|message| WireMessage {
                role: message.role,
                content: message.content.clone(),
            })
            .collect();
        Self { messages }
    }
}

/// One decoded unit from the SSE body.
///
/// The backend is not consistent about payload vocabulary across its demo
/// surfaces; anything with an unrecognized `type` decodes as `Unknown` and is
/// dropped upstream instead of aborting the stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Content {
        content: String,
    },
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
    Error {
        error: String,
    },
    Done,
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    /// Normalizes the structured tool-call encoding into a `ToolResult`.
    /// Returns `None` for every non-tool variant.
    pub fn into_tool_result(self) -> Option<ToolResult> {
        match self {
            StreamEvent::ProjectRecommendation { projects, reason } => {
                Some(ToolResult::ProjectRecommendation { projects, reason })
            }
            StreamEvent::SkillDetail { skill } => Some(ToolResult::SkillDetail { skill }),
            StreamEvent::ExperienceDetail { experience } => {
                Some(ToolResult::ExperienceDetail { experience })
            }
            _ => None,
        }
    }
}
