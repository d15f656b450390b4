pub mod api;
pub mod chat;

pub use api::{ChatRequest, StreamEvent, WireMessage};
pub use chat::{
    ExperienceEntry, FinalizeReason, Message, ProjectCard, Role, SkillInfo, ToolResult,
    ERROR_FALLBACK_MESSAGE,
};
