use regex::Regex;
use std::sync::OnceLock;

use crate::api::logging;
use crate::types::{ExperienceEntry, ProjectCard, SkillInfo, ToolResult};

/// Inline call with an array argument plus an optional trailing reason string:
/// `; recommendProject(["a", "b"], "both use WebGL")`.
fn array_call_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#";\s*([A-Za-z_][A-Za-z0-9_]*)\s*\(\s*\[([^\]]*)\]\s*(?:,\s*"([^"]*)")?\s*\)"#)
            .expect("array call regex must compile")
    })
}

/// Inline call with a single string argument: `; explainSkill("Rust")`.
fn string_call_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#";\s*([A-Za-z_][A-Za-z0-9_]*)\s*\(\s*"([^"]*)"\s*\)"#)
            .expect("string call regex must compile")
    })
}

/// Text produced by feeding one content delta through the extractor.
#[derive(Debug, Default, PartialEq)]
pub struct Extraction {
    /// Prose to append to the assistant message, with recognized calls removed.
    pub visible: String,
    /// Tool results recognized in this delta, in order of appearance.
    pub calls: Vec<ToolResult>,
}

/// Scans streamed assistant text for the backend's inline tool-call syntax.
///
/// Calls can be split across any number of deltas, so a trailing fragment that
/// could still grow into a call is withheld until more text arrives. `flush`
/// releases whatever is held verbatim: an unterminated call at end of stream
/// is shown to the user rather than silently dropped.
#[derive(Default)]
pub struct ToolCallExtractor {
    carry: String,
}

impl ToolCallExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&mut self, delta: &str) -> Extraction {
        self.carry.push_str(delta);
        let pending = std::mem::take(&mut self.carry);

        let mut out = Extraction::default();
        let mut cursor = 0;

        while let Some((start, end, call)) = next_complete_call(&pending[cursor..]) {
            let (start, end) = (cursor + start, cursor + end);
            out.visible.push_str(&pending[cursor..start]);
            match call {
                Some(result) => out.calls.push(result),
                // Unknown tool names stay visible; the model may be writing
                // prose that merely looks like a call.
                None => out.visible.push_str(&pending[start..end]),
            }
            cursor = end;
        }

        let tail = &pending[cursor..];
        match earliest_call_prefix(tail) {
            Some(held_from) => {
                out.visible.push_str(&tail[..held_from]);
                self.carry = tail[held_from..].to_string();
            }
            None => out.visible.push_str(tail),
        }

        out
    }

    /// End-of-stream drain. Fails open: a held fragment that never completed
    /// comes back as plain text.
    pub fn flush(&mut self) -> String {
        std::mem::take(&mut self.carry)
    }
}

/// Earliest complete inline call in `text`, as (start, end, recognized result).
/// `None` in the third slot means the syntax matched but the tool is unknown.
fn next_complete_call(text: &str) -> Option<(usize, usize, Option<ToolResult>)> {
    let array_match = array_call_regex().captures(text);
    let string_match = string_call_regex().captures(text);

    let pick_array = match (&array_match, &string_match) {
        (Some(a), Some(s)) => a.get(0).unwrap().start() <= s.get(0).unwrap().start(),
        (Some(_), None) => true,
        (None, Some(_)) => false,
        (None, None) => return None,
    };

    if pick_array {
        let captures = array_match.unwrap();
        let whole = captures.get(0).unwrap();
        let name = &captures[1];
        let args = split_array_args(&captures[2]);
        let reason = captures.get(3).map(|m| m.as_str()).unwrap_or("");
        let result = convert_call(name, &args, reason, whole.as_str());
        Some((whole.start(), whole.end(), result))
    } else {
        let captures = string_match.unwrap();
        let whole = captures.get(0).unwrap();
        let name = &captures[1];
        let arg = captures[2].to_string();
        let result = convert_call(name, std::slice::from_ref(&arg), "", whole.as_str());
        Some((whole.start(), whole.end(), result))
    }
}

fn split_array_args(inner: &str) -> Vec<String> {
    inner
        .split(',')
        .map(|part| part.trim().trim_matches('"').trim_matches('\'').to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

fn convert_call(name: &str, args: &[String], reason: &str, raw_call: &str) -> Option<ToolResult> {
    match name {
        "recommendProject" => Some(ToolResult::ProjectRecommendation {
            projects: args.iter().map(ProjectCard::from_id).collect(),
            reason: reason.to_string(),
        }),
        "explainSkill" => {
            let name = args.first().cloned().unwrap_or_default();
            Some(ToolResult::SkillDetail {
                skill: SkillInfo {
                    name,
                    ..SkillInfo::default()
                },
            })
        }
        "getExperience" => {
            let experience = args
                .iter()
                .filter(|company| !company.is_empty())
                .map(|company| ExperienceEntry {
                    company: company.clone(),
                    ..ExperienceEntry::default()
                })
                .collect();
            Some(ToolResult::ExperienceDetail { experience })
        }
        _ => {
            logging::emit_dropped_tool_call(name, raw_call);
            None
        }
    }
}

/// Byte offset of the earliest `;` whose suffix could still grow into a
/// complete call, or `None` when nothing needs to be withheld.
fn earliest_call_prefix(tail: &str) -> Option<usize> {
    for (index, byte) in tail.bytes().enumerate() {
        if byte == b';' && is_call_prefix(&tail[index..]) {
            return Some(index);
        }
    }
    None
}

/// Whether `candidate` (starting at `;`) is a proper prefix of the call
/// grammar. Prose like "; they rock" fails fast so it is never withheld.
fn is_call_prefix(candidate: &str) -> bool {
    #[derive(PartialEq)]
    enum State {
        Ws,
        Ident,
        AfterIdent,
        Args,
    }

    let mut state = State::Ws;
    for ch in candidate.chars().skip(1) {
        state = match state {
            State::Ws => {
                if ch.is_whitespace() {
                    State::Ws
                } else if ch.is_ascii_alphabetic() || ch == '_' {
                    State::Ident
                } else {
                    return false;
                }
            }
            State::Ident => {
                if ch.is_ascii_alphanumeric() || ch == '_' {
                    State::Ident
                } else if ch == '(' {
                    State::Args
                } else if ch.is_whitespace() {
                    State::AfterIdent
                } else {
                    return false;
                }
            }
            State::AfterIdent => {
                if ch == '(' {
                    State::Args
                } else if ch.is_whitespace() {
                    State::AfterIdent
                } else {
                    return false;
                }
            }
            State::Args => {
                if ch == ')' {
                    // A closed call would already have matched as complete.
                    return false;
                }
                State::Args
            }
        };
    }
    true
}
