use crate::api::logging;
use crate::types::StreamEvent;
use anyhow::Result;

/// Incremental decoder for the backend's SSE body.
///
/// Frames arrive as `data: <json>\n\n` records, but network chunking can cut
/// them anywhere, including inside a UTF-8 sequence or mid-record. The carry
/// buffer holds raw bytes; text is only decoded once a full line is present,
/// so a multi-byte character split across chunks reassembles intact.
#[derive(Default)]
pub struct StreamParser {
    buffer: Vec<u8>,
}

impl StreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, chunk: &[u8]) -> Result<Vec<StreamEvent>> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        let mut start = 0;

        while let Some(offset) = self.buffer[start..].iter().position(|&b| b == b'\n') {
            let line_end = start + offset;
            let line = String::from_utf8_lossy(&self.buffer[start..line_end]);
            if let Some(event) = parse_record_line(&line) {
                events.push(event);
            }
            start = line_end + 1;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        Ok(events)
    }

    /// Drains the carry buffer at end of stream. A record the server sent
    /// without a trailing newline is still decoded.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let tail = std::mem::take(&mut self.buffer);
        let tail = String::from_utf8_lossy(&tail);
        parse_record_line(&tail).into_iter().collect()
    }
}

fn parse_record_line(line: &str) -> Option<StreamEvent> {
    let data = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:"))?;
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<StreamEvent>(data) {
        Ok(event) => Some(event),
        Err(parse_error) => {
            logging::emit_sse_parse_error(data, &parse_error);
            None
        }
    }
}
