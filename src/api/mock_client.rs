use crate::api::client::{ByteStream, MockStreamProducer};
use crate::types::ChatRequest;
use anyhow::Result;
use bytes::Bytes;
use futures::stream;
use std::sync::{Arc, Mutex};

/// Scripted outcome for one `create_stream` call.
///
/// Chunks are emitted verbatim, so a test can split a record at any byte
/// boundary by scripting the fragments itself.
pub enum MockOutcome {
    /// Emit the chunks, then end the stream.
    Stream(Vec<String>),
    /// Emit the chunks, then yield a stream-level error.
    StreamThenError(Vec<String>, String),
    /// Fail `create_stream` itself, before any bytes flow.
    RequestError(String),
}

#[derive(Clone)]
pub struct MockApiClient {
    outcomes: Arc<Mutex<Vec<MockOutcome>>>,
}

impl MockApiClient {
    pub fn new(outcomes: Vec<MockOutcome>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(outcomes)),
        }
    }

    /// Convenience constructor: each inner vec is one response, each string
    /// one SSE record framed as `data: <record>\n\n`.
    pub fn from_records(responses: Vec<Vec<String>>) -> Self {
        let outcomes = responses
            .into_iter()
            .map(|records| {
                MockOutcome::Stream(
                    records
                        .into_iter()
                        .map(|record| format!("data: {record}\n\n"))
                        .collect(),
                )
            })
            .collect();
        Self::new(outcomes)
    }
}

impl MockStreamProducer for MockApiClient {
    fn create_mock_stream(&self, _request: &ChatRequest) -> Result<ByteStream> {
        let mut outcomes_guard = self.outcomes.lock().unwrap();
        if outcomes_guard.is_empty() {
            return Err(anyhow::anyhow!(
                "MockApiClient: no more responses configured"
            ));
        }

        match outcomes_guard.remove(0) {
            MockOutcome::Stream(chunks) => {
                let items: Vec<Result<Bytes>> =
                    chunks.into_iter().map(|s| Ok(Bytes::from(s))).collect();
                Ok(Box::pin(stream::iter(items)))
            }
            MockOutcome::StreamThenError(chunks, error) => {
                let mut items: Vec<Result<Bytes>> =
                    chunks.into_iter().map(|s| Ok(Bytes::from(s))).collect();
                items.push(Err(anyhow::anyhow!(error)));
                Ok(Box::pin(stream::iter(items)))
            }
            MockOutcome::RequestError(error) => Err(anyhow::anyhow!(error)),
        }
    }
}
