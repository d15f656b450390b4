use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::util::{env_override_usize, is_local_endpoint_url};

const DEFAULT_API_URL: &str = "http://localhost:3000/demo/api/ai/portfolio";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_url: String,
    /// Messages kept in the outgoing request history. Older turns are trimmed.
    pub max_history_messages: usize,
    /// Abort a turn when the stream goes silent for this long. `None` waits
    /// indefinitely, which is what the browser client does.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout: Option<Duration>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let api_url =
            std::env::var("FOLIO_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let api_key = std::env::var("FOLIO_API_KEY").ok().and_then(|v| {
            if v.trim().is_empty() {
                None
            } else {
                Some(v)
            }
        });
        let max_history_messages = env_override_usize("FOLIO_MAX_HISTORY_MESSAGES", 32, 4, 128);
        let idle_timeout = std::env::var("FOLIO_IDLE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(|secs| Duration::from_secs(secs.clamp(5, 600)));

        Ok(Self {
            api_key,
            api_url,
            max_history_messages,
            idle_timeout,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            bail!(
                "Invalid FOLIO_API_URL '{}': expected http:// or https:// URL",
                self.api_url
            );
        }

        if !self.is_local_endpoint() && self.api_key.is_none() {
            bail!(
                "FOLIO_API_KEY must be set for non-local endpoints (url: '{}')",
                self.api_url
            );
        }

        Ok(())
    }

    pub fn is_local_endpoint(&self) -> bool {
        is_local_endpoint_url(&self.api_url)
    }
}
