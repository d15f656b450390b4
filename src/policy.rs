use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

use crate::types::Message;

/// Sliding-window call budget, injected into a session rather than owned by
/// process-global state so independent sessions do not share a budget.
#[derive(Debug, Clone)]
pub struct RateLimitOptions {
    pub window: Duration,
    pub max_calls: usize,
}

impl Default for RateLimitOptions {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_calls: 10,
        }
    }
}

pub struct RateLimiter {
    options: RateLimitOptions,
    calls: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(options: RateLimitOptions) -> Self {
        Self {
            options,
            calls: VecDeque::new(),
        }
    }

    /// Records the call when it is within budget; otherwise returns how long
    /// until the oldest in-window call expires.
    pub fn check(&mut self) -> Result<(), Duration> {
        let now = Instant::now();
        while let Some(oldest) = self.calls.front() {
            if now.duration_since(*oldest) >= self.options.window {
                self.calls.pop_front();
            } else {
                break;
            }
        }

        if self.calls.len() < self.options.max_calls {
            self.calls.push_back(now);
            return Ok(());
        }

        let oldest = *self.calls.front().expect("budget exhausted implies calls");
        let retry_after = self
            .options
            .window
            .saturating_sub(now.duration_since(oldest));
        Err(retry_after)
    }
}

#[derive(Debug, Clone)]
pub struct CacheOptions {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_entries: 50,
        }
    }
}

/// Replay cache for finalized turns, keyed by the serialized request body.
/// Entries expire by TTL; beyond `max_entries` the oldest insertion is
/// evicted.
pub struct ResponseCache {
    options: CacheOptions,
    entries: HashMap<String, (Instant, Vec<Message>)>,
    order: VecDeque<String>,
}

impl ResponseCache {
    pub fn new(options: CacheOptions) -> Self {
        Self {
            options,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&mut self, key: &str) -> Option<Vec<Message>> {
        let (inserted_at, messages) = self.entries.get(key)?;
        if inserted_at.elapsed() >= self.options.ttl {
            self.entries.remove(key);
            self.order.retain(|k| k != key);
            return None;
        }
        Some(messages.clone())
    }

    pub fn insert(&mut self, key: String, messages: Vec<Message>) {
        if self.options.max_entries == 0 {
            return;
        }
        if self.entries.insert(key.clone(), (Instant::now(), messages)).is_none() {
            self.order.push_back(key);
        }
        while self.entries.len() > self.options.max_entries {
            let Some(evicted) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&evicted);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
