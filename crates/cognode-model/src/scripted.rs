//! A model client that replays canned replies.

use crate::client::{Completion, ModelClient};
use crate::error::ModelCallError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Replays queued results in order and records every call it receives.
///
/// Also tracks how many calls overlapped, so callers can assert that
/// completions were never requested concurrently.
#[derive(Default)]
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<Completion, ModelCallError>>>,
    calls: Mutex<Vec<(String, String)>>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful reply.
    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(Completion::new(text)))
    }

    /// Queues a failure.
    pub fn with_failure(self, error: ModelCallError) -> Self {
        self.push(Err(error))
    }

    /// Makes every call wait before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn push(self, result: Result<Completion, ModelCallError>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(result);
        }
        self
    }

    /// `(system_prompt, user_input)` of every call so far, in order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Highest number of calls that were running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_input: &str,
    ) -> Result<Completion, ModelCallError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Ok(mut calls) = self.calls.lock() {
            calls.push((system_prompt.to_string(), user_input.to_string()));
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front());
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        next.unwrap_or_else(|| {
            Err(ModelCallError::MalformedResponse(
                "scripted client has no reply left".to_string(),
            ))
        })
    }
}
