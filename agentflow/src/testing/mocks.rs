//! Test doubles for the text-generation capability.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

use crate::errors::GenerationError;
use crate::llm::{GenerationRequest, GenerationResponse, TextGenerator};

/// A generator that replays a fixed script of responses, one per call.
///
/// Once the script runs out every further call fails with a request error.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<String, GenerationError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    /// Creates a generator that returns `responses` in order.
    #[must_use]
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Appends a successful response to the script.
    #[must_use]
    pub fn then_ok(self, text: impl Into<String>) -> Self {
        self.script.lock().push_back(Ok(text.into()));
        self
    }

    /// Appends a failure to the script.
    #[must_use]
    pub fn then_err(self, error: GenerationError) -> Self {
        self.script.lock().push_back(Err(error));
        self
    }

    /// Returns the number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Returns every request received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }

    /// Returns the number of unused script entries.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        self.requests.lock().push(request.clone());
        let next = self.script.lock().pop_front();
        match next {
            Some(Ok(text)) => Ok(GenerationResponse::text(text).with_model(request.model.clone())),
            Some(Err(error)) => Err(error),
            None => Err(GenerationError::Request("script exhausted".to_string())),
        }
    }
}

/// A generator that fails every call with the same error.
#[derive(Debug)]
pub struct FailingGenerator {
    error: GenerationError,
    calls: AtomicUsize,
}

impl FailingGenerator {
    /// Creates a generator failing with `error`.
    #[must_use]
    pub fn new(error: GenerationError) -> Self {
        Self {
            error,
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns the number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(
        &self,
        _request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// A generator that never answers.
///
/// Signals each call through [`started`](Self::started) so a test can cancel
/// or time out a stage that is known to be in flight.
#[derive(Debug, Default)]
pub struct StallingGenerator {
    calls: AtomicUsize,
    started: Notify,
}

impl StallingGenerator {
    /// Creates a stalling generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Completes once a call has started.
    pub async fn started(&self) {
        self.started.notified().await;
    }

    /// Returns the number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for StallingGenerator {
    async fn generate(
        &self,
        _request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        std::future::pending().await
    }
}
