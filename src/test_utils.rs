//! Helpers shared by unit tests.
#![cfg(test)]
#![allow(clippy::unwrap_used, clippy::panic)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{
    AtomicUsize,
    Ordering,
};

use async_trait::async_trait;
use serde_json::Value;

use crate::provider::{
    Prompt,
    Provider,
    ProviderError,
};
use crate::types::{
    Dictionary,
    MissingKeysMap,
};

/// Unwraps a `json!` object literal into a [`Dictionary`].
pub(crate) fn dict(value: Value) -> Dictionary {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub(crate) fn missing(entries: &[(&str, &str)]) -> MissingKeysMap {
    entries.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
}

#[derive(Debug)]
enum Script {
    /// Canned completions, one per call.
    Responses(Mutex<VecDeque<String>>),
    /// Returns the requested content untranslated.
    Echo,
    /// Echoes the first `echo_calls` calls, then fails.
    EchoThenFail { echo_calls: usize, error: ProviderError },
}

/// Provider double that records how often it was called.
#[derive(Debug)]
pub(crate) struct ScriptedProvider {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn from_script(script: Script) -> Self {
        Self { script, calls: AtomicUsize::new(0) }
    }

    pub(crate) fn with_responses<I>(responses: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self::from_script(Script::Responses(Mutex::new(
            responses.into_iter().map(Into::into).collect(),
        )))
    }

    pub(crate) fn echo() -> Self {
        Self::from_script(Script::Echo)
    }

    pub(crate) fn failing(error: ProviderError) -> Self {
        Self::echo_then_fail(0, error)
    }

    pub(crate) fn echo_then_fail(echo_calls: usize, error: ProviderError) -> Self {
        Self::from_script(Script::EchoThenFail { echo_calls, error })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Responses(queue) => {
                queue.lock().unwrap().pop_front().ok_or(ProviderError::EmptyResponse)
            }
            Script::Echo => Ok(prompt.user.clone()),
            Script::EchoThenFail { echo_calls, error } => {
                if call < *echo_calls { Ok(prompt.user.clone()) } else { Err(error.clone()) }
            }
        }
    }
}
