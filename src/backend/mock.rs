//! Scripted backend for unit tests.

use super::{GenerationBackend, Utterance};
use crate::errors::BackendError;
use crate::ideas::RefinedIdea;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Base64 of `millis` of silence at 24 kHz mono.
pub fn silence_base64(millis: u64) -> String {
    let frames = 24_000 * millis / 1000;
    STANDARD.encode(vec![0u8; frames as usize * 2])
}

pub struct ScriptedBackend {
    generate_calls: Mutex<Vec<String>>,
    synthesize_calls: Mutex<Vec<String>>,
    failing_tasks: HashSet<String>,
    gate: Option<Arc<Notify>>,
    utterance: Result<Utterance, String>,
    speech_delays: HashMap<String, Duration>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self {
            generate_calls: Mutex::new(Vec::new()),
            synthesize_calls: Mutex::new(Vec::new()),
            failing_tasks: HashSet::new(),
            gate: None,
            utterance: Ok(Utterance {
                audio_base64: Some(silence_base64(500)),
                transcript: Some("narrating".to_string()),
            }),
            speech_delays: HashMap::new(),
        }
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// `generate` fails for this task description.
    pub fn fail_on(mut self, task: &str) -> Self {
        self.failing_tasks.insert(task.to_string());
        self
    }

    /// `generate` waits for one `notify_one` per call before answering.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_utterance(mut self, utterance: Utterance) -> Self {
        self.utterance = Ok(utterance);
        self
    }

    pub fn failing_speech(mut self) -> Self {
        self.utterance = Err("speech unavailable".to_string());
        self
    }

    pub fn speech_delay(mut self, topic: &str, delay: Duration) -> Self {
        self.speech_delays.insert(topic.to_string(), delay);
        self
    }

    pub fn generate_calls(&self) -> Vec<String> {
        self.generate_calls.lock().unwrap().clone()
    }

    pub fn synthesize_calls(&self) -> Vec<String> {
        self.synthesize_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(&self, _idea: &str, task: &str, _phase: &str) -> Result<String, BackendError> {
        let n = {
            let mut calls = self.generate_calls.lock().unwrap();
            calls.push(task.to_string());
            calls.len()
        };
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.failing_tasks.contains(task) {
            return Err(BackendError::Network("connection reset".to_string()));
        }
        Ok(format!("FILE_PATH: docs/{n}.md\n---CONTENT---\n{task}"))
    }

    async fn synthesize(&self, topic: &str) -> Result<Utterance, BackendError> {
        self.synthesize_calls.lock().unwrap().push(topic.to_string());
        if let Some(delay) = self.speech_delays.get(topic) {
            tokio::time::sleep(*delay).await;
        }
        self.utterance.clone().map_err(BackendError::Network)
    }

    async fn brainstorm(&self, idea: &str) -> Result<RefinedIdea, BackendError> {
        Ok(RefinedIdea {
            refined_name: format!("{idea} Pro"),
            formula: "pain -> model -> return".to_string(),
            slc_breakdown: "simple, lovable, complete".to_string(),
            market_verdict: "promising".to_string(),
            three_day_mvp_plan: vec!["prototype".to_string(), "pilot".to_string()],
        })
    }
}
