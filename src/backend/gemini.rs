use super::{GenerationBackend, Utterance, prompts};
use crate::errors::BackendError;
use crate::ideas::RefinedIdea;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Everything the client needs, already resolved from config and environment.
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub base_url: String,
    /// Name of the variable the key was looked up in, for error messages.
    pub api_key_env: String,
    pub api_key: Option<String>,
    pub task_model: String,
    pub brainstorm_model: String,
    pub speech_model: String,
    pub voice: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

impl GenerateResponse {
    fn parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
    }

    /// Concatenated text of the first candidate.
    fn text(&self) -> String {
        self.parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect()
    }

    fn inline_audio(&self) -> Option<String> {
        self.parts()
            .iter()
            .find_map(|p| p.inline_data.as_ref())
            .map(|d| d.data.clone())
    }
}

/// `GenerationBackend` over the Gemini REST API.
pub struct GeminiBackend {
    settings: GeminiSettings,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(settings: GeminiSettings) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &GeminiSettings {
        &self.settings
    }

    async fn call(&self, model: &str, payload: Value) -> Result<GenerateResponse, BackendError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| BackendError::MissingApiKey {
                var: self.settings.api_key_env.clone(),
            })?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            model
        );
        tracing::debug!(model, "calling generateContent");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                429 => BackendError::RateLimited,
                401 | 403 => BackendError::Auth(body),
                code => BackendError::Api { status: code, body },
            });
        }

        response
            .json()
            .await
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))
    }

    fn transport_error(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout {
                secs: self.settings.request_timeout.as_secs(),
            }
        } else {
            BackendError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn generate(&self, idea: &str, task: &str, phase: &str) -> Result<String, BackendError> {
        let payload = json!({
            "contents": [{"parts": [{"text": prompts::task_prompt(idea, task, phase)}]}]
        });
        let text = self.call(&self.settings.task_model, payload).await?.text();
        if text.trim().is_empty() {
            return Err(BackendError::MalformedResponse(
                "response contained no text".to_string(),
            ));
        }
        Ok(text)
    }

    async fn synthesize(&self, topic: &str) -> Result<Utterance, BackendError> {
        let payload = json!({
            "contents": [{"parts": [{"text": prompts::narration_prompt(topic)}]}],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": {"voiceName": self.settings.voice}
                    }
                }
            }
        });
        let response = self.call(&self.settings.speech_model, payload).await?;
        let transcript = Some(response.text()).filter(|t| !t.trim().is_empty());
        Ok(Utterance {
            audio_base64: response.inline_audio(),
            transcript,
        })
    }

    async fn brainstorm(&self, idea: &str) -> Result<RefinedIdea, BackendError> {
        let payload = json!({
            "contents": [{"parts": [{"text": prompts::brainstorm_prompt(idea)}]}],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "refinedName": {"type": "STRING"},
                        "formula": {"type": "STRING"},
                        "slcBreakdown": {"type": "STRING"},
                        "marketVerdict": {"type": "STRING"},
                        "threeDayMvpPlan": {"type": "ARRAY", "items": {"type": "STRING"}}
                    },
                    "required": ["refinedName", "formula", "slcBreakdown", "marketVerdict", "threeDayMvpPlan"]
                }
            }
        });
        let text = self
            .call(&self.settings.brainstorm_model, payload)
            .await?
            .text();
        serde_json::from_str(&text).map_err(|e| {
            BackendError::MalformedResponse(format!("brainstorm result is not valid JSON: {e}"))
        })
    }
}
