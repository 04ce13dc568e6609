//! AI verdict provider
//!
//! Calls the chat-completions API in strict structured-output mode and
//! parses the reply into a `Verdict`. A call that cannot be parsed into the
//! full verdict shape is an error - a partial verdict is never returned.
//! AI calls are never retried automatically: each one is billable, and a
//! failure is surfaced immediately rather than paid for twice.

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::VerdictApi;
use crate::error::{Result, UpstreamError};
use crate::models::{HardwareProfile, Verdict};

/// Default AI provider base URL
pub const DEFAULT_AI_URL: &str = "https://api.openai.com/v1";

/// Default model; a small model is enough for a directional verdict
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str = "You are a PC hardware compatibility analyst. \
Given a user's hardware and a game's minimum requirements, reply with a single \
JSON object and nothing else, with exactly these fields: \
\"canRun\" (boolean), \
\"performanceTier\" (one of \"low\", \"medium\", \"high\", \"ultra\"), \
\"bottleneck\" (one of \"cpu\", \"gpu\", \"ram\", \"none\"), \
\"recommendation\" (one short sentence).";

/// Chat-completions client producing compatibility verdicts
pub struct OpenAiVerdictClient {
    http: HttpClient,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiVerdictClient {
    pub fn new(
        http: HttpClient,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn user_prompt(profile: &HardwareProfile, requirements_excerpt: &str) -> String {
        format!(
            "Hardware: CPU: {}; GPU: {}; RAM: {}; OS: {}\nGame minimum requirements: {}",
            profile.cpu.as_deref().unwrap_or("unknown"),
            profile.gpu.as_deref().unwrap_or("unknown"),
            profile.ram.as_deref().unwrap_or("unknown"),
            profile.os.as_deref().unwrap_or("unknown"),
            requirements_excerpt,
        )
    }
}

#[async_trait]
impl VerdictApi for OpenAiVerdictClient {
    async fn analyze(
        &self,
        profile: &HardwareProfile,
        requirements_excerpt: &str,
    ) -> Result<Verdict> {
        #[derive(Deserialize)]
        struct ChatMessage {
            content: String,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatMessage,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": Self::user_prompt(profile, requirements_excerpt) }
            ]
        });

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(UpstreamError::from)?;

        let status = response.status();
        match status {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED => return Err(UpstreamError::Unauthorized.into()),
            status if status.is_client_error() => {
                let body = response.text().await.unwrap_or_default();
                log::error!("AI provider rejected the request ({}): {}", status, body);
                return Err(UpstreamError::ClientError {
                    status: status.as_u16(),
                    body,
                }
                .into());
            }
            status => return Err(UpstreamError::ServerError(status.as_u16()).into()),
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            UpstreamError::InvalidResponse(format!("Failed to parse AI response: {}", e))
        })?;

        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| {
                UpstreamError::InvalidResponse("AI response contained no choices".to_string())
            })?;

        serde_json::from_str::<Verdict>(content).map_err(|e| {
            UpstreamError::InvalidResponse(format!(
                "AI response is not a valid verdict: {}",
                e
            ))
            .into()
        })
    }
}
