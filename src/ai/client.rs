use async_trait::async_trait;
use serde_json::{json, Value};

use crate::ai::router::Provider;
use crate::errors::AppError;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const XAI_CHAT_URL: &str = "https://api.x.ai/v1/chat/completions";

/// Management reviews run in Reasoning mode (stronger model, low sampling
/// temperature); scans and sentiment run in Speed mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskMode {
    Speed,
    Reasoning,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AiReply {
    pub text: String,
    pub citations: Vec<String>,
}

/// Text-generation collaborator. Failures surface as `AppError::External`
/// and are absorbed at the orchestration boundary.
#[async_trait]
pub trait AiClient: Send + Sync {
    async fn generate(
        &self,
        provider: Provider,
        prompt: &str,
        system_context: &str,
        mode: TaskMode,
    ) -> Result<AiReply, AppError>;
}

/// HTTP client for the three supported providers.
#[derive(Debug, Clone)]
pub struct HttpAiClient {
    http: reqwest::Client,
    gemini_api_key: Option<String>,
    openai_api_key: Option<String>,
    xai_api_key: Option<String>,
}

impl HttpAiClient {
    pub fn new(
        http: reqwest::Client,
        gemini_api_key: Option<String>,
        openai_api_key: Option<String>,
        xai_api_key: Option<String>,
    ) -> Self {
        Self {
            http,
            gemini_api_key,
            openai_api_key,
            xai_api_key,
        }
    }

    async fn post_json(&self, builder: reqwest::RequestBuilder, provider: &str) -> Result<Value, AppError> {
        let resp = builder
            .send()
            .await
            .map_err(|e| AppError::External(format!("{provider} request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::External(format!("{provider} returned {status}")));
        }

        resp.json()
            .await
            .map_err(|e| AppError::External(format!("{provider} sent an unreadable response: {e}")))
    }

    async fn generate_gemini(
        &self,
        prompt: &str,
        system_context: &str,
        mode: TaskMode,
    ) -> Result<AiReply, AppError> {
        let api_key = self
            .gemini_api_key
            .as_deref()
            .ok_or_else(|| AppError::External("GEMINI_API_KEY is not set".into()))?;

        let (model, temperature) = match mode {
            TaskMode::Reasoning => ("gemini-2.5-pro", 0.2),
            TaskMode::Speed => ("gemini-2.5-flash", 0.7),
        };

        let url = format!("{GEMINI_API_BASE}/models/{model}:generateContent");
        let body = json!({
            "system_instruction": { "parts": [{ "text": system_context }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "tools": [{ "google_search": {} }],
            "generationConfig": { "temperature": temperature },
        });

        let payload = self
            .post_json(self.http.post(&url).query(&[("key", api_key)]).json(&body), "Gemini")
            .await?;

        Ok(AiReply {
            text: extract_candidate_text(&payload),
            citations: extract_grounding_urls(&payload),
        })
    }

    async fn generate_openai(&self, prompt: &str, system_context: &str) -> Result<AiReply, AppError> {
        let api_key = self
            .openai_api_key
            .as_deref()
            .ok_or_else(|| AppError::External("OPENAI_API_KEY is not set".into()))?;

        let body = json!({
            "model": "gpt-4o",
            "messages": [
                { "role": "system", "content": system_context },
                { "role": "user", "content": prompt },
            ],
        });

        let payload = self
            .post_json(self.http.post(OPENAI_CHAT_URL).bearer_auth(api_key).json(&body), "OpenAI")
            .await?;

        let text = payload
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(AiReply { text, citations: Vec::new() })
    }

    async fn generate_grok(&self, prompt: &str, system_context: &str) -> Result<AiReply, AppError> {
        let api_key = self
            .xai_api_key
            .as_deref()
            .ok_or_else(|| AppError::External("XAI_API_KEY or GROK_API_KEY is not set".into()))?;

        let body = json!({
            "model": "grok-4-1-fast",
            "messages": [
                { "role": "system", "content": system_context },
                { "role": "user", "content": prompt },
            ],
            "search_parameters": { "mode": "auto" },
        });

        let payload = self
            .post_json(self.http.post(XAI_CHAT_URL).bearer_auth(api_key).json(&body), "Grok")
            .await?;

        let text = payload
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let citations = payload
            .get("citations")
            .and_then(|v| v.as_array())
            .map(|urls| {
                urls.iter()
                    .filter_map(|u| u.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(AiReply { text, citations })
    }
}

#[async_trait]
impl AiClient for HttpAiClient {
    async fn generate(
        &self,
        provider: Provider,
        prompt: &str,
        system_context: &str,
        mode: TaskMode,
    ) -> Result<AiReply, AppError> {
        match provider {
            Provider::Gemini => self.generate_gemini(prompt, system_context, mode).await,
            Provider::OpenAi => self.generate_openai(prompt, system_context).await,
            Provider::Grok => self.generate_grok(prompt, system_context).await,
        }
    }
}

/// Stitch together all text parts of the first candidates. Tool-call heavy
/// responses may spread text across parts.
pub(crate) fn extract_candidate_text(payload: &Value) -> String {
    let mut parts_text: Vec<&str> = Vec::new();

    if let Some(candidates) = payload.get("candidates").and_then(|v| v.as_array()) {
        for candidate in candidates {
            if let Some(parts) = candidate.pointer("/content/parts").and_then(|v| v.as_array()) {
                for part in parts {
                    if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
                        parts_text.push(text);
                    }
                }
            }
        }
    }

    parts_text.join("\n").trim().to_string()
}

/// Source URLs from Gemini search grounding, when present.
fn extract_grounding_urls(payload: &Value) -> Vec<String> {
    let mut urls = Vec::new();

    if let Some(candidates) = payload.get("candidates").and_then(|v| v.as_array()) {
        for candidate in candidates {
            if let Some(chunks) = candidate
                .pointer("/groundingMetadata/groundingChunks")
                .and_then(|v| v.as_array())
            {
                for chunk in chunks {
                    if let Some(uri) = chunk.pointer("/web/uri").and_then(|v| v.as_str()) {
                        urls.push(uri.to_string());
                    }
                }
            }
        }
    }

    urls
}
