//! Remote text-generation clients.
//!
//! Each client sends one request per call and converts the provider's
//! response JSON into a [`GeneratedText`] right here, at the boundary; the
//! rest of the system never sees provider-specific shapes.
//!
//! | Provider | Endpoint |
//! |----------|----------|
//! | `gemini` | `POST {base_url}/v1beta/models/{model}:generateContent` |
//! | `openai` | `POST {base_url}/v1/chat/completions` |
//!
//! There is no retry and no streaming. A non-2xx status, a transport
//! error, or a response without text is returned as an error.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use medrag_core::generate::{GeneratedText, Generator};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::GenerationSettings;

/// Create the generator named by the resolved settings.
pub fn create_generator(settings: &GenerationSettings) -> Result<Arc<dyn Generator>> {
    match settings.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiGenerator::new(settings.clone())?)),
        "openai" => Ok(Arc::new(OpenAIChatGenerator::new(settings.clone())?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

async fn read_success_json(response: reqwest::Response, provider: &str) -> Result<String> {
    let status = response.status();
    let text = response
        .text()
        .await
        .with_context(|| format!("{} response body could not be read", provider))?;
    if !status.is_success() {
        bail!("{} API error {}: {}", provider, status, text);
    }
    Ok(text)
}

// ============ Gemini ============

/// Google Gemini via the Generative Language API.
pub struct GeminiGenerator {
    client: reqwest::Client,
    settings: GenerationSettings,
}

impl GeminiGenerator {
    pub fn new(settings: GenerationSettings) -> Result<Self> {
        Ok(Self {
            client: http_client(settings.timeout_secs)?,
            settings,
        })
    }

    fn endpoint(&self) -> String {
        let model = self
            .settings
            .model
            .strip_prefix("models/")
            .unwrap_or(&self.settings.model);
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            model
        )
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

/// Concatenate the text parts of the first candidate that has content.
fn parse_gemini_response(body: &str) -> Result<GeneratedText> {
    let parsed: GeminiResponse =
        serde_json::from_str(body).context("malformed Gemini response")?;
    let text: String = parsed
        .candidates
        .into_iter()
        .find_map(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.is_empty() {
        bail!("malformed Gemini response: no text in candidates");
    }
    Ok(GeneratedText::new(text))
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn model_name(&self) -> &str {
        &self.settings.model
    }

    async fn generate(&self, prompt: &str) -> Result<GeneratedText> {
        let body = serde_json::json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "generationConfig": {
                "temperature": self.settings.temperature,
                "maxOutputTokens": self.settings.max_output_tokens,
            }
        });

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&body)
            .send()
            .await
            .context("Gemini request failed")?;

        let text = read_success_json(response, "Gemini").await?;
        parse_gemini_response(&text)
    }
}

// ============ OpenAI-compatible chat ============

/// OpenAI (or compatible) chat completions with a single user message.
pub struct OpenAIChatGenerator {
    client: reqwest::Client,
    settings: GenerationSettings,
}

impl OpenAIChatGenerator {
    pub fn new(settings: GenerationSettings) -> Result<Self> {
        Ok(Self {
            client: http_client(settings.timeout_secs)?,
            settings,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

fn parse_chat_response(body: &str) -> Result<GeneratedText> {
    let parsed: ChatResponse = serde_json::from_str(body).context("malformed chat response")?;
    match parsed.choices.into_iter().next().and_then(|c| c.message.content) {
        Some(text) if !text.is_empty() => Ok(GeneratedText::new(text)),
        _ => bail!("malformed chat response: no message content"),
    }
}

#[async_trait]
impl Generator for OpenAIChatGenerator {
    fn model_name(&self) -> &str {
        &self.settings.model
    }

    async fn generate(&self, prompt: &str) -> Result<GeneratedText> {
        let body = serde_json::json!({
            "model": self.settings.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.settings.temperature,
            "max_tokens": self.settings.max_output_tokens,
            "stream": false,
        });

        let response = self
            .client
            .post(format!(
                "{}/v1/chat/completions",
                self.settings.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .await
            .context("chat completion request failed")?;

        let text = read_success_json(response, "OpenAI").await?;
        parse_chat_response(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;

    fn settings(model: &str) -> GenerationSettings {
        let config = GenerationConfig {
            model: model.to_string(),
            ..GenerationConfig::default()
        };
        GenerationSettings::with_api_key(&config, "k").unwrap()
    }

    #[test]
    fn test_gemini_endpoint_strips_models_prefix() {
        let g = GeminiGenerator::new(settings("models/gemini-2.0-flash")).unwrap();
        assert_eq!(
            g.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_parse_gemini_joins_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Allergic rhinitis "},{"text":"causes sneezing."}],"role":"model"},"finishReason":"STOP"}]}"#;
        let out = parse_gemini_response(body).unwrap();
        assert_eq!(out.text, "Allergic rhinitis causes sneezing.");
    }

    #[test]
    fn test_parse_gemini_without_text_fails() {
        let body = r#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        assert!(parse_gemini_response(body).is_err());
        assert!(parse_gemini_response("not json").is_err());
    }

    #[test]
    fn test_parse_chat_response() {
        let body = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Rest and ice."}}]}"#;
        assert_eq!(parse_chat_response(body).unwrap().text, "Rest and ice.");
        assert!(parse_chat_response(r#"{"choices":[]}"#).is_err());
    }

    #[test]
    fn test_create_generator_by_provider() {
        let g = create_generator(&settings("gemini-2.0-flash")).unwrap();
        assert_eq!(g.model_name(), "gemini-2.0-flash");
    }
}
