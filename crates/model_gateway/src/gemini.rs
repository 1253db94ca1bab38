//! Gemini REST client.
//!
//! Talks to the `generateContent` endpoint directly so that inline image
//! parts can be sent and received.

use async_trait::async_trait;
use image::RgbImage;
use secrecy::{ExposeSecret, Secret};
use serde_json::{json, Value};
use std::time::Duration;

use ripple_core::{
    codec,
    config::ModelsConfig,
    traits::{ImageEditModel, VisionModel},
    Error, Result,
};

/// Configuration for one Gemini model endpoint.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API base, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub api_base: String,
    /// Model name.
    pub model: String,
    /// Sampling temperature for text generation.
    pub temperature: f32,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl GeminiConfig {
    /// Vision model settings from the application config.
    pub fn vision(models: &ModelsConfig) -> Self {
        Self::from_models(models, &models.vision_model)
    }

    /// Image edit model settings from the application config.
    pub fn image_edit(models: &ModelsConfig) -> Self {
        Self::from_models(models, &models.image_model)
    }

    fn from_models(models: &ModelsConfig, model: &str) -> Self {
        Self {
            api_base: models.api_base.trim().trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature: models.temperature,
            timeout: Duration::from_secs(models.request_timeout_secs.max(1)),
        }
    }

    /// `generateContent` URL for this model.
    pub fn endpoint(&self) -> String {
        let trimmed = self.model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{}", trimmed)
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }
}

/// Header carrying the API key; keeps it out of URLs and error text.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini client implementing both model traits for its configured model.
pub struct GeminiClient {
    config: GeminiConfig,
    api_key: Secret<String>,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig, api_key: Secret<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            config,
            api_key,
            http,
        }
    }

    /// Request body for text generation grounded on an image.
    pub fn vision_payload(&self, prompt: &str, image_b64: &str) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": prompt },
                    { "inlineData": { "mimeType": "image/png", "data": image_b64 } }
                ]
            }],
            "generationConfig": {
                "temperature": self.config.temperature,
                "thinkingConfig": { "thinkingBudget": 0 }
            }
        })
    }

    /// Request body for an image-only edit.
    pub fn edit_payload(&self, prompt: &str, image_b64: &str) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": prompt },
                    { "inlineData": { "mimeType": "image/png", "data": image_b64 } }
                ]
            }],
            "generationConfig": {
                "responseModalities": ["IMAGE"]
            }
        })
    }

    async fn post(&self, payload: &Value) -> Result<Value> {
        let endpoint = self.config.endpoint();
        let resp = self
            .http
            .post(&endpoint)
            .header(API_KEY_HEADER, self.api_key.expose_secret().as_str())
            .json(payload)
            .send()
            .await
            .map_err(|e| Error::model_provider(format!("Gemini request failed: {}", e.without_url())))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| {
                Error::model_provider(format!("Failed to read Gemini response: {}", e.without_url()))
            })?;

        metrics::counter!(
            "ripple_model_calls_total",
            "model" => self.config.model.clone(),
            "status" => status.as_u16().to_string()
        )
        .increment(1);

        if !status.is_success() {
            return Err(Error::model_provider(format!(
                "Gemini returned HTTP {}: {}",
                status,
                body.chars().take(300).collect::<String>()
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::model_provider(format!("Malformed Gemini response: {}", e)))
    }
}

/// Concatenated text parts of the first candidate.
pub fn extract_text(response: &Value) -> Result<String> {
    let parts = response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array);

    let text: String = parts
        .into_iter()
        .flatten()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();

    if text.trim().is_empty() {
        let reason = response
            .pointer("/candidates/0/finishReason")
            .or_else(|| response.pointer("/promptFeedback/blockReason"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        return Err(Error::model_provider(format!(
            "Gemini response carried no text (reason: {})",
            reason
        )));
    }
    Ok(text)
}

#[async_trait]
impl VisionModel for GeminiClient {
    async fn generate(&self, prompt: &str, image: &RgbImage) -> Result<String> {
        tracing::debug!(
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Calling vision model"
        );
        let image_b64 = codec::encode_rgb(image)?;
        let response = self.post(&self.vision_payload(prompt, &image_b64)).await?;
        extract_text(&response)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl ImageEditModel for GeminiClient {
    async fn edit(&self, prompt: &str, image: &RgbImage) -> Result<Value> {
        tracing::debug!(
            model = %self.config.model,
            prompt_len = prompt.len(),
            "Calling image edit model"
        );
        let image_b64 = codec::encode_rgb(image)?;
        self.post(&self.edit_payload(prompt, &image_b64)).await
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
