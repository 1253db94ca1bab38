//! Provider selection and the stand-in used when no credential is set.

use async_trait::async_trait;
use image::RgbImage;
use serde_json::Value;
use std::sync::Arc;

use ripple_core::{
    config::ModelsConfig,
    traits::{ImageEditModel, VisionModel},
    Error, Result,
};

use crate::gemini::{GeminiClient, GeminiConfig};

/// Model that fails every call; the pipeline degrades to its defaults.
#[derive(Debug, Clone)]
pub struct UnconfiguredModel {
    reason: String,
}

impl UnconfiguredModel {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl VisionModel for UnconfiguredModel {
    async fn generate(&self, _prompt: &str, _image: &RgbImage) -> Result<String> {
        Err(Error::model_provider(self.reason.clone()))
    }

    fn model_name(&self) -> &str {
        "unconfigured"
    }
}

#[async_trait]
impl ImageEditModel for UnconfiguredModel {
    async fn edit(&self, _prompt: &str, _image: &RgbImage) -> Result<Value> {
        Err(Error::model_provider(self.reason.clone()))
    }

    fn model_name(&self) -> &str {
        "unconfigured"
    }
}

/// The two model collaborators used by the pipeline.
#[derive(Clone)]
pub struct ModelClients {
    pub vision: Arc<dyn VisionModel>,
    pub editor: Arc<dyn ImageEditModel>,
}

/// Build clients from configuration.
///
/// Without an API key both collaborators are [`UnconfiguredModel`]s.
pub fn create_clients(models: &ModelsConfig) -> ModelClients {
    match models.api_key.as_ref() {
        Some(key) => {
            tracing::info!(
                vision_model = %models.vision_model,
                image_model = %models.image_model,
                "Gemini model clients initialized"
            );
            ModelClients {
                vision: Arc::new(GeminiClient::new(GeminiConfig::vision(models), key.clone())),
                editor: Arc::new(GeminiClient::new(GeminiConfig::image_edit(models), key.clone())),
            }
        }
        None => {
            tracing::warn!("No model API key found. Set GOOGLE_API_KEY or GEMINI_API_KEY; detection, inference and editing will degrade");
            let stub = Arc::new(UnconfiguredModel::new("model API key not configured"));
            ModelClients {
                vision: stub.clone(),
                editor: stub,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    #[tokio::test]
    async fn test_unconfigured_clients_fail_calls() {
        let clients = create_clients(&ModelsConfig::default());
        assert_eq!(clients.vision.model_name(), "unconfigured");

        let img = RgbImage::new(2, 2);
        assert!(clients.vision.generate("p", &img).await.is_err());
        assert!(clients.editor.edit("p", &img).await.is_err());
    }

    #[test]
    fn test_configured_clients_use_model_names() {
        let mut models = ModelsConfig::default();
        models.api_key = Some(Secret::new("k".to_string()));
        let clients = create_clients(&models);
        assert_eq!(clients.vision.model_name(), "gemini-2.0-flash");
        assert_eq!(clients.editor.model_name(), "gemini-2.5-flash-image");
    }
}
