//! Mock implementations of core traits for testing.
//!
//! Scripted collaborators that let every pipeline stage be exercised
//! without network access.

use async_trait::async_trait;
use image::RgbImage;
use serde_json::Value;
use std::sync::Mutex;

use crate::{
    traits::{ImageEditModel, SearchProvider, VisionModel},
    types::SearchResult,
    Error, Result,
};

// =============================================================================
// Mock Vision Model
// =============================================================================

/// Scripted vision model that returns predefined responses in order.
pub struct MockVisionModel {
    responses: Mutex<Vec<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl MockVisionModel {
    /// Create a mock with a queue of responses; the last one repeats.
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that always returns the same text.
    pub fn constant(response: &str) -> Self {
        Self::new(vec![response.to_string()])
    }

    /// Create a mock whose every call fails.
    pub fn failing(message: &str) -> Self {
        Self {
            responses: Mutex::new(vec![Err(Error::model_provider(message))]),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Number of calls made to this mock.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisionModel for MockVisionModel {
    async fn generate(&self, prompt: &str, _image: &RgbImage) -> Result<String> {
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(prompt.to_string());

        let responses = self.responses.lock().unwrap();
        let idx = (prompts.len() - 1).min(responses.len().saturating_sub(1));
        match responses.get(idx) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(e)) => Err(Error::model_provider(e.to_string())),
            None => Ok("[]".to_string()),
        }
    }

    fn model_name(&self) -> &str {
        "mock-vision"
    }
}

// =============================================================================
// Mock Image Edit Model
// =============================================================================

/// Image edit model returning a fixed provider response.
pub struct MockEditModel {
    response: std::result::Result<Value, String>,
    prompts: Mutex<Vec<String>>,
}

impl MockEditModel {
    pub fn new(response: Value) -> Self {
        Self {
            response: Ok(response),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageEditModel for MockEditModel {
    async fn edit(&self, prompt: &str, _image: &RgbImage) -> Result<Value> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.response.clone().map_err(Error::model_provider)
    }

    fn model_name(&self) -> &str {
        "mock-image-edit"
    }
}

// =============================================================================
// Mock Search Provider
// =============================================================================

/// Search provider returning canned results.
pub struct MockSearchProvider {
    results: Vec<SearchResult>,
    fail: bool,
    queries: Mutex<Vec<String>>,
}

impl MockSearchProvider {
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            results: Vec::new(),
            fail: true,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchResult>> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(Error::search("mock provider unavailable"));
        }
        Ok(self.results.iter().take(count).cloned().collect())
    }

    fn name(&self) -> &str {
        "mock-search"
    }
}

/// Build a result with predictable fields.
pub fn sample_result(n: usize) -> SearchResult {
    SearchResult {
        title: format!("Result {}", n),
        link: format!("https://example.com/{}", n),
        snippet: format!("Snippet {}", n),
    }
}
