#![deny(unused)]
//! The click-to-action pipeline.
//!
//! Three stages, each turning untrusted model output into typed values
//! and degrading to a safe default when a collaborator misbehaves:
//! - [`SceneAnalyzer`]: image → detected objects
//! - [`IntentSynthesizer`]: clicked object → ranked intents
//! - [`ActionExecutor`]: chosen intent → outcome

pub mod executor;
pub mod extract;
pub mod intent;
pub mod prompts;
pub mod scene;

use std::sync::Arc;

use ripple_core::{
    config::SearchConfig,
    traits::{ImageEditModel, VisionModel},
};
use ripple_search::SearchGateway;

pub use executor::{ActionExecutor, SEARCH_RESULT_LIMIT};
pub use extract::{extract_edited_image, EditExtractor, EditFallback, Extraction};
pub use intent::{is_product, IntentSynthesizer};
pub use scene::SceneAnalyzer;

/// Knobs shared by the stages.
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Inject web results into intent inference.
    pub web_search_enabled: bool,
    /// Results returned by a `search` action.
    pub search_result_limit: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            web_search_enabled: true,
            search_result_limit: SEARCH_RESULT_LIMIT,
        }
    }
}

impl PipelineOptions {
    /// Options for a gateway built from `config`.
    ///
    /// `search.enabled` only gates enrichment; `search` actions run
    /// whenever the gateway has a provider.
    pub fn from_config(config: &SearchConfig, search: &SearchGateway) -> Self {
        Self {
            web_search_enabled: config.enabled && search.is_configured(),
            search_result_limit: config.result_count.max(1),
        }
    }
}

/// All three stages wired to the same collaborators.
#[derive(Clone)]
pub struct Pipeline {
    pub scene: Arc<SceneAnalyzer>,
    pub intents: Arc<IntentSynthesizer>,
    pub executor: Arc<ActionExecutor>,
}

impl Pipeline {
    pub fn new(
        vision: Arc<dyn VisionModel>,
        editor: Arc<dyn ImageEditModel>,
        search: SearchGateway,
        options: PipelineOptions,
    ) -> Self {
        Self {
            scene: Arc::new(SceneAnalyzer::new(vision.clone())),
            intents: Arc::new(IntentSynthesizer::new(
                vision,
                search.clone(),
                options.web_search_enabled,
            )),
            executor: Arc::new(
                ActionExecutor::new(editor, search).with_result_limit(options.search_result_limit),
            ),
        }
    }
}
