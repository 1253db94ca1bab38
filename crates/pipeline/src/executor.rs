//! Execution stage: carry out a chosen intent.

use std::sync::Arc;
use std::time::Instant;

use ripple_core::{
    traits::{ImageEditModel, SessionHandle},
    types::{ActionOutcome, ActionRequest, EditRequest, Session},
    Error, Result,
};
use ripple_search::{gateway::is_marketplace_engine, SearchGateway};

use crate::extract::extract_edited_image;
use crate::prompts;

/// Results returned by a `search` action by default.
pub const SEARCH_RESULT_LIMIT: usize = 5;

/// Dispatches an [`ActionRequest`] by kind.
pub struct ActionExecutor {
    editor: Arc<dyn ImageEditModel>,
    search: SearchGateway,
    result_limit: usize,
}

impl ActionExecutor {
    pub fn new(editor: Arc<dyn ImageEditModel>, search: SearchGateway) -> Self {
        Self {
            editor,
            search,
            result_limit: SEARCH_RESULT_LIMIT,
        }
    }

    pub fn with_result_limit(mut self, limit: usize) -> Self {
        self.result_limit = limit.max(1);
        self
    }

    /// Execute `request` against `session`.
    ///
    /// Only edits need a session; they hold its lock until the edit model
    /// answers so edits on one session apply in order. A failed edit is
    /// not an error: the outcome carries the unchanged image.
    pub async fn execute(
        &self,
        session: Option<&SessionHandle>,
        request: ActionRequest,
    ) -> Result<ActionOutcome> {
        let kind = request.kind();
        let start = Instant::now();

        let outcome = match request {
            ActionRequest::Edit(edit) => {
                if edit.prompt.trim().is_empty() {
                    return Err(Error::invalid_request("edit requires a prompt"));
                }
                let handle = session.ok_or_else(|| {
                    Error::missing_precondition("No image loaded. Upload an image first.")
                })?;
                let mut session = handle.lock().await;
                self.edit(&mut session, edit).await
            }
            ActionRequest::Info(data) => ActionOutcome::Info(data),
            ActionRequest::Navigate(data) => {
                if data.url.trim().is_empty() {
                    return Err(Error::invalid_request("navigate requires action_data.url"));
                }
                ActionOutcome::Navigate(data)
            }
            ActionRequest::Search(data) => {
                let query = data.search_query.trim().to_string();
                let results = if query.is_empty() {
                    Vec::new()
                } else if is_marketplace_engine(&data.search_engine) {
                    self.search.search_marketplace(&query, self.result_limit).await
                } else {
                    self.search.search(&query, self.result_limit).await
                };
                ActionOutcome::Search { query, results }
            }
        };

        tracing::info!(
            action_type = %kind,
            duration_ms = start.elapsed().as_millis() as u64,
            "Action executed"
        );
        metrics::counter!("ripple_stage_total", "stage" => "execute", "outcome" => "ok").increment(1);
        Ok(outcome)
    }

    async fn edit(&self, session: &mut Session, request: EditRequest) -> ActionOutcome {
        if !request.enable_edit {
            tracing::info!(session_id = %session.id, "Image editing disabled, returning original image");
            return ActionOutcome::Edited {
                image: session.image.clone(),
                applied: false,
            };
        }

        let (width, height) = session.dimensions();
        let region = request.region.clamped(width, height).normalized(width, height);
        let prompt = prompts::edit_prompt(&region, &request.prompt);

        tracing::debug!(
            session_id = %session.id,
            model = self.editor.model_name(),
            region = ?request.region,
            "Requesting image edit"
        );

        let edited = match self.editor.edit(&prompt, &session.image).await {
            Ok(response) => extract_edited_image(&response).map_err(|f| f.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match edited {
            Ok(image) => {
                session.replace_image(image.clone());
                ActionOutcome::Edited {
                    image,
                    applied: true,
                }
            }
            Err(reason) => {
                tracing::warn!(session_id = %session.id, reason = %reason, "Image edit degraded, keeping original image");
                metrics::counter!("ripple_degraded_total", "stage" => "execute").increment(1);
                ActionOutcome::Edited {
                    image: session.image.clone(),
                    applied: false,
                }
            }
        }
    }
}
