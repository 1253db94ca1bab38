use image::RgbImage;
use serde_json::{Map, Value};

use crate::types::{ActionKind, BoundingBox, InfoData, NavigateData, SearchData, SearchResult};
use crate::{Error, Result};

// =============================================================================
// Execution Types (execution stage input/output)
// =============================================================================

/// Parameters of an image edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    /// Caller-supplied instruction for the editing model.
    pub prompt: String,
    /// Target region in pixel coordinates.
    pub region: BoundingBox,
    /// When false the original image is returned without a model call.
    pub enable_edit: bool,
}

/// A validated request to execute one intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    Edit(EditRequest),
    Info(InfoData),
    Navigate(NavigateData),
    Search(SearchData),
}

impl ActionRequest {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Edit(_) => ActionKind::Edit,
            Self::Info(_) => ActionKind::Info,
            Self::Navigate(_) => ActionKind::Navigate,
            Self::Search(_) => ActionKind::Search,
        }
    }

    /// Build a request from loosely-encoded form fields.
    ///
    /// `box_json` and `action_data` are JSON texts; failing to decode them
    /// is reported as [`Error::BadEncoding`], missing required fields as
    /// [`Error::InvalidRequest`].
    pub fn from_fields(
        action_type: &str,
        prompt: Option<&str>,
        box_json: Option<&str>,
        action_data: Option<&str>,
        enable_edit: bool,
    ) -> Result<Self> {
        let kind: ActionKind = action_type.parse()?;
        let data = action_data
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_action_data)
            .transpose()?;

        match kind {
            ActionKind::Edit => {
                let prompt = prompt
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| Error::invalid_request("edit requires a prompt"))?;
                let box_json = box_json
                    .map(str::trim)
                    .filter(|b| !b.is_empty())
                    .ok_or_else(|| Error::invalid_request("edit requires a box"))?;
                Ok(Self::Edit(EditRequest {
                    prompt: prompt.to_string(),
                    region: parse_box(box_json)?,
                    enable_edit,
                }))
            }
            ActionKind::Info => {
                let data = data.ok_or_else(|| Error::invalid_request("info requires action_data"))?;
                Ok(Self::Info(typed_data(data)?))
            }
            ActionKind::Navigate => {
                let nav: NavigateData = typed_data(data.unwrap_or_default())?;
                if nav.url.trim().is_empty() {
                    return Err(Error::invalid_request("navigate requires action_data.url"));
                }
                Ok(Self::Navigate(nav))
            }
            ActionKind::Search => Ok(Self::Search(typed_data(data.unwrap_or_default())?)),
        }
    }
}

/// Result of executing one intent.
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    /// The session image after the edit; the original when editing degraded.
    Edited { image: RgbImage, applied: bool },
    Info(InfoData),
    Navigate(NavigateData),
    Search {
        query: String,
        results: Vec<SearchResult>,
    },
}

impl ActionOutcome {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Edited { .. } => ActionKind::Edit,
            Self::Info(_) => ActionKind::Info,
            Self::Navigate(_) => ActionKind::Navigate,
            Self::Search { .. } => ActionKind::Search,
        }
    }
}

/// Parse a `[top, left, bottom, right]` JSON array.
pub fn parse_box(text: &str) -> Result<BoundingBox> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| Error::bad_encoding(format!("Invalid box_json format: {}", e)))?;
    let coords = value
        .as_array()
        .filter(|a| a.len() == 4)
        .ok_or_else(|| Error::bad_encoding("box must be an array of 4 integers"))?;

    let mut out = [0i64; 4];
    for (slot, v) in out.iter_mut().zip(coords) {
        *slot = v
            .as_i64()
            .or_else(|| v.as_f64().map(|f| f as i64))
            .ok_or_else(|| Error::bad_encoding("box coordinates must be numbers"))?;
    }
    Ok(BoundingBox::from(out))
}

fn parse_action_data(text: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::bad_encoding("action_data must be a JSON object")),
        Err(e) => Err(Error::bad_encoding(format!("Invalid action_data format: {}", e))),
    }
}

fn typed_data<T: serde::de::DeserializeOwned>(map: Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(map))
        .map_err(|e| Error::bad_encoding(format!("Invalid action_data fields: {}", e)))
}
