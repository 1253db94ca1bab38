use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::Error;

// =============================================================================
// Intent Types (inference stage output)
// =============================================================================

/// What executing an intent does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Edit,
    Info,
    Navigate,
    Search,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Info => "info",
            Self::Navigate => "navigate",
            Self::Search => "search",
        }
    }

    /// Menu color used when the model does not pick one.
    pub fn default_color(&self) -> &'static str {
        match self {
            Self::Navigate => "#22C55E",
            Self::Info => "#3B82F6",
            Self::Edit => "#F97316",
            Self::Search => "#A855F7",
        }
    }

    /// Menu icon used when the model does not pick one.
    pub fn default_emoji(&self) -> &'static str {
        match self {
            Self::Navigate => "🧭",
            Self::Info => "💡",
            Self::Edit => "🎨",
            Self::Search => "🔍",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "edit" => Ok(Self::Edit),
            "info" => Ok(Self::Info),
            "navigate" => Ok(Self::Navigate),
            "search" => Ok(Self::Search),
            other => Err(Error::unknown_action(other)),
        }
    }
}

/// Payload of an `info` action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoData {
    pub info_text: String,
    pub source_url: String,
}

/// Payload of a `navigate` action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigateData {
    pub url: String,
    pub title: String,
}

/// Payload of a `search` action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchData {
    pub search_query: String,
    pub search_engine: String,
}

/// Kind-specific part of an intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentAction {
    Edit { editor_prompt: String },
    Info(InfoData),
    Navigate(NavigateData),
    Search(SearchData),
}

impl IntentAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Edit { .. } => ActionKind::Edit,
            Self::Info(_) => ActionKind::Info,
            Self::Navigate(_) => ActionKind::Navigate,
            Self::Search(_) => ActionKind::Search,
        }
    }

    /// Build the payload for `kind` from a loosely-typed object.
    ///
    /// Keys not recognized for the kind are ignored; a recognized key
    /// with a non-string value is an encoding error.
    pub fn from_data(
        kind: ActionKind,
        editor_prompt: String,
        data: Map<String, Value>,
    ) -> crate::Result<Self> {
        let data = Value::Object(data);
        let action = match kind {
            ActionKind::Edit => Self::Edit { editor_prompt },
            ActionKind::Info => Self::Info(serde_json::from_value(data)?),
            ActionKind::Navigate => Self::Navigate(serde_json::from_value(data)?),
            ActionKind::Search => Self::Search(serde_json::from_value(data)?),
        };
        Ok(action)
    }

    fn data_map(&self) -> Map<String, Value> {
        let value = match self {
            Self::Edit { .. } => return Map::new(),
            Self::Info(d) => serde_json::to_value(d),
            Self::Navigate(d) => serde_json::to_value(d),
            Self::Search(d) => serde_json::to_value(d),
        };
        match value {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// A candidate user action for a clicked object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "IntentWire", try_from = "IntentWire")]
pub struct Intent {
    pub id: u32,
    pub label: String,
    pub emoji: String,
    pub description: String,
    pub color: String,
    /// Independent relevance score in `[0, 1]`.
    pub probability: f32,
    pub action: IntentAction,
}

impl Intent {
    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }
}

/// Flat JSON shape of an intent as exchanged with clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentWire {
    pub id: u32,
    pub label: String,
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub probability: f32,
    pub action_type: String,
    #[serde(default)]
    pub editor_prompt: String,
    #[serde(default)]
    pub action_data: Map<String, Value>,
}

impl From<Intent> for IntentWire {
    fn from(intent: Intent) -> Self {
        let action_data = intent.action.data_map();
        let action_type = intent.kind().as_str().to_string();
        let editor_prompt = match intent.action {
            IntentAction::Edit { editor_prompt } => editor_prompt,
            _ => String::new(),
        };
        Self {
            id: intent.id,
            label: intent.label,
            emoji: intent.emoji,
            description: intent.description,
            color: intent.color,
            probability: intent.probability,
            action_type,
            editor_prompt,
            action_data,
        }
    }
}

impl TryFrom<IntentWire> for Intent {
    type Error = Error;

    fn try_from(wire: IntentWire) -> Result<Self, Self::Error> {
        let kind: ActionKind = wire.action_type.parse()?;
        if kind == ActionKind::Edit && wire.editor_prompt.trim().is_empty() {
            return Err(Error::invalid_request("edit intent requires an editor_prompt"));
        }
        let action = IntentAction::from_data(kind, wire.editor_prompt, wire.action_data)?;
        Ok(Self {
            id: wire.id,
            label: wire.label,
            emoji: wire.emoji,
            description: wire.description,
            color: wire.color,
            probability: wire.probability.clamp(0.0, 1.0),
            action,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn navigate_intent() -> Intent {
        Intent {
            id: 2,
            label: "Open map".into(),
            emoji: "🧭".into(),
            description: "Find this place".into(),
            color: "#22C55E".into(),
            probability: 0.7,
            action: IntentAction::Navigate(NavigateData {
                url: "https://maps.example.com".into(),
                title: "Maps".into(),
            }),
        }
    }

    #[test]
    fn test_action_kind_parse() {
        assert_eq!(" Navigate ".parse::<ActionKind>().unwrap(), ActionKind::Navigate);
        let err = "teleport".parse::<ActionKind>().unwrap_err();
        assert!(matches!(err, Error::UnknownAction(k) if k == "teleport"));
    }

    #[test]
    fn test_wire_shape_carries_only_kind_keys() {
        let value = serde_json::to_value(navigate_intent()).unwrap();
        assert_eq!(value["action_type"], "navigate");
        assert_eq!(value["editor_prompt"], "");
        assert_eq!(value["action_data"]["url"], "https://maps.example.com");
        assert!(value["action_data"].get("search_query").is_none());
    }

    #[test]
    fn test_edit_intent_without_prompt_rejected() {
        let raw = json!({
            "id": 1, "label": "Recolor", "action_type": "edit", "editor_prompt": "  "
        });
        assert!(serde_json::from_value::<Intent>(raw).is_err());
    }

    #[test]
    fn test_non_string_payload_value_rejected() {
        let raw = json!({
            "id": 1, "label": "Go", "action_type": "navigate",
            "action_data": {"url": 42}
        });
        assert!(serde_json::from_value::<Intent>(raw).is_err());
    }

    #[test]
    fn test_probability_clamped() {
        let raw = json!({
            "id": 1, "label": "Read", "action_type": "info", "probability": 1.7
        });
        let intent: Intent = serde_json::from_value(raw).unwrap();
        assert_eq!(intent.probability, 1.0);
        assert_eq!(intent.action, IntentAction::Info(InfoData::default()));
    }
}
