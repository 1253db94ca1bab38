//! Inference stage: turn a clicked object into ranked intents.

use std::sync::Arc;
use std::time::Instant;

use image::RgbImage;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use ripple_core::{
    decoder,
    traits::VisionModel,
    types::{
        ActionKind, InfoData, Intent, IntentAction, NavigateData, SearchData, SearchResult,
    },
    Result,
};
use ripple_search::{gateway::marketplace_query, SearchGateway, MARKETPLACE_ENGINE, MARKETPLACE_SITE};

use crate::prompts;

/// Probability used when the model does not give one.
const DEFAULT_PROBABILITY: f32 = 0.5;

/// Engine reported for synthesized search actions.
const DEFAULT_SEARCH_ENGINE: &str = "google";

// Whole-word matches, singular or plural.
const PRODUCT_WORDS: &[&str] = &[
    "dress", "shirt", "t-shirt", "tshirt", "blouse", "skirt", "jacket", "coat", "sweater",
    "hoodie", "pants", "trousers", "jeans", "shorts", "suit", "shoe", "sneaker", "boot",
    "sandal", "heel", "hat", "cap", "scarf", "glove", "sock", "bag", "handbag", "backpack",
    "purse", "wallet", "belt", "tie", "watch", "necklace", "bracelet", "earring", "ring",
    "sunglasses", "glasses", "jewelry", "clothing", "apparel", "outfit", "uniform",
];

// Substring matches; these scripts have no word boundaries.
const PRODUCT_TERMS_ZH: &[&str] = &[
    "衣服", "上衣", "大衣", "风衣", "裙", "裤", "鞋", "靴", "帽", "背包", "手提包", "袜",
    "围巾", "手套", "外套", "夹克", "毛衣",
    "衬衫", "手表", "项链", "手链", "耳环", "戒指", "眼镜", "腰带", "领带", "钱包",
];

/// Whether a label names clothing or an accessory people shop for.
pub fn is_product(label: &str) -> bool {
    let lower = label.to_lowercase();
    if PRODUCT_TERMS_ZH.iter().any(|t| lower.contains(t)) {
        return true;
    }
    lower
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .filter(|w| !w.is_empty())
        .any(|word| {
            PRODUCT_WORDS.iter().any(|k| {
                word == *k
                    || word.strip_suffix('s') == Some(*k)
                    || word.strip_suffix("es") == Some(*k)
            })
        })
}

/// One intent as emitted by the model, before normalization.
///
/// Models are loose with types: numbers arrive as strings, strings as
/// null. Scalars are coerced and anything unusable reads as absent.
#[derive(Debug, Deserialize)]
struct RawIntent {
    #[serde(default, deserialize_with = "lenient_u32")]
    id: Option<u32>,
    #[serde(deserialize_with = "lenient_string")]
    label: String,
    #[serde(default, deserialize_with = "lenient_string")]
    emoji: String,
    #[serde(default, deserialize_with = "lenient_string")]
    description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    color: String,
    #[serde(default, deserialize_with = "lenient_f32")]
    probability: Option<f32>,
    #[serde(default, deserialize_with = "lenient_string")]
    action_type: String,
    #[serde(default, alias = "edit_prompt", deserialize_with = "lenient_string")]
    editor_prompt: String,
    #[serde(default, deserialize_with = "string_fields")]
    action_data: Map<String, Value>,
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => s,
        Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
        _ => String::new(),
    })
}

fn lenient_u32<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<u32>, D::Error> {
    let id = match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(id.and_then(|v| u32::try_from(v).ok()))
}

fn lenient_f32<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<f32>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_f64().map(|f| f as f32),
        Some(Value::String(s)) => s.trim().parse::<f32>().ok(),
        _ => None,
    })
}

// Only string values survive; null, nested or numeric entries count as missing.
fn string_fields<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Map<String, Value>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Object(map)) => map
            .into_iter()
            .filter(|(_, v)| v.is_string())
            .collect(),
        _ => Map::new(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IntentPayload {
    List(Vec<Value>),
    Wrapped {
        #[serde(alias = "actions")]
        intents: Vec<Value>,
    },
}

impl IntentPayload {
    /// Items that look like intents; malformed ones are skipped.
    fn into_items(self) -> Vec<RawIntent> {
        let items = match self {
            Self::List(items) | Self::Wrapped { intents: items } => items,
        };
        items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<RawIntent>(item) {
                Ok(raw) => Some(raw),
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping malformed intent from model");
                    None
                }
            })
            .collect()
    }
}

/// Facts about the click that normalization needs.
struct ClickContext<'a> {
    clicked_label: &'a str,
    is_product: bool,
    first_result: Option<&'a SearchResult>,
}

/// Synthesizes candidate actions for a clicked object.
pub struct IntentSynthesizer {
    model: Arc<dyn VisionModel>,
    search: SearchGateway,
    web_search_enabled: bool,
}

impl IntentSynthesizer {
    pub fn new(model: Arc<dyn VisionModel>, search: SearchGateway, web_search_enabled: bool) -> Self {
        Self {
            model,
            search,
            web_search_enabled,
        }
    }

    /// Ranked intents for `clicked_label`, in model order.
    ///
    /// Never fails; an unusable model response yields an empty list.
    pub async fn infer(
        &self,
        image: &RgbImage,
        clicked_label: &str,
        nearby_labels: &[String],
    ) -> Vec<Intent> {
        let start = Instant::now();
        let product = is_product(clicked_label);

        let (web_context, results) = if self.web_search_enabled {
            self.search
                .search_related_actions(clicked_label, nearby_labels, product)
                .await
        } else {
            (String::new(), Vec::new())
        };

        let prompt = prompts::intent_prompt(clicked_label, nearby_labels, &web_context, product);
        let ctx = ClickContext {
            clicked_label,
            is_product: product,
            first_result: results.first(),
        };

        match self.try_infer(&prompt, image, &ctx).await {
            Ok(intents) => {
                tracing::info!(
                    label = %clicked_label,
                    is_product = product,
                    web_results = results.len(),
                    intents = intents.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Intent inference completed"
                );
                metrics::counter!("ripple_stage_total", "stage" => "infer", "outcome" => "ok")
                    .increment(1);
                intents
            }
            Err(e) => {
                tracing::warn!(label = %clicked_label, error = %e, "Intent inference failed, returning no intents");
                metrics::counter!("ripple_stage_total", "stage" => "infer", "outcome" => "degraded")
                    .increment(1);
                metrics::counter!("ripple_degraded_total", "stage" => "infer").increment(1);
                Vec::new()
            }
        }
    }

    async fn try_infer(
        &self,
        prompt: &str,
        image: &RgbImage,
        ctx: &ClickContext<'_>,
    ) -> Result<Vec<Intent>> {
        let raw = self.model.generate(prompt, image).await?;
        let payload: IntentPayload = decoder::decode_json(&raw)?;

        let mut intents = payload
            .into_items()
            .into_iter()
            .enumerate()
            .map(|(index, item)| normalize(index, item, ctx))
            .collect::<Result<Vec<_>>>()?;

        if ctx.is_product && ctx.first_result.is_some() {
            let has_search = intents.iter().any(|i| i.kind() == ActionKind::Search);
            if !has_search {
                let id = intents.iter().map(|i| i.id).max().unwrap_or(0) + 1;
                intents.push(shopping_intent(id, ctx.clicked_label));
            }
        }
        Ok(intents)
    }
}

/// Resolve kind, fill defaults and back-fill action data.
fn normalize(index: usize, raw: RawIntent, ctx: &ClickContext<'_>) -> Result<Intent> {
    let editor_prompt = raw.editor_prompt.trim().to_string();
    let inferred = if editor_prompt.is_empty() {
        ActionKind::Info
    } else {
        ActionKind::Edit
    };

    let action_type = raw.action_type.trim();
    let mut kind = if action_type.is_empty() {
        inferred
    } else {
        action_type.parse::<ActionKind>().unwrap_or_else(|_| {
            tracing::debug!(action_type = %action_type, fallback = %inferred, "Unknown action type from model");
            inferred
        })
    };

    if kind == ActionKind::Edit && editor_prompt.is_empty() {
        tracing::debug!(label = %raw.label, "Edit intent without prompt, showing as info");
        kind = ActionKind::Info;
    }

    let action = match IntentAction::from_data(kind, editor_prompt, raw.action_data)? {
        IntentAction::Info(mut info) => {
            if info.info_text.trim().is_empty() {
                info = backfill_info(ctx, &raw.description, info);
            }
            IntentAction::Info(info)
        }
        IntentAction::Navigate(mut nav) => {
            if nav.url.trim().is_empty() {
                nav = backfill_navigate(ctx, nav);
            }
            IntentAction::Navigate(nav)
        }
        IntentAction::Search(mut search) => {
            if search.search_query.trim().is_empty() {
                search = backfill_search(ctx, search);
            } else if search.search_engine.trim().is_empty() {
                search.search_engine = DEFAULT_SEARCH_ENGINE.to_string();
            }
            IntentAction::Search(search)
        }
        edit => edit,
    };

    let id = raw
        .id
        .unwrap_or_else(|| u32::try_from(index + 1).unwrap_or(u32::MAX));
    let probability = raw
        .probability
        .filter(|p| p.is_finite())
        .unwrap_or(DEFAULT_PROBABILITY)
        .clamp(0.0, 1.0);

    Ok(Intent {
        id,
        label: raw.label.trim().to_string(),
        emoji: or_default(raw.emoji, kind.default_emoji()),
        description: raw.description,
        color: or_default(raw.color, kind.default_color()),
        probability,
        action,
    })
}

fn backfill_info(ctx: &ClickContext<'_>, description: &str, info: InfoData) -> InfoData {
    match ctx.first_result {
        Some(first) => InfoData {
            info_text: first.snippet.clone(),
            source_url: if info.source_url.is_empty() {
                first.link.clone()
            } else {
                info.source_url
            },
        },
        None => InfoData {
            info_text: description.to_string(),
            source_url: info.source_url,
        },
    }
}

fn backfill_navigate(ctx: &ClickContext<'_>, nav: NavigateData) -> NavigateData {
    match ctx.first_result {
        Some(first) => NavigateData {
            url: first.link.clone(),
            title: if nav.title.is_empty() {
                first.title.clone()
            } else {
                nav.title
            },
        },
        None => nav,
    }
}

fn backfill_search(ctx: &ClickContext<'_>, search: SearchData) -> SearchData {
    if ctx.is_product {
        return marketplace_search(ctx.clicked_label);
    }
    let search_query = match ctx.first_result {
        Some(first) if !first.title.trim().is_empty() => first.title.clone(),
        _ => ctx.clicked_label.to_string(),
    };
    let search_engine = if search.search_engine.trim().is_empty() {
        DEFAULT_SEARCH_ENGINE.to_string()
    } else {
        search.search_engine
    };
    SearchData {
        search_query,
        search_engine,
    }
}

fn marketplace_search(clicked_label: &str) -> SearchData {
    SearchData {
        search_query: marketplace_query(clicked_label),
        search_engine: MARKETPLACE_ENGINE.to_string(),
    }
}

/// Marketplace search offered for products the model gave no search for.
fn shopping_intent(id: u32, clicked_label: &str) -> Intent {
    Intent {
        id,
        label: "Shop similar".to_string(),
        emoji: "🛒".to_string(),
        description: format!("Find {} on {}", clicked_label, MARKETPLACE_SITE.trim_start_matches("site:")),
        color: ActionKind::Search.default_color().to_string(),
        probability: DEFAULT_PROBABILITY,
        action: IntentAction::Search(marketplace_search(clicked_label)),
    }
}

fn or_default(value: String, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value
    }
}
