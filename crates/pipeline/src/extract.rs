//! Locating the edited image inside an image model response.
//!
//! Providers have shipped the image under several shapes. Each shape is
//! one [`EditExtractor`]; [`extract_edited_image`] tries them in
//! [`EditExtractor::CHAIN`] order and takes the first decodable image.

use std::fmt;

use image::RgbImage;
use serde_json::{Map, Value};

use ripple_core::codec::{self, ProviderImage};

/// Keys that may hold image data under a part's `image` accessor.
const IMAGE_KEYS: &[&str] = &["imageBytes", "image_bytes", "data", "bytes"];

/// Keys that may hold image data under a part's inline payload.
const INLINE_KEYS: &[&str] = &["data", "bytes", "raw_data", "rawData"];

/// Result of one extraction strategy.
#[derive(Debug)]
pub enum Extraction {
    Found(RgbImage),
    NotApplicable,
}

/// One strategy for finding image bytes in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditExtractor {
    /// `parts[].image` on the top-level response.
    PartImage,
    /// `parts[].inlineData` / `parts[].inline_data` on the top-level response.
    PartInlineData,
    /// `image` accessor on `candidates[0].content.parts[]`.
    CandidateImage,
    /// Inline payload on `candidates[0].content.parts[]`.
    CandidateInlineData,
}

impl EditExtractor {
    pub const CHAIN: [EditExtractor; 4] = [
        Self::PartImage,
        Self::PartInlineData,
        Self::CandidateImage,
        Self::CandidateInlineData,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::PartImage => "part_image",
            Self::PartInlineData => "part_inline_data",
            Self::CandidateImage => "candidate_image",
            Self::CandidateInlineData => "candidate_inline_data",
        }
    }

    /// Apply this strategy to `response`.
    pub fn extract(&self, response: &Value) -> Extraction {
        let parts = match self {
            Self::PartImage | Self::PartInlineData => top_level_parts(response),
            Self::CandidateImage | Self::CandidateInlineData => candidate_parts(response),
        };

        for part in parts {
            let payload = match self {
                Self::PartImage | Self::CandidateImage => image_accessor(part),
                Self::PartInlineData | Self::CandidateInlineData => inline_payload(part),
            };
            let Some(payload) = payload else { continue };

            match codec::to_rgb(payload.into()) {
                Ok(image) => return Extraction::Found(image),
                Err(e) => {
                    tracing::debug!(extractor = self.name(), error = %e, "Image payload did not decode");
                }
            }
        }
        Extraction::NotApplicable
    }
}

/// Why no edited image could be taken from a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditFallback {
    /// The response carried nothing, usually a safety block.
    NoCandidates { block_reason: Option<String> },
    /// Content was present but no extractor found an image in it.
    NoImageData,
}

impl fmt::Display for EditFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCandidates {
                block_reason: Some(reason),
            } => write!(f, "no candidates (blocked: {})", reason),
            Self::NoCandidates { block_reason: None } => f.write_str("no candidates"),
            Self::NoImageData => f.write_str("no image data in response"),
        }
    }
}

/// First image found by the extractor chain.
pub fn extract_edited_image(response: &Value) -> Result<RgbImage, EditFallback> {
    for text in top_level_parts(response)
        .iter()
        .chain(candidate_parts(response))
        .filter_map(|p| p.get("text").and_then(Value::as_str))
    {
        tracing::debug!(text = %text.chars().take(200).collect::<String>(), "Edit model returned text");
    }

    if top_level_parts(response).is_empty() && !has_candidates(response) {
        let block_reason = response
            .pointer("/promptFeedback/blockReason")
            .and_then(Value::as_str)
            .map(str::to_string);
        return Err(EditFallback::NoCandidates { block_reason });
    }

    for extractor in EditExtractor::CHAIN {
        if let Extraction::Found(image) = extractor.extract(response) {
            tracing::debug!(
                extractor = extractor.name(),
                width = image.width(),
                height = image.height(),
                "Extracted edited image"
            );
            return Ok(image);
        }
    }
    Err(EditFallback::NoImageData)
}

fn has_candidates(response: &Value) -> bool {
    response
        .get("candidates")
        .and_then(Value::as_array)
        .is_some_and(|c| !c.is_empty())
}

fn top_level_parts(response: &Value) -> &[Value] {
    response
        .get("parts")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn candidate_parts(response: &Value) -> &[Value] {
    response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn image_accessor(part: &Value) -> Option<ProviderImage> {
    match part.get("image")? {
        Value::String(text) if !text.trim().is_empty() => Some(ProviderImage {
            base64: Some(text.clone()),
            ..Default::default()
        }),
        Value::Object(obj) => payload_from(obj, IMAGE_KEYS),
        _ => None,
    }
}

fn inline_payload(part: &Value) -> Option<ProviderImage> {
    let obj = part
        .get("inlineData")
        .or_else(|| part.get("inline_data"))?
        .as_object()?;
    payload_from(obj, INLINE_KEYS)
}

fn payload_from(obj: &Map<String, Value>, keys: &[&str]) -> Option<ProviderImage> {
    let mime_type = obj
        .get("mimeType")
        .or_else(|| obj.get("mime_type"))
        .and_then(Value::as_str)
        .map(str::to_string);
    if mime_type.as_deref().is_some_and(|m| !m.starts_with("image/")) {
        return None;
    }

    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(text) if !text.trim().is_empty() => Some(ProviderImage {
            mime_type: mime_type.clone(),
            base64: Some(text.clone()),
            bytes: None,
        }),
        Value::Array(items) => byte_array(items).map(|bytes| ProviderImage {
            mime_type: mime_type.clone(),
            base64: None,
            bytes: Some(bytes),
        }),
        _ => None,
    })
}

fn byte_array(items: &[Value]) -> Option<Vec<u8>> {
    if items.is_empty() {
        return None;
    }
    items
        .iter()
        .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
        .collect()
}
