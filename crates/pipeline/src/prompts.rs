//! Prompt templates for the vision and image edit models.

use ripple_core::types::NormalizedRect;

/// Object detection prompt. Coordinates come back normalized to 0-1000.
pub const DETECTION_PROMPT: &str = r#"Detect all significant interactable objects in this image.
Return a JSON list. Each entry MUST follow this format:
{
    "label": "Short object name (e.g. Vending Machine)",
    "box_2d": [ymin, xmin, ymax, xmax]
}
Coordinates are normalized to 0-1000.
Focus on: furniture, appliances, people, clothing, signs, vehicles.
Limit to the 10 most prominent objects.
Do not return segmentation masks."#;

/// Prompt asking for 4-6 actions on the clicked object.
pub fn intent_prompt(
    clicked_label: &str,
    nearby_labels: &[String],
    web_context: &str,
    is_product: bool,
) -> String {
    let nearby = if nearby_labels.is_empty() {
        "none".to_string()
    } else {
        nearby_labels.join(", ")
    };

    let mut prompt = format!(
        "The user clicked on a '{clicked_label}' in the image.\n\
         Other objects in the scene: {nearby}.\n\n\
         First think about why someone would click this object: what they might \
         want to learn, where they might want to go, what they might want to find, \
         and how they might want to change it in the picture.\n\
         Then propose between 4 and 6 distinct actions.\n\n"
    );

    if !web_context.is_empty() {
        prompt.push_str(web_context);
        prompt.push_str(
            "Prefer grounding info, navigate and search actions in the resources above, \
             using their real links.\n\n",
        );
    }

    if is_product {
        prompt.push_str(
            "This object looks like something people buy. Include at least one \
             shopping action of type \"search\".\n\n",
        );
    }

    prompt.push_str(
        r##"Each action has an action_type:
- "edit": change the object in the image; set editor_prompt to an instruction for an image editing model
- "info": show a short fact; action_data = {"info_text": "...", "source_url": "..."}
- "navigate": open a web page; action_data = {"url": "...", "title": "..."}
- "search": run a web search; action_data = {"search_query": "...", "search_engine": "google"}

Return a JSON list only:
[
    {
        "id": 1,
        "label": "Short button text",
        "emoji": "Icon",
        "description": "Tooltip text",
        "color": "#RRGGBB",
        "probability": 0.8,
        "action_type": "edit",
        "editor_prompt": "",
        "action_data": {}
    }
]"##,
    );
    prompt
}

/// Region-scoped instruction for the image edit model.
pub fn edit_prompt(region: &NormalizedRect, prompt: &str) -> String {
    format!(
        "Using the provided image, edit only the region at coordinates ({:.2}, {:.2}) to ({:.2}, {:.2}).\n\n\
         {}\n\n\
         Keep the rest of the image unchanged. Return the edited image.",
        region.x0,
        region.y0,
        region.x1,
        region.y1,
        prompt.trim()
    )
}
