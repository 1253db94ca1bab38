use serde::{Deserialize, Serialize};

/// A single ranked web search hit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    /// Page title.
    pub title: String,
    /// Target URL.
    pub link: String,
    /// Short text excerpt.
    pub snippet: String,
}
