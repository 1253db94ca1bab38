//! Degrading front for the configured search provider.

use std::sync::Arc;

use ripple_core::{traits::SearchProvider, types::SearchResult};

/// Site qualifier used for shopping queries.
pub const MARKETPLACE_SITE: &str = "site:ebay.com";

/// `search_engine` value of actions that search the marketplace.
pub const MARKETPLACE_ENGINE: &str = "ebay";

/// Results requested when enriching intent inference.
const RELATED_RESULT_COUNT: usize = 5;

/// Search entry point used by the pipeline.
///
/// Never fails: an unconfigured or failing provider yields no results.
#[derive(Clone, Default)]
pub struct SearchGateway {
    provider: Option<Arc<dyn SearchProvider>>,
}

impl SearchGateway {
    pub fn new(provider: Option<Arc<dyn SearchProvider>>) -> Self {
        Self { provider }
    }

    /// Gateway with no provider; every search is empty.
    pub fn disabled() -> Self {
        Self { provider: None }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// Ranked results for `query`, empty when unavailable.
    pub async fn search(&self, query: &str, count: usize) -> Vec<SearchResult> {
        let Some(provider) = &self.provider else {
            tracing::debug!("No search provider configured, skipping web search");
            return Vec::new();
        };

        match provider.search(query, count).await {
            Ok(results) => {
                tracing::info!(
                    provider = provider.name(),
                    query = %query,
                    results = results.len(),
                    "Web search completed"
                );
                metrics::counter!("ripple_search_total", "outcome" => "ok").increment(1);
                results.into_iter().take(count).collect()
            }
            Err(e) => {
                tracing::warn!(provider = provider.name(), query = %query, error = %e, "Web search failed");
                metrics::counter!("ripple_search_total", "outcome" => "error").increment(1);
                Vec::new()
            }
        }
    }

    /// Search for resources related to a clicked object.
    ///
    /// Returns the results formatted for prompt injection together with the
    /// raw list; both are empty when nothing was found.
    pub async fn search_related_actions(
        &self,
        object_label: &str,
        context: &[String],
        is_product: bool,
    ) -> (String, Vec<SearchResult>) {
        let query = related_query(object_label, context, is_product);
        let results = self.search(&query, RELATED_RESULT_COUNT).await;
        if results.is_empty() {
            return (String::new(), results);
        }
        (format_results(&results), results)
    }

    /// Search restricted to the marketplace site.
    ///
    /// Queries already carrying the site qualifier are not qualified twice.
    pub async fn search_marketplace(&self, query: &str, count: usize) -> Vec<SearchResult> {
        self.search(&marketplace_query(query), count).await
    }
}

/// Query used to find actions for an object.
pub fn related_query(object_label: &str, context: &[String], is_product: bool) -> String {
    let mut query = if is_product {
        format!("{} buy purchase price", object_label)
    } else {
        format!("{} features how to use", object_label)
    };
    let extra: Vec<&str> = context
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .take(2)
        .collect();
    if !extra.is_empty() {
        query.push(' ');
        query.push_str(&extra.join(" "));
    }
    query
}

/// Qualify a query with the marketplace site.
pub fn marketplace_query(query: &str) -> String {
    let query = query.trim();
    if query.ends_with(MARKETPLACE_SITE) {
        return query.to_string();
    }
    format!("{} {}", query, MARKETPLACE_SITE)
}

/// Whether a `search_engine` value names the marketplace.
pub fn is_marketplace_engine(engine: &str) -> bool {
    engine.trim().eq_ignore_ascii_case(MARKETPLACE_ENGINE)
}

/// Numbered, human-readable rendering of results.
pub fn format_results(results: &[SearchResult]) -> String {
    let mut out = String::from("Related web resources:\n");
    for (i, r) in results.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, r.title));
        out.push_str(&format!("   {}\n", r.snippet));
        out.push_str(&format!("   Link: {}\n\n", r.link));
    }
    out
}
