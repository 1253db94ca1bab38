//! Web search provider trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::SearchResult;

/// External search engine returning ranked snippets.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run `query`, returning at most `count` results in rank order.
    async fn search(&self, query: &str, count: usize) -> Result<Vec<SearchResult>>;

    /// Provider name, for logging.
    fn name(&self) -> &str;
}
