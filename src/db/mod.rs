//! Search history storage.
//!
//! History lives in process memory for the lifetime of the server. The store
//! is built once at startup and shared through application state.

use anyhow::Result;

use crate::models::{NewSearchHistory, SearchHistory};

pub mod repositories;

pub use repositories::history::MemStore;

#[async_trait::async_trait]
pub trait SearchHistoryStore: Send + Sync {
    /// Records a completed search and returns it with its assigned id and
    /// timestamp. Ids start at 1 and increase by one per record.
    async fn create_search_history(&self, search: NewSearchHistory) -> Result<SearchHistory>;

    /// Every recorded search, oldest first.
    async fn get_search_history(&self) -> Result<Vec<SearchHistory>>;

    /// Distinct search terms ordered by how often they were searched, most
    /// frequent first. Equal counts keep the order in which the terms were
    /// first searched.
    async fn popular_search_terms(&self, limit: usize) -> Result<Vec<String>>;
}
