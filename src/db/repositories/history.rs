use anyhow::Result;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::db::SearchHistoryStore;
use crate::models::{NewSearchHistory, SearchHistory};

struct Inner {
    searches: Vec<SearchHistory>,
    next_id: u64,
}

pub struct MemStore {
    inner: Mutex<Inner>,
}

impl Default for MemStore {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                searches: Vec::new(),
                next_id: 1,
            }),
        }
    }
}

impl MemStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl SearchHistoryStore for MemStore {
    async fn create_search_history(&self, search: NewSearchHistory) -> Result<SearchHistory> {
        let mut inner = self.lock();

        let record = SearchHistory {
            id: inner.next_id,
            params: search.params,
            timestamp: Utc::now(),
            result_count: search.result_count,
        };
        inner.next_id += 1;
        inner.searches.push(record.clone());

        Ok(record)
    }

    async fn get_search_history(&self) -> Result<Vec<SearchHistory>> {
        Ok(self.lock().searches.clone())
    }

    async fn popular_search_terms(&self, limit: usize) -> Result<Vec<String>> {
        let inner = self.lock();

        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
        for (position, search) in inner.searches.iter().enumerate() {
            counts
                .entry(search.params.search_terms.as_str())
                .or_insert((0, position))
                .0 += 1;
        }

        let mut ranked: Vec<(&str, usize, usize)> = counts
            .into_iter()
            .map(|(terms, (count, first_seen))| (terms, count, first_seen))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        Ok(ranked
            .into_iter()
            .take(limit)
            .map(|(terms, _, _)| terms.to_string())
            .collect())
    }
}
