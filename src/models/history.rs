use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::search::SearchParams;

/// A completed search. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHistory {
    pub id: u64,
    pub params: SearchParams,
    pub timestamp: DateTime<Utc>,
    pub result_count: usize,
}

#[derive(Debug, Clone)]
pub struct NewSearchHistory {
    pub params: SearchParams,
    pub result_count: usize,
}
