pub const USER_AGENT: &str = "Facebook-Ad-Library-Browser/1.0";

pub mod facebook {

    pub const GRAPH_BASE_URL: &str = "https://graph.facebook.com";

    pub const DEFAULT_API_VERSION: &str = "v18.0";

    pub const DEFAULT_PAGE_SIZE: u32 = 24;

    pub const MAX_PAGE_SIZE: u32 = 100;

    pub const MAX_RESULTS_CAP: u32 = 500;
}

pub mod cache {
    use std::time::Duration;

    pub const SEARCH_KEY_PREFIX: &str = "fb_ads:";

    pub const SEARCH_TTL: Duration = Duration::from_secs(60 * 60);

    pub const MAX_ENTRIES: u64 = 10_000;
}

pub mod http {

    pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

    pub const DEFAULT_MIN_REQUEST_INTERVAL_MS: u64 = 1_000;

    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    pub const BACKOFF_BASE_MS: u64 = 1_000;

    pub const BACKOFF_CAP_MS: u64 = 10_000;
}

pub mod categorization {

    pub const MAX_AD_CHARS: usize = 800;

    pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

    pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
}

pub mod limits {

    pub const DEFAULT_POPULAR_LIMIT: usize = 5;

    pub const MAX_POPULAR_LIMIT: usize = 50;
}
