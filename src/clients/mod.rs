pub mod api_log;
pub mod gemini;
pub mod http;

pub use api_log::{ApiLogSink, FileApiLog, MemoryApiLog, NullApiLog, open_api_log};
pub use gemini::GeminiClient;
pub use http::{HttpClient, HttpClientConfig, HttpError, ReqwestTransport, Transport};
