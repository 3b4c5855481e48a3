pub mod ad;
pub mod category;
pub mod graph;
pub mod history;
pub mod search;

pub use ad::Ad;
pub use category::Category;
pub use graph::{FacebookApiResponse, Paging};
pub use history::{NewSearchHistory, SearchHistory};
pub use search::{ActiveStatus, AdType, MediaType, SearchParams, SearchType};
