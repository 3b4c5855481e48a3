pub mod ad_library_factory;
pub use ad_library_factory::{AdLibraryServiceFactory, ConfigError};

pub mod ad_library_service;
pub use ad_library_service::{
    AdLibraryError, AdLibraryService, ConnectionResponseData, ConnectionStatus,
};

pub mod ad_library_service_impl;
pub use ad_library_service_impl::{AdLibrarySettings, GraphAdLibraryService};

pub mod cache;
pub use cache::{CacheError, CacheService, MemoryCache};

pub mod categorization;
pub use categorization::{
    AdContent, CategorizationError, CategorizationService, TextGenerator,
};
