pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;
pub mod web;

// Re-export commonly used items
pub use config::Config;
pub use error::{GatewayError, Result};
pub use models::cache::{CacheStore, MemoryCache};
pub use services::leads_service::LeadsService;
pub use web::{router, AppState};
