pub mod config;
pub mod extraction;
pub mod models;
pub mod notifiers;
pub mod runner;
pub mod scraper;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use runner::{RunOutcome, RunReport, WatchRunner};
pub use utils::error::AppError;

pub type Result<T> = std::result::Result<T, AppError>;
