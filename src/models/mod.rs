pub mod observation;
pub mod watch_item;

// Re-exports for convenience
pub use observation::*;
pub use watch_item::*;
