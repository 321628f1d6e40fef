pub mod attrs;
pub mod config;
pub mod context;
pub mod error;
pub mod types;

pub use attrs::{AttributeMap, CopyPolicy};
pub use config::Config;
pub use context::RunContext;
pub use error::SyncError;
pub use types::*;
