pub mod config;
pub mod engine;
pub mod error;
pub mod matchkey;
pub mod quota;

pub use config::{EngineConfig, TierPolicy, TierRegistry, UNLIMITED_THRESHOLD};
pub use engine::{Engine, SwipeReceipt};
pub use error::EngineError;
