pub mod config;
pub mod error;
pub mod generation;
pub mod logging;
pub mod transcript;

pub use config::{Config, ModelId, mask_api_key, resolve_api_key};
pub use error::{Error, Result};
pub use generation::{FALLBACK_REPLY, Generation, Outcome, StreamAccumulator, TurnPhase};
pub use logging::{LogFormat, LoggingConfig, init_logging};
pub use transcript::{Role, Transcript, Turn};
