pub mod config;
pub mod error;
pub mod logging;
pub mod result;

pub use config::EngineConfig;
pub use error::BoardError;
pub use logging::{init_tracing, LogEntry, Loggable, Severity};
pub use result::BoardResult;
