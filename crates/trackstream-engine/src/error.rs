//! Error types for the engine binary.

use trackstream_core::config::ConfigError;
use trackstream_server::StartupError;

use crate::source::SourceError;

/// Top-level error for the engine binary.
///
/// Every variant is fatal and surfaces from `main` before or during
/// startup.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The path network could not be obtained.
    #[error("path source error: {source}")]
    Source {
        /// The underlying source error.
        #[from]
        source: SourceError,
    },

    /// The stream server failed to start.
    #[error("server error: {source}")]
    Server {
        /// The underlying startup error.
        #[from]
        source: StartupError,
    },
}
