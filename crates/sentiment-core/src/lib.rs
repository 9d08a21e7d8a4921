//! Core types and utilities for the sentiment dashboard
//!
//! - [`payload`]: the analysis result model and its normalization
//! - [`config`]: layered configuration (file + environment)
//! - [`error`]: error types shared by the workspace

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod config;
pub mod error;
pub mod payload;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use payload::{
    AccountType, CountMap, MonthlySentiment, ResultPayload, Scalar, Sentiment, TopPost, TopUser,
    WordFrequency,
};

/// Initialize the logging system
///
/// `RUST_LOG` takes precedence over the configured level.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(logging: &config::LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if logging.is_json() {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    result.map_err(|e| Error::Logging {
        message: e.to_string(),
    })
}
