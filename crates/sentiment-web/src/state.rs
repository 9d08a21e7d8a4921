//! Application state management

use crate::api_client::{AnalyzeClient, ClientError, HttpAnalyzeClient};
use crate::controller::UploadController;
use sentiment_core::Config;
use std::sync::Arc;
use uuid::Uuid;

/// Application state shared by every handler
#[derive(Debug)]
pub struct AppState {
    /// Application configuration
    pub config: Config,
    /// Submission lifecycle shared by all uploads
    pub controller: UploadController,
    /// Anti-forgery token embedded in the upload form
    pub csrf_token: String,
}

impl AppState {
    /// State backed by the configured HTTP backend
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self, ClientError> {
        let client = HttpAnalyzeClient::new(&config.backend)?;
        Ok(Self::with_client(config, Arc::new(client)))
    }

    /// State backed by any analysis client
    pub fn with_client(config: Config, client: Arc<dyn AnalyzeClient>) -> Self {
        let controller = UploadController::new(client, config.backend.request_timeout());
        Self {
            config,
            controller,
            csrf_token: Uuid::new_v4().simple().to_string(),
        }
    }
}
