//! Sentiment dashboard web interface
//!
//! Serves the upload page, forwards spreadsheets to the analysis backend and
//! turns its aggregates into a dashboard with Plotly charts and a word cloud.
//!
//! The pipeline for one upload:
//!
//! 1. [`controller::UploadController`] sends the file through an
//!    [`api_client::AnalyzeClient`].
//! 2. [`dashboard::render_dashboard`] builds the markup with empty chart
//!    placeholders.
//! 3. [`charts::bind_charts`] produces the chart requests for those
//!    placeholders.
//! 4. [`view::DashboardView::apply`] replaces the results region and binds
//!    the charts, in that order.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod api_client;
pub mod charts;
pub mod controller;
pub mod dashboard;
pub mod handlers;
pub mod help;
pub mod report;
pub mod routes;
pub mod server;
pub mod state;
pub mod view;

// Re-export the main entry points
pub use api_client::{AnalyzeClient, ClientError, HttpAnalyzeClient, Upload};
pub use controller::{SubmitOutcome, UploadController, UploadState};
pub use server::build_app;
pub use state::AppState;
pub use view::{DashboardView, RegionSnapshot, ResultsRegion};
