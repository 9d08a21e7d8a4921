//! The results region and the replace-then-bind step
//!
//! Everything that ends up in the results region goes through
//! [`ResultsRegion`]: markup is swapped wholesale, then chart requests are
//! bound against the placeholders that markup just created.

use crate::charts::{ChartInputs, ChartRequest, bind_charts};
use crate::dashboard::render_dashboard;
use maud::Markup;
use sentiment_core::ResultPayload;
use serde::Serialize;

/// A surface whose content is replaced as a whole
pub trait ResultsRegion {
    /// Replace the entire content of the region
    fn replace(&mut self, markup: String);

    /// Render a chart into a placeholder of the current content
    fn bind(&mut self, request: ChartRequest);
}

/// Markup plus the charts to draw into it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    /// Dashboard fragment
    pub markup: String,
    /// Chart requests, in draw order
    pub charts: Vec<ChartRequest>,
}

impl DashboardView {
    /// Render the dashboard for a payload and bind its charts
    #[must_use]
    pub fn from_payload(payload: &ResultPayload) -> Self {
        Self {
            markup: render_dashboard(payload).into_string(),
            charts: bind_charts(ChartInputs::from(payload)),
        }
    }

    /// Content-only view with no charts
    #[must_use]
    pub fn markup_only(markup: Markup) -> Self {
        Self {
            markup: markup.into_string(),
            charts: Vec::new(),
        }
    }

    /// Replace the region, then bind every chart
    pub fn apply<R: ResultsRegion + ?Sized>(self, region: &mut R) {
        region.replace(self.markup);
        for request in self.charts {
            region.bind(request);
        }
    }
}

/// In-memory results region
///
/// The server ships it to the browser as JSON, where `app.js` performs the
/// same replace-then-bind against the real document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegionSnapshot {
    /// Current content
    pub markup: String,
    /// Charts bound since the last replace
    pub charts: Vec<ChartRequest>,
    /// Number of replacements so far
    pub revision: u64,
}

impl ResultsRegion for RegionSnapshot {
    fn replace(&mut self, markup: String) {
        self.markup = markup;
        self.charts.clear();
        self.revision += 1;
    }

    fn bind(&mut self, request: ChartRequest) {
        self.charts.push(request);
    }
}
