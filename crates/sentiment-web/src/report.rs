//! Standalone HTML reports
//!
//! A report is a single document holding a rendered results region. The
//! region's markup is inlined as-is and its chart requests are embedded as
//! JSON for `app.js` to bind on load, so the file opens without the server.

use crate::api_client::{AnalyzeResponse, ClientError, classify};
use crate::handlers::pages::{ICONS_HREF, PLOTLY_SRC, WORDCLOUD_SRC};
use crate::view::{DashboardView, RegionSnapshot};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use reqwest::StatusCode;
use std::io::Write;

/// Global the applier script looks for on load
pub const REPORT_GLOBAL: &str = "__SENTIMENT_REPORT__";

const APPLIER: &str = include_str!("../static/app.js");
const STYLE: &str = include_str!("../static/style.css");

/// Render a saved backend answer, with or without its `data` envelope
///
/// # Errors
///
/// Returns an error if the bytes are not a JSON object or carry a backend
/// error message instead of a payload.
pub fn snapshot_from_saved(bytes: &[u8]) -> Result<RegionSnapshot, ClientError> {
    match classify(StatusCode::OK, bytes)? {
        AnalyzeResponse::Payload(payload) => {
            let mut region = RegionSnapshot::default();
            DashboardView::from_payload(&payload).apply(&mut region);
            Ok(region)
        }
        AnalyzeResponse::Rejected(message) => Err(ClientError::InvalidResponse { message }),
    }
}

/// Serialize chart requests for an inline `<script>`
///
/// `</` is escaped so payload text can never close the script element.
fn inline_json(snapshot: &RegionSnapshot) -> sentiment_core::Result<String> {
    let json = serde_json::to_string(&snapshot.charts)?;
    Ok(json.replace("</", r"<\/"))
}

/// Build the report document
///
/// # Errors
///
/// Returns an error if the chart requests cannot be serialized.
pub fn render_report(snapshot: &RegionSnapshot, title: &str) -> sentiment_core::Result<Markup> {
    let charts = inline_json(snapshot)?;

    Ok(html! {
        (DOCTYPE)
        html lang="es" {
            head {
                meta charset="utf-8";
                title { (title) }
                link rel="stylesheet" href=(ICONS_HREF);
                style { (PreEscaped(STYLE)) }
                script src=(PLOTLY_SRC) {}
                script src=(WORDCLOUD_SRC) {}
            }
            body class="report" {
                h1 { (title) }
                div class="right-content" {
                    (PreEscaped(&snapshot.markup))
                }
                script {
                    (PreEscaped(format!("window.{REPORT_GLOBAL} = {{\"charts\": {charts}}};")))
                }
                script { (PreEscaped(APPLIER)) }
            }
        }
    })
}

/// Write a report for `snapshot` to `writer`
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_report<W: Write>(
    writer: &mut W,
    snapshot: &RegionSnapshot,
    title: &str,
) -> sentiment_core::Result<()> {
    let document = render_report(snapshot, title)?;
    writer.write_all(document.into_string().as_bytes())?;
    writer.flush()?;
    Ok(())
}
