//! Page and static asset handlers

use crate::{controller::FILE_PLACEHOLDER, help::HelpTopic, state::AppState};
use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use maud::{DOCTYPE, Markup, html};
use std::sync::Arc;
use tracing::debug;

/// Plotly bundle loaded by the page
pub const PLOTLY_SRC: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// wordcloud2.js bundle loaded by the page
pub const WORDCLOUD_SRC: &str = "https://cdnjs.cloudflare.com/ajax/libs/wordcloud2.js/1.2.2/wordcloud2.min.js";

/// Font Awesome stylesheet for the statistics icons
pub const ICONS_HREF: &str = "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.5.2/css/all.min.css";

/// Upload page
pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(upload_page(&state.csrf_token).into_string())
}

/// Render the upload page with the given anti-forgery token
#[must_use]
pub fn upload_page(csrf_token: &str) -> Markup {
    html! {
        (DOCTYPE)
        html lang="es" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "Análisis de Sentimiento" }
                link rel="stylesheet" href=(ICONS_HREF);
                link rel="stylesheet" href="/static/style.css";
                script src=(PLOTLY_SRC) {}
                script src=(WORDCLOUD_SRC) {}
            }
            body {
                main class="layout" {
                    section class="left-panel" {
                        h1 { "Análisis de Sentimiento" }
                        form class="upload-form" action="/upload" method="post" enctype="multipart/form-data" {
                            input type="hidden" name="csrfmiddlewaretoken" value=(csrf_token);
                            label for="file" class="file-drop" {
                                span id="file-label" { (FILE_PLACEHOLDER) }
                            }
                            input type="file" id="file" name="file" accept=".csv,.xlsx,.xls";
                            p id="error-msg" class="error-msg" hidden {}
                            button type="submit" class="submit-btn" { "Analizar" }
                            button type="button" id="cancel-btn" class="cancel-btn" hidden { "Cancelar" }
                        }
                        nav class="footer-links" {
                            @for topic in HelpTopic::ALL {
                                a href={ "/help/" (topic.slug()) } data-topic=(topic.slug()) {
                                    (topic.link_text())
                                }
                            }
                        }
                    }
                    section class="right-panel" {
                        div class="right-content" {
                            (HelpTopic::GettingStarted.render())
                        }
                    }
                }
                script src="/static/app.js" {}
            }
        }
    }
}

/// Help panel fragment
pub async fn help(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<String>,
) -> Response {
    let Some(topic) = HelpTopic::from_slug(&topic) else {
        debug!(%topic, "unknown help topic");
        return (StatusCode::NOT_FOUND, "Unknown help topic").into_response();
    };

    state.controller.show_help(topic);
    Html(topic.render().into_string()).into_response()
}

/// Browser-side applier and form wiring
pub async fn app_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        include_str!("../../static/app.js"),
    )
}

/// Page stylesheet
pub async fn style_css() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        include_str!("../../static/style.css"),
    )
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}
