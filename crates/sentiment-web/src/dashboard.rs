//! Dashboard markup
//!
//! Builds the results fragment from a normalized payload. Chart sections only
//! get empty placeholder containers; [`crate::charts`] fills them once the
//! fragment is in place.

use crate::charts::ChartTarget;
use maud::{Markup, html};
use sentiment_core::payload::display_or_blank;
use sentiment_core::{AccountType, ResultPayload, Scalar, TopPost, TopUser};

/// Render the full dashboard fragment
#[must_use]
pub fn render_dashboard(payload: &ResultPayload) -> Markup {
    html! {
        div class="parent" {
            (top_users_card(&payload.top_users))
            (general_stats_card(payload))
            (placeholder_card("div7", "Sentimiento por Tipo de Cuenta", ChartTarget::SentimentByTypeBar))
            (placeholder_card("div3", "Distribución de Sentimientos", ChartTarget::SentimentPie))
            div class="div4-row" {
                div class="div4 card" {
                    @if let Some(post) = &payload.post_max_interacciones {
                        (top_post_card(post))
                    }
                }
            }
            (placeholder_card("div6", "Sentimientos por Mes", ChartTarget::SentimentLine))
            div class="div8 card" {
                h3 { "Palabras más frecuentes" }
                div id=(ChartTarget::WordCloud.id()) class="word-cloud" {}
            }
        }
    }
}

fn top_users_card(users: &[TopUser]) -> Markup {
    html! {
        div class="div1 card" {
            h3 { "Top 10 Usuarios" br; "por Interacciones y Audiencia" }
            ul class="top-users" {
                @for user in users {
                    li {
                        span {
                            span class="user-handle" { (display_or_blank(user.name.as_ref())) }
                            " "
                            span class="user-at" { "(" (display_or_blank(user.handle.as_ref())) ")" }
                        }
                        span class="user-score" { (display_or_blank(user.score.as_ref())) }
                    }
                }
            }
        }
    }
}

fn stat_item(icon: &str, label: &str, value: &str) -> Markup {
    html! {
        li {
            i class={ "fa-solid " (icon) " stats-icon" } {}
            div {
                strong { (label) ":" }
                br;
                span class="stat-value" { (value) }
            }
        }
    }
}

const fn account_icon(account: AccountType) -> &'static str {
    match account {
        AccountType::Institucionales => "fa-landmark",
        AccountType::MediosDeComunicacion => "fa-bullhorn",
        AccountType::General => "fa-users",
        AccountType::Bots => "fa-robot",
    }
}

fn general_stats_card(payload: &ResultPayload) -> Markup {
    let totals: [(&str, &str, Option<&Scalar>); 4] = [
        ("fa-retweet", "Total Retweets", payload.total_retweets.as_ref()),
        ("fa-heart", "Total Likes", payload.total_likes.as_ref()),
        ("fa-eye", "Total Views", payload.total_views.as_ref()),
        ("fa-comments", "Total Comments", payload.total_comments.as_ref()),
    ];

    html! {
        div class="div2 card" {
            h3 { "Estadísticas Generales" }
            div class="stats-columns" {
                ul class="stats-list" {
                    @for (icon, label, value) in totals {
                        (stat_item(icon, label, &display_or_blank(value)))
                    }
                }
                ul class="stats-list" {
                    @for account in AccountType::ALL {
                        (stat_item(
                            account_icon(account),
                            account.label(),
                            &account.count_in(&payload.conteo_tipo_cuenta).to_string(),
                        ))
                    }
                }
            }
        }
    }
}

fn placeholder_card(slot: &str, title: &str, target: ChartTarget) -> Markup {
    html! {
        div class={ (slot) " card" } {
            h3 { (title) }
            div class="canvas-wrapper" {
                div id=(target.id()) {}
            }
        }
    }
}

fn top_post_card(post: &TopPost) -> Markup {
    let field = |value: &Option<Scalar>| display_or_blank(value.as_ref());

    html! {
        div class="top-post" {
            h3 { "Post con más Interacciones y Audiencia" }
            ul {
                li { strong { "Nombre:" } " " span class="post-name" { (field(&post.name)) } }
                li { strong { "Usuario:" } " " span class="post-handle" { (field(&post.handle)) } }
                li { strong { "Retweets:" } " " (field(&post.retweets)) }
                li { strong { "Likes:" } " " (field(&post.likes)) }
                li { strong { "Comments:" } " " (field(&post.comments)) }
                li { strong { "Views:" } " " (field(&post.views)) }
                li { strong { "Post:" } " " (field(&post.body)) }
                li { strong { "Fecha:" } " " (field(&post.timestamp)) }
                li { strong { "Sentimiento:" } " " (field(&post.sentiment)) }
            }
        }
    }
}
