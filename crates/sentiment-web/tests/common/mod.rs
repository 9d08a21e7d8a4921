//! Shared fixtures for the integration tests

#![allow(dead_code, clippy::unwrap_used, missing_docs, unreachable_pub)]

use async_trait::async_trait;
use sentiment_web::api_client::{AnalyzeClient, AnalyzeResponse, ClientError, Upload};
use sentiment_core::ResultPayload;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A backend answer covering every dashboard section
pub fn sample_data() -> Value {
    json!({
        "sentiment_counts": {"positivo": 12, "negativo": 5, "neutro": 8},
        "sentiment_month": [
            {"YearMonth": "2024-01", "Sentimiento": "positivo", "Conteo": 7},
            {"YearMonth": "2024-01", "Sentimiento": "negativo", "Conteo": 2},
            {"YearMonth": "2024-02", "Sentimiento": "positivo", "Conteo": 5},
            {"YearMonth": "2024-02", "Sentimiento": "neutro", "Conteo": 8}
        ],
        "sentimiento_tipo_cuenta": {
            "General": {"positivo": 10, "negativo": 4, "neutro": 6},
            "Bots": {"negativo": 1}
        },
        "top_words": [["elecciones", 14], ["gobierno", 9], ["país", 3]],
        "top_users": [
            {"Name": "Diario Uno", "Handle": "@diariouno", "Interacciones y Audiencia": 9120},
            {"Name": "Ana", "Handle": "@ana", "Interacciones y Audiencia": 410}
        ],
        "total_retweets": 320,
        "total_likes": 1500,
        "total_views": 98000,
        "total_comments": 75,
        "conteo_tipo_cuenta": {"General": 20, "Bots": 1},
        "post_max_interacciones": {
            "Name": "Diario Uno",
            "Handle": "@diariouno",
            "Retweets": 120,
            "Likes": 800,
            "Comments": 40,
            "Views": 50000,
            "Post Body": "Resultados de la encuesta",
            "Timestamp": "2024-02-10 09:30:00",
            "Sentimiento": "neutro"
        }
    })
}

/// The envelope the analysis backend wraps payloads in
pub fn backend_answer() -> Value {
    json!({
        "predicciones": ["positivo", "neutro"],
        "data": sample_data(),
        "columns": ["Name", "Handle", "Post Body"]
    })
}

/// Client that always answers with the same payload
pub struct FixedClient {
    pub calls: AtomicUsize,
    pub response: AnalyzeResponse,
}

impl FixedClient {
    pub fn payload() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            response: AnalyzeResponse::Payload(ResultPayload::from_value(&sample_data())),
        }
    }

    pub fn rejecting(message: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            response: AnalyzeResponse::Rejected(message.to_string()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalyzeClient for FixedClient {
    async fn analyze(&self, _upload: &Upload) -> Result<AnalyzeResponse, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

pub const BOUNDARY: &str = "sentimentboundary";

/// Multipart body with an optional file part and a token field
pub fn multipart_body(file: Option<(&str, &str)>, csrf: &str) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"csrfmiddlewaretoken\"\r\n\r\n{csrf}\r\n"
    );
    match file {
        Some((name, contents)) => body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: text/csv\r\n\r\n{contents}\r\n"
        )),
        None => body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"\"\r\nContent-Type: application/octet-stream\r\n\r\n\r\n"
        )),
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    body.into_bytes()
}
