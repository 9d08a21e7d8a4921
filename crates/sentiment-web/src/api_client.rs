//! HTTP client for the sentiment analysis backend

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, multipart};
use sentiment_core::ResultPayload;
use sentiment_core::config::BackendConfig;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Header carrying the anti-forgery token
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Name of the multipart part holding the spreadsheet
pub const FILE_FIELD: &str = "file";

/// Errors that keep a usable answer from coming back
#[derive(Error, Debug)]
pub enum ClientError {
    /// The request could not be sent or the connection failed
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success status with no message in the body
    #[error("Backend returned status {status}")]
    Status {
        /// HTTP status
        status: StatusCode,
    },

    /// No answer within the request timeout
    #[error("Backend did not answer within {after:?}")]
    Timeout {
        /// Configured timeout
        after: Duration,
    },

    /// The body was not the JSON object we expect
    #[error("Invalid response from backend: {message}")]
    InvalidResponse {
        /// What was wrong with it
        message: String,
    },
}

/// What the backend said about an upload
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzeResponse {
    /// Aggregates for the uploaded file
    Payload(ResultPayload),
    /// The backend refused the file, with a message for the user
    Rejected(String),
}

/// A file selected for analysis, plus the form fields sent along with it
#[derive(Debug, Clone, Default)]
pub struct Upload {
    /// Original file name
    pub file_name: String,
    /// MIME type reported by the browser, if any
    pub content_type: Option<String>,
    /// File contents
    pub bytes: Bytes,
    /// Other form fields, in form order
    pub fields: Vec<(String, String)>,
    /// Anti-forgery token read from the form
    pub csrf_token: Option<String>,
}

impl Upload {
    /// Upload with no extra fields or token
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
            ..Self::default()
        }
    }

    /// Set the MIME type
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the anti-forgery token
    #[must_use]
    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }

    /// Add a form field
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }
}

/// Upload-and-analyze operation
#[async_trait]
pub trait AnalyzeClient: Send + Sync {
    /// Send a file for analysis
    ///
    /// # Errors
    ///
    /// Returns an error when no structured answer could be obtained.
    async fn analyze(&self, upload: &Upload) -> Result<AnalyzeResponse, ClientError>;
}

/// [`AnalyzeClient`] that posts multipart uploads over HTTP
#[derive(Debug, Clone)]
pub struct HttpAnalyzeClient {
    client: Client,
    endpoint: String,
}

impl HttpAnalyzeClient {
    /// Create a client for the configured backend
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint: config.url.clone(),
        })
    }

    /// Endpoint the uploads are posted to
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn form(upload: &Upload) -> Result<multipart::Form, ClientError> {
        let mut part =
            multipart::Part::bytes(upload.bytes.to_vec()).file_name(upload.file_name.clone());
        if let Some(content_type) = &upload.content_type {
            part = part.mime_str(content_type)?;
        }

        let form = upload
            .fields
            .iter()
            .fold(multipart::Form::new(), |form, (name, value)| {
                form.text(name.clone(), value.clone())
            });
        Ok(form.part(FILE_FIELD, part))
    }
}

#[async_trait]
impl AnalyzeClient for HttpAnalyzeClient {
    #[instrument(skip_all, fields(file = %upload.file_name, size = upload.bytes.len()))]
    async fn analyze(&self, upload: &Upload) -> Result<AnalyzeResponse, ClientError> {
        let mut request = self.client.post(&self.endpoint).multipart(Self::form(upload)?);
        if let Some(token) = &upload.csrf_token {
            request = request.header(CSRF_HEADER, token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(%status, bytes = body.len(), "analysis backend responded");

        classify(status, &body)
    }
}

/// Interpret a backend answer
///
/// The body is parsed as JSON whatever the status: an `error` or `detail`
/// message is a rejection, a successful object (optionally wrapped in
/// `data`) is a payload.
///
/// # Errors
///
/// Returns [`ClientError::InvalidResponse`] for non-JSON bodies and
/// [`ClientError::Status`] for failures that carry no message.
pub fn classify(status: StatusCode, body: &[u8]) -> Result<AnalyzeResponse, ClientError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        warn!(%status, error = %e, "backend response is not JSON");
        ClientError::InvalidResponse {
            message: e.to_string(),
        }
    })?;

    if let Some(message) = message_of(&value) {
        return Ok(AnalyzeResponse::Rejected(message.to_string()));
    }

    if !status.is_success() {
        return Err(ClientError::Status { status });
    }

    match &value {
        Value::Object(map) => {
            let data = map.get("data").filter(|d| d.is_object()).unwrap_or(&value);
            Ok(AnalyzeResponse::Payload(ResultPayload::from_value(data)))
        }
        _ => Err(ClientError::InvalidResponse {
            message: "expected a JSON object".to_string(),
        }),
    }
}

fn message_of(value: &Value) -> Option<&str> {
    ["error", "detail"]
        .into_iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sentiment_core::CountMap;

    fn payload_of(result: Result<AnalyzeResponse, ClientError>) -> ResultPayload {
        match result.unwrap() {
            AnalyzeResponse::Payload(payload) => payload,
            AnalyzeResponse::Rejected(message) => panic!("unexpected rejection: {message}"),
        }
    }

    #[test]
    fn test_error_field_is_a_rejection() {
        let result = classify(StatusCode::BAD_REQUEST, br#"{"error": "X"}"#).unwrap();
        assert_eq!(result, AnalyzeResponse::Rejected("X".to_string()));
    }

    #[test]
    fn test_error_field_wins_even_on_success() {
        let result = classify(StatusCode::OK, br#"{"error": "archivo sin filas", "data": {}}"#).unwrap();
        assert_eq!(result, AnalyzeResponse::Rejected("archivo sin filas".to_string()));
    }

    #[test]
    fn test_detail_field_is_a_rejection() {
        let result = classify(
            StatusCode::BAD_REQUEST,
            br#"{"detail": "No se pudo leer el archivo."}"#,
        )
        .unwrap();
        assert_eq!(
            result,
            AnalyzeResponse::Rejected("No se pudo leer el archivo.".to_string())
        );
    }

    #[test]
    fn test_data_envelope_is_unwrapped() {
        let payload = payload_of(classify(
            StatusCode::OK,
            br#"{"data": {"sentiment_counts": {"positivo": 2}}, "predicciones": ["positivo"]}"#,
        ));

        let expected: CountMap = [("positivo".to_string(), 2)].into_iter().collect();
        assert_eq!(payload.sentiment_counts, expected);
    }

    #[test]
    fn test_bare_payload_is_accepted() {
        let payload = payload_of(classify(StatusCode::OK, br#"{"total_likes": 7}"#));
        assert_eq!(payload.total_likes, Some(sentiment_core::Scalar::Int(7)));
    }

    #[test]
    fn test_failure_without_message_is_a_status_error() {
        let err = classify(StatusCode::BAD_GATEWAY, br#"{"detail": [{"loc": []}]}"#).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Status {
                status: StatusCode::BAD_GATEWAY
            }
        ));
    }

    #[test]
    fn test_non_json_is_invalid() {
        let err = classify(StatusCode::OK, b"<html>oops</html>").unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse { .. }));
    }

    #[test]
    fn test_non_object_success_is_invalid() {
        let err = classify(StatusCode::OK, b"[1, 2]").unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse { .. }));
    }

    #[test]
    fn test_upload_builder() {
        let upload = Upload::new("posts.csv", Bytes::from_static(b"a,b"))
            .with_content_type("text/csv")
            .with_csrf_token("tok")
            .with_field("periodo", "2024");

        assert_eq!(upload.file_name, "posts.csv");
        assert_eq!(upload.content_type.as_deref(), Some("text/csv"));
        assert_eq!(upload.csrf_token.as_deref(), Some("tok"));
        assert_eq!(upload.fields, vec![("periodo".to_string(), "2024".to_string())]);
        assert!(HttpAnalyzeClient::form(&upload).is_ok());
    }

    #[test]
    fn test_client_uses_configured_endpoint() {
        let client = HttpAnalyzeClient::new(&BackendConfig::default()).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8000/predict-file/");
    }
}
