//! Result payload returned by the sentiment analysis backend
//!
//! The backend answers with a loosely structured JSON object in which every
//! field may be missing, `null`, or of an unexpected shape. [`ResultPayload::from_value`]
//! is the single normalization step: it never fails, fills every default, and
//! leaves downstream rendering code with a fully populated structure.
//!
//! Mappings keep the backend's key order, which is the order charts and
//! cards display them in.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, warn};

/// Count of posts per sentiment label, per account type, etc.
pub type CountMap = IndexMap<String, u64>;

/// A raw scalar value exactly as the backend sent it
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Integral number
    Int(i64),
    /// Non-integral (or out of `i64` range) number
    Float(f64),
    /// Text
    Text(String),
    /// Boolean
    Bool(bool),
}

impl Scalar {
    /// Convert a JSON value; arrays, objects and `null` have no scalar form
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Float(n) => serializer.serialize_f64(*n),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Bool(b) => serializer.serialize_bool(*b),
        }
    }
}

/// Deserialize any JSON value into an optional scalar without ever failing
fn lenient_scalar<'de, D>(deserializer: D) -> Result<Option<Scalar>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Scalar::from_json))
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    as_count(&value).ok_or_else(|| serde::de::Error::custom(format!("invalid count: {value}")))
}

/// Display an optional scalar, leaving absent values blank
#[must_use]
pub fn display_or_blank(value: Option<&Scalar>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}

/// The three canonical sentiment categories, in their fixed display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentiment {
    /// `positivo`
    Positivo,
    /// `negativo`
    Negativo,
    /// `neutro`
    Neutro,
}

impl Sentiment {
    /// Canonical order used by stacked charts
    pub const ALL: [Self; 3] = [Self::Positivo, Self::Negativo, Self::Neutro];

    /// Wire label as produced by the classifier
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positivo => "positivo",
            Self::Negativo => "negativo",
            Self::Neutro => "neutro",
        }
    }

    /// Match a free-form label, ignoring case
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four account types the dashboard reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountType {
    /// Government and institutional accounts
    Institucionales,
    /// Media outlets
    MediosDeComunicacion,
    /// Everyone else
    General,
    /// Automated accounts
    Bots,
}

impl AccountType {
    /// Display order on the dashboard
    pub const ALL: [Self; 4] = [
        Self::Institucionales,
        Self::MediosDeComunicacion,
        Self::General,
        Self::Bots,
    ];

    /// Key used by the backend
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Institucionales => "Institucionales",
            Self::MediosDeComunicacion => "Medios de Comunicación",
            Self::General => "General",
            Self::Bots => "Bots",
        }
    }

    /// Count for this account type, 0 when the key is absent
    #[must_use]
    pub fn count_in(self, counts: &CountMap) -> u64 {
        counts.get(self.label()).copied().unwrap_or(0)
    }
}

/// Posts per (month, sentiment) pair
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MonthlySentiment {
    /// Month bucket, e.g. `2024-01`
    #[serde(rename = "YearMonth")]
    pub year_month: String,
    /// Sentiment label
    #[serde(rename = "Sentimiento")]
    pub sentiment: String,
    /// Number of posts
    #[serde(rename = "Conteo", deserialize_with = "lenient_count")]
    pub count: u64,
}

/// A `[word, frequency]` pair from the word frequency table
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WordFrequency(pub String, pub f64);

impl WordFrequency {
    /// The word
    #[must_use]
    pub fn word(&self) -> &str {
        &self.0
    }

    /// How often it appeared
    #[must_use]
    pub const fn frequency(&self) -> f64 {
        self.1
    }
}

/// One entry of the top-users leaderboard
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TopUser {
    /// Display name
    #[serde(rename = "Name", default, deserialize_with = "lenient_scalar")]
    pub name: Option<Scalar>,
    /// Account handle
    #[serde(rename = "Handle", default, deserialize_with = "lenient_scalar")]
    pub handle: Option<Scalar>,
    /// Interaction and audience score
    #[serde(
        rename = "Interacciones y Audiencia",
        default,
        deserialize_with = "lenient_scalar"
    )]
    pub score: Option<Scalar>,
}

/// The single post with the most interactions and audience
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[allow(missing_docs)]
pub struct TopPost {
    #[serde(rename = "Name", default, deserialize_with = "lenient_scalar")]
    pub name: Option<Scalar>,
    #[serde(rename = "Handle", default, deserialize_with = "lenient_scalar")]
    pub handle: Option<Scalar>,
    #[serde(rename = "Retweets", default, deserialize_with = "lenient_scalar")]
    pub retweets: Option<Scalar>,
    #[serde(rename = "Likes", default, deserialize_with = "lenient_scalar")]
    pub likes: Option<Scalar>,
    #[serde(rename = "Comments", default, deserialize_with = "lenient_scalar")]
    pub comments: Option<Scalar>,
    #[serde(rename = "Views", default, deserialize_with = "lenient_scalar")]
    pub views: Option<Scalar>,
    #[serde(rename = "Post Body", default, deserialize_with = "lenient_scalar")]
    pub body: Option<Scalar>,
    #[serde(rename = "Timestamp", default, deserialize_with = "lenient_scalar")]
    pub timestamp: Option<Scalar>,
    #[serde(rename = "Sentimiento", default, deserialize_with = "lenient_scalar")]
    pub sentiment: Option<Scalar>,
}

/// Aggregate statistics for one analyzed file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultPayload {
    /// Posts per sentiment label
    pub sentiment_counts: CountMap,
    /// Posts per month and sentiment
    pub sentiment_month: Vec<MonthlySentiment>,
    /// Posts per account type, broken down by sentiment
    pub sentimiento_tipo_cuenta: IndexMap<String, CountMap>,
    /// Most frequent words
    pub top_words: Vec<WordFrequency>,
    /// Leaderboard, already sorted by the backend
    pub top_users: Vec<TopUser>,
    /// Sum of retweets
    pub total_retweets: Option<Scalar>,
    /// Sum of likes
    pub total_likes: Option<Scalar>,
    /// Sum of views
    pub total_views: Option<Scalar>,
    /// Sum of comments
    pub total_comments: Option<Scalar>,
    /// Accounts per account type
    pub conteo_tipo_cuenta: CountMap,
    /// Post with most interactions, if the backend could compute one
    pub post_max_interacciones: Option<TopPost>,
}

impl ResultPayload {
    /// Normalize an arbitrary JSON value into a fully defaulted payload
    ///
    /// Never fails: anything that is not an object yields the empty payload,
    /// and each field falls back to its empty default independently.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let Value::Object(map) = value else {
            warn!(kind = json_kind(value), "result payload is not an object");
            return Self::default();
        };

        let payload = Self {
            sentiment_counts: count_map(map, "sentiment_counts"),
            sentiment_month: rows(map, "sentiment_month"),
            sentimiento_tipo_cuenta: nested_count_map(map, "sentimiento_tipo_cuenta"),
            top_words: rows(map, "top_words"),
            top_users: rows(map, "top_users"),
            total_retweets: scalar(map, "total_retweets"),
            total_likes: scalar(map, "total_likes"),
            total_views: scalar(map, "total_views"),
            total_comments: scalar(map, "total_comments"),
            conteo_tipo_cuenta: count_map(map, "conteo_tipo_cuenta"),
            post_max_interacciones: post(map, "post_max_interacciones"),
        };

        debug!(
            sentiments = payload.sentiment_counts.len(),
            months = payload.sentiment_month.len(),
            words = payload.top_words.len(),
            users = payload.top_users.len(),
            empty = payload.is_empty(),
            "normalized result payload"
        );
        payload
    }

    /// Whether the payload carries nothing to show
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Field value, treating `null` the same as absent
fn present<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

fn as_count(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        // pandas occasionally hands back integral floats
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
            .map(|f| {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let n = f as u64;
                n
            })
    })
}

fn counts_of(object: &Map<String, Value>, key: &str) -> CountMap {
    object
        .iter()
        .filter_map(|(label, value)| {
            let count = as_count(value);
            if count.is_none() {
                warn!(field = key, label = %label, "dropping non-count entry");
            }
            count.map(|c| (label.clone(), c))
        })
        .collect()
}

fn count_map(map: &Map<String, Value>, key: &str) -> CountMap {
    match present(map, key) {
        None => CountMap::new(),
        Some(Value::Object(object)) => counts_of(object, key),
        Some(other) => {
            warn!(field = key, kind = json_kind(other), "expected an object");
            CountMap::new()
        }
    }
}

fn nested_count_map(map: &Map<String, Value>, key: &str) -> IndexMap<String, CountMap> {
    match present(map, key) {
        None => IndexMap::new(),
        Some(Value::Object(object)) => object
            .iter()
            .map(|(label, inner)| {
                let counts = match inner {
                    Value::Object(inner) => counts_of(inner, key),
                    _ => CountMap::new(),
                };
                (label.clone(), counts)
            })
            .collect(),
        Some(other) => {
            warn!(field = key, kind = json_kind(other), "expected an object");
            IndexMap::new()
        }
    }
}

fn rows<T>(map: &Map<String, Value>, key: &str) -> Vec<T>
where
    T: for<'de> Deserialize<'de>,
{
    match present(map, key) {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| match T::deserialize(item) {
                Ok(row) => Some(row),
                Err(e) => {
                    warn!(field = key, index, error = %e, "dropping malformed row");
                    None
                }
            })
            .collect(),
        Some(other) => {
            warn!(field = key, kind = json_kind(other), "expected an array");
            Vec::new()
        }
    }
}

fn scalar(map: &Map<String, Value>, key: &str) -> Option<Scalar> {
    present(map, key).and_then(Scalar::from_json)
}

fn post(map: &Map<String, Value>, key: &str) -> Option<TopPost> {
    match present(map, key)? {
        value @ Value::Object(_) => TopPost::deserialize(value).ok(),
        other => {
            warn!(field = key, kind = json_kind(other), "expected an object");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_empty_object_yields_defaults() {
        let payload = ResultPayload::from_value(&json!({}));

        assert!(payload.is_empty());
        assert!(payload.sentiment_counts.is_empty());
        assert!(payload.sentiment_month.is_empty());
        assert!(payload.top_words.is_empty());
        assert!(payload.total_likes.is_none());
        assert!(payload.post_max_interacciones.is_none());
    }

    #[test]
    fn test_non_object_yields_defaults() {
        for value in [json!(null), json!([1, 2]), json!("data"), json!(42)] {
            assert!(ResultPayload::from_value(&value).is_empty());
        }
    }

    #[test]
    fn test_full_payload() {
        let value = json!({
            "sentiment_counts": {"negativo": 7, "positivo": 5, "neutro": 2},
            "sentiment_month": [
                {"YearMonth": "2024-01", "Sentimiento": "positivo", "Conteo": 5},
                {"YearMonth": "2024-02", "Sentimiento": "negativo", "Conteo": 2}
            ],
            "sentimiento_tipo_cuenta": {
                "General": {"positivo": 4, "negativo": 1},
                "Bots": {"neutro": 3}
            },
            "top_words": [["gobierno", 12], ["salud", 4.5]],
            "top_users": [
                {"Name": "Ana", "Handle": "@ana", "Interacciones y Audiencia": 1500}
            ],
            "total_retweets": 10,
            "total_likes": 0,
            "total_views": 1234.5,
            "total_comments": "n/a",
            "conteo_tipo_cuenta": {"General": 9, "Bots": 1},
            "post_max_interacciones": {
                "Name": "Ana", "Handle": "@ana", "Retweets": 3, "Likes": 8,
                "Comments": 1, "Views": 300, "Post Body": "Hola <b>mundo</b>",
                "Timestamp": "05/01/2024", "Sentimiento": "positivo"
            }
        });

        let payload = ResultPayload::from_value(&value);

        let labels: Vec<_> = payload.sentiment_counts.keys().cloned().collect();
        assert_eq!(labels, vec!["negativo", "positivo", "neutro"]);
        assert_eq!(payload.sentiment_month.len(), 2);
        assert_eq!(payload.sentiment_month[1].year_month, "2024-02");
        assert_eq!(payload.sentiment_month[1].count, 2);

        let types: Vec<_> = payload.sentimiento_tipo_cuenta.keys().cloned().collect();
        assert_eq!(types, vec!["General", "Bots"]);
        assert_eq!(payload.sentimiento_tipo_cuenta["Bots"]["neutro"], 3);

        assert_eq!(payload.top_words[0].word(), "gobierno");
        assert_eq!(payload.top_words[1].frequency(), 4.5);

        assert_eq!(payload.top_users[0].score, Some(Scalar::Int(1500)));
        assert_eq!(payload.total_retweets, Some(Scalar::Int(10)));
        assert_eq!(payload.total_likes, Some(Scalar::Int(0)));
        assert_eq!(payload.total_views, Some(Scalar::Float(1234.5)));
        assert_eq!(payload.total_comments, Some(Scalar::Text("n/a".into())));

        let post = payload.post_max_interacciones.unwrap();
        assert_eq!(post.body, Some(Scalar::Text("Hola <b>mundo</b>".into())));
        assert_eq!(post.views, Some(Scalar::Int(300)));
    }

    #[test]
    fn test_wrong_types_fall_back_per_field() {
        let value = json!({
            "sentiment_counts": ["positivo", 3],
            "sentiment_month": {"YearMonth": "2024-01"},
            "top_words": "none",
            "conteo_tipo_cuenta": {"General": 4},
            "post_max_interacciones": "missing"
        });

        let payload = ResultPayload::from_value(&value);

        assert!(payload.sentiment_counts.is_empty());
        assert!(payload.sentiment_month.is_empty());
        assert!(payload.top_words.is_empty());
        assert!(payload.post_max_interacciones.is_none());
        assert_eq!(payload.conteo_tipo_cuenta["General"], 4);
    }

    #[test]
    fn test_malformed_rows_are_dropped_individually() {
        let value = json!({
            "sentiment_month": [
                {"YearMonth": "2024-01", "Sentimiento": "positivo", "Conteo": 5},
                {"YearMonth": "2024-02"},
                "garbage",
                {"YearMonth": "2024-03", "Sentimiento": "neutro", "Conteo": 1}
            ],
            "top_words": [["ok", 3], ["missing"], [1, 2]]
        });

        let payload = ResultPayload::from_value(&value);

        let months: Vec<_> = payload
            .sentiment_month
            .iter()
            .map(|r| r.year_month.as_str())
            .collect();
        assert_eq!(months, vec!["2024-01", "2024-03"]);
        assert_eq!(payload.top_words, vec![WordFrequency("ok".into(), 3.0)]);
    }

    #[test]
    fn test_monthly_counts_accept_integral_floats() {
        let value = json!({
            "sentiment_month": [
                {"YearMonth": "2024-01", "Sentimiento": "positivo", "Conteo": 5.0},
                {"YearMonth": "2024-02", "Sentimiento": "neutro", "Conteo": 2.5},
                {"YearMonth": "2024-03", "Sentimiento": "negativo", "Conteo": -1}
            ]
        });

        let payload = ResultPayload::from_value(&value);

        assert_eq!(payload.sentiment_month.len(), 1);
        assert_eq!(payload.sentiment_month[0].year_month, "2024-01");
        assert_eq!(payload.sentiment_month[0].count, 5);
    }

    #[test]
    fn test_null_fields_are_absent() {
        let value = json!({
            "sentiment_counts": null,
            "total_likes": null,
            "post_max_interacciones": null
        });

        let payload = ResultPayload::from_value(&value);
        assert!(payload.is_empty());
    }

    #[test]
    fn test_negative_and_fractional_counts_are_dropped() {
        let value = json!({
            "sentiment_counts": {"positivo": -1, "negativo": 2.0, "neutro": 1.5, "otro": "3"}
        });

        let payload = ResultPayload::from_value(&value);

        assert_eq!(payload.sentiment_counts.len(), 1);
        assert_eq!(payload.sentiment_counts["negativo"], 2);
    }

    #[test]
    fn test_top_user_fields_are_lenient() {
        let value = json!({
            "top_users": [
                {"Name": 123, "Handle": null},
                {"Handle": "@solo", "Interacciones y Audiencia": [1]}
            ]
        });

        let payload = ResultPayload::from_value(&value);

        assert_eq!(payload.top_users.len(), 2);
        assert_eq!(payload.top_users[0].name, Some(Scalar::Int(123)));
        assert_eq!(payload.top_users[0].handle, None);
        assert_eq!(payload.top_users[1].score, None);
    }

    #[test]
    fn test_account_type_defaults_to_zero() {
        let payload = ResultPayload::from_value(&json!({
            "conteo_tipo_cuenta": {"Institucionales": 3, "General": 12}
        }));

        let counts: Vec<_> = AccountType::ALL
            .iter()
            .map(|t| t.count_in(&payload.conteo_tipo_cuenta))
            .collect();
        assert_eq!(counts, vec![3, 0, 12, 0]);
    }

    #[test]
    fn test_scalar_display() {
        assert_eq!(Scalar::Int(42).to_string(), "42");
        assert_eq!(Scalar::Float(2.5).to_string(), "2.5");
        assert_eq!(Scalar::Text("abc".into()).to_string(), "abc");
        assert_eq!(Scalar::Bool(true).to_string(), "true");
        assert_eq!(display_or_blank(None), "");
        assert_eq!(display_or_blank(Some(&Scalar::Int(0))), "0");
    }

    #[test]
    fn test_sentiment_from_label() {
        assert_eq!(Sentiment::from_label("Positivo"), Some(Sentiment::Positivo));
        assert_eq!(Sentiment::from_label("NEUTRO"), Some(Sentiment::Neutro));
        assert_eq!(Sentiment::from_label("desconocido"), None);
        assert_eq!(Sentiment::ALL.map(Sentiment::as_str), ["positivo", "negativo", "neutro"]);
    }
}
