//! Chart binding for the dashboard
//!
//! Turns payload fields into declarative inputs for the charting library
//! (Plotly traces and layouts) and the word-cloud renderer. Every builder
//! returns `None` when its input is empty: an empty chart is skipped, never
//! handed to the renderer.
//!
//! The descriptors serialize to the exact JSON shapes the browser libraries
//! consume, so the applier script can pass them through untouched.

use indexmap::{IndexMap, IndexSet};
use sentiment_core::{CountMap, MonthlySentiment, ResultPayload, Sentiment, WordFrequency};
use serde::Serialize;

/// Orange scale used for the pie slices
pub const PIE_COLORS: [&str; 3] = ["#ff9800", "#ffb74d", "#ffe0b2"];

/// Color for sentiments outside the canonical three
pub const DEFAULT_SERIES_COLOR: &str = "#ff9800";

/// Series color keyed by the lowercase sentiment name
#[must_use]
pub fn sentiment_color(label: &str) -> &'static str {
    match Sentiment::from_label(label) {
        Some(Sentiment::Positivo) => "#ff9800",
        Some(Sentiment::Negativo) => "#ff5722",
        Some(Sentiment::Neutro) => "#ffd54f",
        None => DEFAULT_SERIES_COLOR,
    }
}

/// Uppercase the first character for display
#[must_use]
pub fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Placeholder regions reserved for charts in the dashboard markup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChartTarget {
    /// Sentiment distribution pie
    #[serde(rename = "sentimentPie")]
    SentimentPie,
    /// Monthly sentiment lines
    #[serde(rename = "sentimentLine")]
    SentimentLine,
    /// Sentiment by account type, stacked bars
    #[serde(rename = "sentimentByTypeBar")]
    SentimentByTypeBar,
    /// Most frequent words
    #[serde(rename = "wordCloud")]
    WordCloud,
}

impl ChartTarget {
    /// Element id of the placeholder container
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::SentimentPie => "sentimentPie",
            Self::SentimentLine => "sentimentLine",
            Self::SentimentByTypeBar => "sentimentByTypeBar",
            Self::WordCloud => "wordCloud",
        }
    }
}

/// Pie chart trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieTrace {
    /// Slice sizes
    pub values: Vec<u64>,
    /// Slice labels, parallel to `values`
    pub labels: Vec<String>,
    /// Slice colors
    pub marker: Marker,
}

/// Line (scatter) trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterTrace {
    /// Months
    pub x: Vec<String>,
    /// Counts, one per month
    pub y: Vec<u64>,
    /// Drawing mode
    pub mode: &'static str,
    /// Legend entry
    pub name: String,
    /// Line styling
    pub line: LineStyle,
    /// Point styling
    pub marker: Marker,
}

/// Bar trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarTrace {
    /// Counts, one per account type
    pub x: Vec<u64>,
    /// Account types
    pub y: Vec<String>,
    /// Legend entry
    pub name: String,
    /// `h` for horizontal bars
    pub orientation: &'static str,
    /// Bar color
    pub marker: Marker,
}

/// One Plotly trace, tagged with its `type`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    /// `type: "pie"`
    Pie(PieTrace),
    /// `type: "scatter"`
    Scatter(ScatterTrace),
    /// `type: "bar"`
    Bar(BarTrace),
}

/// Marker styling; which field is set depends on the trace type
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Marker {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

/// Line styling for scatter traces
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineStyle {
    pub color: &'static str,
    pub width: u32,
}

/// Legend placement
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub orientation: &'static str,
}

impl Legend {
    const fn horizontal() -> Self {
        Self { orientation: "h" }
    }
}

/// Plot margins in pixels
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Margin {
    pub t: u32,
    pub b: u32,
    pub l: u32,
    pub r: u32,
}

/// Axis title and range behavior
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub title: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rangemode: Option<&'static str>,
}

impl Axis {
    const fn titled(title: &'static str) -> Self {
        Self {
            title,
            rangemode: None,
        }
    }

    const fn from_zero(title: &'static str) -> Self {
        Self {
            title,
            rangemode: Some("tozero"),
        }
    }
}

/// Plot layout
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barmode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
    pub legend: Legend,
    pub margin: Margin,
    pub height: u32,
    pub width: u32,
}

/// Plot configuration flags
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlotConfig {
    pub responsive: bool,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self { responsive: true }
    }
}

/// Linear mapping from word frequency to font size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WordScale {
    /// Highest frequency in the list
    pub max: f64,
    /// Size of a word with frequency 0
    pub min_px: f64,
    /// Extra size granted to the most frequent word
    pub span_px: f64,
}

impl WordScale {
    /// Smallest scaled size
    pub const MIN_PX: f64 = 14.0;
    /// Largest scaled size
    pub const MAX_PX: f64 = 48.0;

    /// Scale for a word list whose highest frequency is `max`
    #[must_use]
    pub const fn new(max: f64) -> Self {
        Self {
            max,
            min_px: Self::MIN_PX,
            span_px: Self::MAX_PX - Self::MIN_PX,
        }
    }

    /// Font size for a frequency; a non-positive maximum pins every word to the floor
    #[must_use]
    pub fn weight(&self, frequency: f64) -> f64 {
        if self.max <= 0.0 {
            return self.min_px;
        }
        self.min_px + (frequency / self.max) * self.span_px
    }
}

/// Word-cloud renderer options
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordCloudOptions {
    pub list: Vec<(String, f64)>,
    pub grid_size: u32,
    pub scale: WordScale,
    pub font_family: &'static str,
    pub color: &'static str,
    pub background_color: &'static str,
    pub rotate_ratio: f64,
    pub min_size: u32,
    pub draw_out_of_bound: bool,
}

/// A single render call for the browser-side libraries
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartRequest {
    /// `Plotly.newPlot(target, traces, layout, config)`
    Plot {
        target: ChartTarget,
        traces: Vec<Trace>,
        layout: Layout,
        config: PlotConfig,
    },
    /// `WordCloud(element, options)`
    WordCloud {
        target: ChartTarget,
        options: WordCloudOptions,
    },
}

impl ChartRequest {
    /// Placeholder the request renders into
    #[must_use]
    pub const fn target(&self) -> ChartTarget {
        match self {
            Self::Plot { target, .. } | Self::WordCloud { target, .. } => *target,
        }
    }
}

/// Sentiment distribution pie; `None` when there are no counts
#[must_use]
pub fn build_pie_input(sentiment_counts: &CountMap) -> Option<ChartRequest> {
    if sentiment_counts.is_empty() {
        return None;
    }

    let trace = PieTrace {
        values: sentiment_counts.values().copied().collect(),
        labels: sentiment_counts.keys().cloned().collect(),
        marker: Marker {
            colors: Some(PIE_COLORS.to_vec()),
            ..Marker::default()
        },
    };

    Some(ChartRequest::Plot {
        target: ChartTarget::SentimentPie,
        traces: vec![Trace::Pie(trace)],
        layout: Layout {
            barmode: None,
            xaxis: None,
            yaxis: None,
            legend: Legend::horizontal(),
            margin: Margin { t: 30, b: 30, l: 0, r: 0 },
            height: 400,
            width: 400,
        },
        config: PlotConfig::default(),
    })
}

/// Distinct months and sentiments in first-seen order, with zero-filled counts
///
/// `grid[s][m]` is the count for sentiment `s` in month `m`. When the input
/// repeats a (month, sentiment) pair, the first row wins.
#[must_use]
pub fn monthly_grid(rows: &[MonthlySentiment]) -> (Vec<String>, Vec<String>, Vec<Vec<u64>>) {
    let months: IndexSet<&str> = rows.iter().map(|r| r.year_month.as_str()).collect();
    let sentiments: IndexSet<&str> = rows.iter().map(|r| r.sentiment.as_str()).collect();

    let mut lookup: IndexMap<(&str, &str), u64> = IndexMap::with_capacity(rows.len());
    for row in rows {
        lookup
            .entry((row.year_month.as_str(), row.sentiment.as_str()))
            .or_insert(row.count);
    }

    let grid = sentiments
        .iter()
        .map(|sentiment| {
            months
                .iter()
                .map(|month| lookup.get(&(*month, *sentiment)).copied().unwrap_or(0))
                .collect()
        })
        .collect();

    (
        months.into_iter().map(str::to_string).collect(),
        sentiments.into_iter().map(str::to_string).collect(),
        grid,
    )
}

/// One line per sentiment across all months; `None` when there are no rows
#[must_use]
pub fn build_line_input(sentiment_month: &[MonthlySentiment]) -> Option<ChartRequest> {
    if sentiment_month.is_empty() {
        return None;
    }

    let (months, sentiments, grid) = monthly_grid(sentiment_month);
    let traces = sentiments
        .iter()
        .zip(grid)
        .map(|(sentiment, counts)| {
            let color = sentiment_color(&sentiment.to_lowercase());
            Trace::Scatter(ScatterTrace {
                x: months.clone(),
                y: counts,
                mode: "lines+markers",
                name: capitalize(sentiment),
                line: LineStyle { color, width: 3 },
                marker: Marker {
                    size: Some(8),
                    ..Marker::default()
                },
            })
        })
        .collect();

    Some(ChartRequest::Plot {
        target: ChartTarget::SentimentLine,
        traces,
        layout: Layout {
            barmode: None,
            xaxis: Some(Axis::titled("Mes y Año")),
            yaxis: Some(Axis::from_zero("Cantidad de Posts")),
            legend: Legend::horizontal(),
            margin: Margin { t: 30, b: 40, l: 40, r: 10 },
            height: 500,
            width: 1400,
        },
        config: PlotConfig::default(),
    })
}

/// Horizontal stacked bars of sentiment per account type; `None` when empty
#[must_use]
pub fn build_stacked_bar_input(
    sentimiento_tipo_cuenta: &IndexMap<String, CountMap>,
) -> Option<ChartRequest> {
    if sentimiento_tipo_cuenta.is_empty() {
        return None;
    }

    let account_types: Vec<String> = sentimiento_tipo_cuenta.keys().cloned().collect();
    let traces = Sentiment::ALL
        .into_iter()
        .map(|sentiment| {
            let x = sentimiento_tipo_cuenta
                .values()
                .map(|counts| counts.get(sentiment.as_str()).copied().unwrap_or(0))
                .collect();
            Trace::Bar(BarTrace {
                x,
                y: account_types.clone(),
                name: capitalize(sentiment.as_str()),
                orientation: "h",
                marker: Marker {
                    color: Some(sentiment_color(sentiment.as_str())),
                    ..Marker::default()
                },
            })
        })
        .collect();

    Some(ChartRequest::Plot {
        target: ChartTarget::SentimentByTypeBar,
        traces,
        layout: Layout {
            barmode: Some("stack"),
            xaxis: Some(Axis::from_zero("Cantidad de Posts")),
            yaxis: None,
            legend: Legend::horizontal(),
            margin: Margin { t: 30, b: 40, l: 80, r: 10 },
            height: 250,
            width: 400,
        },
        config: PlotConfig::default(),
    })
}

/// Word cloud scaled against the most frequent word; `None` when empty
#[must_use]
pub fn build_word_cloud_input(top_words: &[WordFrequency]) -> Option<ChartRequest> {
    if top_words.is_empty() {
        return None;
    }

    let max = top_words
        .iter()
        .map(WordFrequency::frequency)
        .fold(f64::NEG_INFINITY, f64::max);

    Some(ChartRequest::WordCloud {
        target: ChartTarget::WordCloud,
        options: WordCloudOptions {
            list: top_words
                .iter()
                .map(|w| (w.word().to_string(), w.frequency()))
                .collect(),
            grid_size: 10,
            scale: WordScale::new(max),
            font_family: "Arial",
            color: "#ff9800",
            background_color: "#fff",
            rotate_ratio: 0.0,
            min_size: 12,
            draw_out_of_bound: false,
        },
    })
}

/// The payload fields the charts are drawn from
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy)]
pub struct ChartInputs<'a> {
    pub sentiment_counts: &'a CountMap,
    pub sentiment_month: &'a [MonthlySentiment],
    pub sentimiento_tipo_cuenta: &'a IndexMap<String, CountMap>,
    pub top_words: &'a [WordFrequency],
}

impl<'a> From<&'a ResultPayload> for ChartInputs<'a> {
    fn from(payload: &'a ResultPayload) -> Self {
        Self {
            sentiment_counts: &payload.sentiment_counts,
            sentiment_month: &payload.sentiment_month,
            sentimiento_tipo_cuenta: &payload.sentimiento_tipo_cuenta,
            top_words: &payload.top_words,
        }
    }
}

/// Every non-empty chart, in dashboard order
#[must_use]
pub fn bind_charts(inputs: ChartInputs<'_>) -> Vec<ChartRequest> {
    [
        build_stacked_bar_input(inputs.sentimiento_tipo_cuenta),
        build_pie_input(inputs.sentiment_counts),
        build_line_input(inputs.sentiment_month),
        build_word_cloud_input(inputs.top_words),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::float_cmp,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn row(month: &str, sentiment: &str, count: u64) -> MonthlySentiment {
        MonthlySentiment {
            year_month: month.to_string(),
            sentiment: sentiment.to_string(),
            count,
        }
    }

    fn plot_traces(request: ChartRequest) -> (ChartTarget, Vec<Trace>, Layout) {
        match request {
            ChartRequest::Plot {
                target,
                traces,
                layout,
                ..
            } => (target, traces, layout),
            ChartRequest::WordCloud { .. } => panic!("expected a plot request"),
        }
    }

    #[test]
    fn test_pie_skipped_when_empty() {
        assert!(build_pie_input(&CountMap::new()).is_none());
    }

    #[test]
    fn test_pie_keeps_insertion_order() {
        let counts: CountMap = [("neutro", 2), ("positivo", 9), ("negativo", 4)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        let (target, traces, layout) = plot_traces(build_pie_input(&counts).unwrap());

        assert_eq!(target, ChartTarget::SentimentPie);
        assert_eq!(traces.len(), 1);
        let Trace::Pie(pie) = &traces[0] else {
            panic!("expected a pie trace");
        };
        assert_eq!(pie.labels, vec!["neutro", "positivo", "negativo"]);
        assert_eq!(pie.values, vec![2, 9, 4]);
        assert_eq!(layout.legend.orientation, "h");
        assert_eq!((layout.height, layout.width), (400, 400));
    }

    #[test]
    fn test_line_fills_missing_pairs_with_zero() {
        let rows = vec![row("2024-01", "positivo", 5), row("2024-02", "negativo", 2)];

        let (months, sentiments, grid) = monthly_grid(&rows);
        assert_eq!(months, vec!["2024-01", "2024-02"]);
        assert_eq!(sentiments, vec!["positivo", "negativo"]);
        assert_eq!(grid, vec![vec![5, 0], vec![0, 2]]);

        let (target, traces, _) = plot_traces(build_line_input(&rows).unwrap());
        assert_eq!(target, ChartTarget::SentimentLine);
        let names: Vec<_> = traces
            .iter()
            .map(|t| match t {
                Trace::Scatter(s) => s.name.clone(),
                _ => panic!("expected scatter traces"),
            })
            .collect();
        assert_eq!(names, vec!["Positivo", "Negativo"]);
    }

    #[test]
    fn test_line_first_row_wins_for_duplicates() {
        let rows = vec![row("2024-01", "neutro", 3), row("2024-01", "neutro", 8)];
        let (_, _, grid) = monthly_grid(&rows);
        assert_eq!(grid, vec![vec![3]]);
    }

    #[test]
    fn test_line_palette_and_fallback() {
        let rows = vec![row("2024-01", "Negativo", 1), row("2024-01", "desconocido", 4)];
        let (_, traces, _) = plot_traces(build_line_input(&rows).unwrap());

        let colors: Vec<_> = traces
            .iter()
            .map(|t| match t {
                Trace::Scatter(s) => s.line.color,
                _ => panic!("expected scatter traces"),
            })
            .collect();
        assert_eq!(colors, vec!["#ff5722", DEFAULT_SERIES_COLOR]);
    }

    #[test]
    fn test_line_skipped_when_empty() {
        assert!(build_line_input(&[]).is_none());
    }

    #[test]
    fn test_stacked_bar_uses_canonical_order_and_defaults() {
        let mut data = IndexMap::new();
        data.insert(
            "Bots".to_string(),
            [("neutro".to_string(), 3)].into_iter().collect::<CountMap>(),
        );
        data.insert(
            "General".to_string(),
            [("negativo".to_string(), 2), ("positivo".to_string(), 7)]
                .into_iter()
                .collect::<CountMap>(),
        );

        let (target, traces, layout) = plot_traces(build_stacked_bar_input(&data).unwrap());

        assert_eq!(target, ChartTarget::SentimentByTypeBar);
        assert_eq!(layout.barmode, Some("stack"));
        let bars: Vec<_> = traces
            .into_iter()
            .map(|t| match t {
                Trace::Bar(b) => b,
                _ => panic!("expected bar traces"),
            })
            .collect();
        let names: Vec<_> = bars.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Positivo", "Negativo", "Neutro"]);
        assert_eq!(bars[0].y, vec!["Bots", "General"]);
        assert_eq!(bars[0].x, vec![0, 7]);
        assert_eq!(bars[1].x, vec![0, 2]);
        assert_eq!(bars[2].x, vec![3, 0]);
        assert!(bars.iter().all(|b| b.orientation == "h"));
    }

    #[test]
    fn test_stacked_bar_skipped_when_empty() {
        assert!(build_stacked_bar_input(&IndexMap::new()).is_none());
    }

    #[test]
    fn test_word_scale() {
        let words = vec![
            WordFrequency("a".to_string(), 10.0),
            WordFrequency("b".to_string(), 5.0),
        ];

        let Some(ChartRequest::WordCloud { options, .. }) = build_word_cloud_input(&words) else {
            panic!("expected a word cloud request");
        };

        assert_eq!(options.scale.max, 10.0);
        assert_eq!(options.scale.weight(10.0), 48.0);
        assert_eq!(options.scale.weight(5.0), 31.0);
        assert_eq!(options.min_size, 12);
        assert_eq!(options.list.len(), 2);
    }

    #[test]
    fn test_word_scale_with_zero_maximum() {
        let scale = WordScale::new(0.0);
        assert_eq!(scale.weight(0.0), WordScale::MIN_PX);
    }

    #[test]
    fn test_word_cloud_skipped_when_empty() {
        assert!(build_word_cloud_input(&[]).is_none());
    }

    #[test]
    fn test_bind_charts_skips_empty_inputs() {
        let payload = ResultPayload::from_value(&json!({
            "sentiment_counts": {},
            "sentiment_month": [],
            "top_words": [["hola", 3]]
        }));

        let requests = bind_charts(ChartInputs::from(&payload));

        let targets: Vec<_> = requests.iter().map(ChartRequest::target).collect();
        assert_eq!(targets, vec![ChartTarget::WordCloud]);
    }

    #[test]
    fn test_plot_request_serializes_to_plotly_shape() {
        let counts: CountMap = [("positivo".to_string(), 1)].into_iter().collect();
        let value = serde_json::to_value(build_pie_input(&counts).unwrap()).unwrap();

        assert_eq!(value["kind"], "plot");
        assert_eq!(value["target"], "sentimentPie");
        assert_eq!(value["traces"][0]["type"], "pie");
        assert_eq!(value["traces"][0]["marker"]["colors"][0], "#ff9800");
        assert_eq!(value["config"]["responsive"], true);
        assert!(value["layout"].get("barmode").is_none());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("positivo"), "Positivo");
        assert_eq!(capitalize("ñandú"), "Ñandú");
        assert_eq!(capitalize(""), "");
    }

    proptest! {
        #[test]
        fn prop_every_series_has_one_point_per_month(
            raw in proptest::collection::vec((0u8..6, 0u8..4, 0u64..100), 1..40)
        ) {
            let rows: Vec<_> = raw
                .iter()
                .map(|(m, s, c)| row(&format!("2024-{m:02}"), &format!("s{s}"), *c))
                .collect();

            let (months, sentiments, grid) = monthly_grid(&rows);

            let distinct_months: IndexSet<_> = rows.iter().map(|r| &r.year_month).collect();
            let distinct_sentiments: IndexSet<_> = rows.iter().map(|r| &r.sentiment).collect();
            prop_assert_eq!(months.len(), distinct_months.len());
            prop_assert_eq!(sentiments.len(), distinct_sentiments.len());
            prop_assert_eq!(grid.len(), sentiments.len());
            for series in &grid {
                prop_assert_eq!(series.len(), months.len());
            }
        }
    }
}
