//! Web server and report generator for the sentiment dashboard
#![forbid(unsafe_code)]

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use sentiment_core::{Config, init_logging};
use sentiment_web::api_client::Upload;
use sentiment_web::report::{snapshot_from_saved, write_report};
use sentiment_web::server::shutdown_signal;
use sentiment_web::{AppState, SubmitOutcome, UploadController, build_app};
use std::io::BufWriter;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Command line interface for the sentiment dashboard
#[derive(Parser)]
#[command(
    name = "sentiment-web",
    version = env!("CARGO_PKG_VERSION"),
    about = "Sentiment analysis dashboard for social media spreadsheets"
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "SENTIMENT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level, overrides the configured one
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable structured JSON logging
    #[arg(long)]
    json: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Serve the upload page (default)
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Write a standalone HTML dashboard
    Report {
        /// Saved backend answer (JSON) to render without any network call
        #[arg(long, value_name = "JSON", conflicts_with = "file", required_unless_present = "file")]
        payload: Option<PathBuf>,

        /// Spreadsheet to send to the analysis backend
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,

        /// Analysis endpoint, overrides the configured one
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,

        /// Where to write the report
        #[arg(short, long, value_name = "HTML")]
        output: PathBuf,

        /// Report title
        #[arg(long, default_value = "Análisis de Sentimiento")]
        title: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (for development convenience)
    if let Err(e) = dotenvy::dotenv() {
        // It's okay if .env doesn't exist
        eprintln!("Note: .env file not loaded: {e}");
    }

    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let (mut config, load_error) = match loaded {
        Ok(config) => (config, None),
        Err(e) if cli.config.is_none() => (Config::default(), Some(e)),
        Err(e) => return Err(e).context("Failed to load configuration"),
    };

    if let Some(level) = &cli.log_level {
        config.logging.level.clone_from(level);
    }
    if cli.json {
        config.logging.format = "json".to_string();
    }
    init_logging(&config.logging)?;

    if let Some(e) = load_error {
        warn!("Failed to load config ({e}), using defaults");
    }

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        Some(Commands::Report {
            payload,
            file,
            endpoint,
            output,
            title,
        }) => {
            if let Some(endpoint) = endpoint {
                config.backend.url = endpoint;
            }
            report(&config, payload.as_deref(), file.as_deref(), &output, &title).await
        }
        None => serve(config).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!("╔══════════════════════════════════════════════════════════╗");
    info!(
        "║       Sentiment Dashboard v{}                         ║",
        env!("CARGO_PKG_VERSION")
    );
    info!("╚══════════════════════════════════════════════════════════╝");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    let backend = config.backend.url.clone();

    let state = Arc::new(AppState::new(config).context("Failed to build analysis client")?);
    let app = build_app(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("🌐 Upload page: http://{addr}");
    info!("💚 Health:      http://{addr}/health");
    info!("🔬 Backend:     {backend}");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("👋 Server shutdown complete");
    Ok(())
}

fn content_type_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "csv" => Some("text/csv"),
        "xlsx" => Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        "xls" => Some("application/vnd.ms-excel"),
        _ => None,
    }
}

async fn report(
    config: &Config,
    payload: Option<&Path>,
    file: Option<&Path>,
    output: &Path,
    title: &str,
) -> anyhow::Result<()> {
    let snapshot = if let Some(path) = payload {
        info!(path = %path.display(), "rendering saved payload");
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        snapshot_from_saved(&bytes).context("Saved payload cannot be rendered")?
    } else if let Some(path) = file {
        info!(path = %path.display(), backend = %config.backend.url, "analyzing spreadsheet");
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());

        let mut upload = Upload::new(file_name, bytes);
        if let Some(content_type) = content_type_for(path) {
            upload = upload.with_content_type(content_type);
        }

        let controller = UploadController::from_config(&config.backend)?;
        match controller.submit(Some(upload)).await {
            SubmitOutcome::Rendered => controller.snapshot(),
            other => bail!(
                "Analysis did not produce a dashboard ({}): {}",
                other.kind(),
                other.message().unwrap_or("no details")
            ),
        }
    } else {
        bail!("Either --payload or --file is required");
    };

    let out = std::fs::File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    write_report(&mut BufWriter::new(out), &snapshot, title)?;

    info!(
        output = %output.display(),
        charts = snapshot.charts.len(),
        "report written"
    );
    Ok(())
}
