use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use workouts::config::Configuration;
use workouts::telemetry::{self, BoxError};

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(long, short, env = "CONFIG_PATH", default_value = "config.yaml")]
    config: PathBuf,
    /// Overrides the port set in the configuration file.
    #[arg(long, short, env = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    let args = Args::parse();

    // Errors while reading the file are reported before the real subscriber exists.
    let config = tracing::subscriber::with_default(
        tracing_subscriber::fmt().finish(),
        || Configuration::default().path(args.config).read(),
    );

    let (tracer, logs) = match &config.telemetry.otlp_endpoint {
        Some(endpoint) => {
            let tracer = telemetry::setup_tracer(endpoint)?;
            opentelemetry::global::set_tracer_provider(tracer.clone());
            (Some(tracer), Some(telemetry::setup_logging(endpoint)?))
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(logs)
        .init();

    let metrics = if config.telemetry.prometheus {
        Some(telemetry::setup_metrics_recorder()?)
    } else {
        None
    };

    let state = workouts::initialize_state(config.clone(), metrics).await?;
    let app = workouts::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port.unwrap_or(config.port)));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, name = %config.name, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(tracer) = tracer {
        if let Err(error) = tracer.shutdown() {
            tracing::warn!(%error, "failed to flush spans");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(error) => {
                tracing::error!(%error, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutting down");
}
