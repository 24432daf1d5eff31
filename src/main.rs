use anyhow::Context;
use audit_kafka_bridge::server::{self, AppState, AUDIT_PATH, LISTEN_ADDR};
use audit_kafka_bridge::{build_producer, Settings};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(name = "audit-kafka-bridge")]
#[command(about = "Forwards audit log entries received over HTTP to Kafka", long_about = None)]
struct Args {
    #[command(flatten)]
    settings: Settings,

    #[arg(long, env = "AUDIT_BRIDGE_STRICT_METHODS", help = "Answer non-POST requests with 405")]
    strict_methods: bool,

    #[arg(short, long, help = "Enable JSON output for logs")]
    json_logs: bool,

    #[arg(short, long, help = "Verbose logging")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(args.json_logs, args.verbose, args.settings.debug == "on");

    info!("Starting audit-kafka-bridge");

    let settings = args.settings.clone();
    let producer = match tokio::task::spawn_blocking(move || build_producer(&settings))
        .await
        .context("producer setup task failed")?
    {
        Ok(producer) => producer,
        Err(e) if e.is_startup_fatal() => {
            error!("Kafka producer configuration rejected: {}", e);
            return Err(e.into());
        }
        Err(e) => {
            error!("Failed to set up Kafka producer: {}", e);
            return Err(e.into());
        }
    };
    let producer = Arc::new(producer);

    let state = AppState::new(producer.clone()).with_strict_methods(args.strict_methods);

    let listener = TcpListener::bind(LISTEN_ADDR)
        .await
        .with_context(|| format!("failed to bind {}", LISTEN_ADDR))?;

    info!(
        addr = LISTEN_ADDR,
        path = AUDIT_PATH,
        topic = producer.topic(),
        strict_methods = args.strict_methods,
        "Accepting audit entries"
    );

    server::serve(listener, state, shutdown_signal()).await?;

    info!("Server stopped, flushing pending messages");
    let flushed = tokio::task::spawn_blocking(move || producer.flush(FLUSH_TIMEOUT))
        .await
        .context("flush task failed")?;
    if let Err(e) = flushed {
        warn!("Failed to flush Kafka producer: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

fn init_logging(json: bool, verbose: bool, kafka_debug: bool) {
    let mut env_filter = if verbose {
        EnvFilter::new("audit_kafka_bridge=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("audit_kafka_bridge=info,warn"))
    };

    if kafka_debug {
        for directive in ["librdkafka=debug", "rdkafka=debug"] {
            if let Ok(directive) = directive.parse() {
                env_filter = env_filter.add_directive(directive);
            }
        }
    }

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
