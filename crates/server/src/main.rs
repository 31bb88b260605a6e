//! Speech Server Entry Point

use std::net::SocketAddr;

use futures::FutureExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use speech_config::{load_settings, Settings};
use speech_server::{create_router, init_metrics, AppState, TtsService};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Configuration first; tracing setup depends on it
    let env = std::env::var("SPEECH_ENV").ok();
    let config = load_settings(env.as_deref())?;

    init_tracing(&config);

    tracing::info!("Starting Speech Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(env = env.as_deref().unwrap_or("default"), "Loaded configuration");

    if config.observability.metrics_enabled {
        match init_metrics() {
            Ok(_) => tracing::info!("Initialized Prometheus metrics at /metrics"),
            Err(e) => tracing::warn!(error = %e, "Failed to install Prometheus recorder, metrics disabled"),
        }
    }

    // Model loading blocks; keep it off the async workers
    let state = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || AppState::from_settings(config)).await??
    };
    tracing::info!(voices = ?state.synthesizer.voices(), "Initialized speech engine");

    let shutdown = shutdown_signal().boxed().shared();

    let host: std::net::IpAddr = config.server.host.parse()?;
    let http_addr = SocketAddr::new(host, config.server.port);

    let grpc = {
        let service = TtsService::new(state.synthesizer.clone());
        let shutdown = shutdown.clone();
        let grpc_port = config.server.grpc_port;
        async move {
            if grpc_port == 0 {
                tracing::info!("gRPC listener disabled");
                return Ok::<(), BoxError>(());
            }
            let addr = SocketAddr::new(host, grpc_port);
            tracing::info!("gRPC listening on {}", addr);
            tonic::transport::Server::builder()
                .add_service(service.into_server())
                .serve_with_shutdown(addr, shutdown)
                .await?;
            Ok(())
        }
    };

    let http = {
        let app = create_router(state);
        async move {
            let listener = tokio::net::TcpListener::bind(http_addr).await?;
            tracing::info!("HTTP listening on {}", http_addr);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await?;
            Ok::<(), BoxError>(())
        }
    };

    tokio::try_join!(http, grpc)?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

/// Initialize tracing with optional OpenTelemetry export
///
/// When `observability.otlp_endpoint` is set, spans are exported to that
/// OTLP collector in addition to console logging.
fn init_tracing(config: &Settings) {
    use opentelemetry_otlp::WithExportConfig;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!(
            "speech_server={level},speech_engine={level},speech_config={level},tower_http=info"
        )
        .into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);

    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    if let Some(otlp_endpoint) = &config.observability.otlp_endpoint {
        if config.observability.tracing_enabled {
            match opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(
                    opentelemetry_otlp::new_exporter()
                        .tonic()
                        .with_endpoint(otlp_endpoint),
                )
                .with_trace_config(opentelemetry_sdk::trace::Config::default().with_resource(
                    opentelemetry_sdk::Resource::new(vec![
                        opentelemetry::KeyValue::new("service.name", "speech-server"),
                        opentelemetry::KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                    ]),
                ))
                .install_batch(opentelemetry_sdk::runtime::Tokio)
            {
                Ok(tracer) => {
                    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
                    subscriber.with(fmt_layer).with(otel_layer).init();

                    tracing::info!(endpoint = %otlp_endpoint, "OpenTelemetry tracing enabled");
                    return;
                }
                Err(e) => {
                    eprintln!(
                        "Failed to initialize OpenTelemetry: {}. Falling back to console logging.",
                        e
                    );
                }
            }
        }
    }

    subscriber.with(fmt_layer).init();
}
