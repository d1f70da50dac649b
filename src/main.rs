use clap::Parser;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::time::Duration;
use studyhub_backend::config::AppConfig;
use studyhub_backend::infrastructure::{database, seed, storage};
use studyhub_backend::services::staging_sweeper::StagingSweeper;
use studyhub_backend::{AppState, create_app};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "StudyHub summaries backend", long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 4000)]
    port: u16,

    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: std::net::IpAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studyhub_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting StudyHub backend...");

    let config = AppConfig::from_env()?;
    info!(
        "🛡️  Upload Config: Max Size={}MB, Remote Timeout={}s, Uploads/hour={}",
        config.max_file_size / 1024 / 1024,
        config.remote_timeout_secs,
        config.uploads_per_hour
    );

    let db = database::setup_database().await?;
    seed::seed_courses(&db).await?;

    let backend = storage::setup_storage_backend(&config).await;
    let state = AppState::build(db, config.clone(), backend).await?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let sweeper = StagingSweeper::new(
        state.uploads.staging().clone(),
        Duration::from_secs(config.staging_cleanup_age_hours * 3600),
        Duration::from_secs(3600),
        shutdown_rx,
    );
    tokio::spawn(sweeper.run());

    let app = create_app(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            })
            .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                info!("📥 {} {}", request.method(), request.uri());
            })
            .on_response(
                |response: &axum::http::Response<_>,
                 latency: std::time::Duration,
                 _span: &tracing::Span| {
                    info!(
                        "📤 Finished in {:?} with status {}",
                        latency,
                        response.status()
                    );
                },
            ),
    );

    let addr = SocketAddr::new(args.host, args.port);
    info!("✅ Server ready at http://{}", addr);
    info!("📖 Swagger UI: http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await?;

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
