use std::net::SocketAddr;
use std::path::PathBuf;

use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

mod handlers;
mod prompt;
mod state;
mod upstream;

use crate::handlers::{chat_handler, ping_handler};
use crate::state::AppState;
use crate::upstream::{DEFAULT_MODEL, DEFAULT_UPSTREAM_URL};

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,
    #[arg(long)]
    public_dir: Option<PathBuf>,
    /// Without a key the chat endpoint answers 503.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, env = "CHAT_MODEL", default_value = DEFAULT_MODEL)]
    model: String,
    #[arg(long, env = "CHAT_UPSTREAM_URL", default_value = DEFAULT_UPSTREAM_URL)]
    upstream_url: String,
}

fn init_logging() {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}

fn router(state: AppState, public_dir: PathBuf) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/ping", get(ping_handler))
        .fallback_service(ServeDir::new(public_dir).append_index_html_on_directories(true))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_logging();
    let args = Args::parse();

    let upstream = upstream::from_config(upstream::UpstreamConfig {
        api_key: args.api_key,
        model: args.model,
        url: args.upstream_url,
    });
    let state = AppState::new(upstream);

    let public_dir = args
        .public_dir
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../public"));
    let app = router(state, public_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Estimator running at http://localhost:{}", args.port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}
