//! Turn API server: HTTP front end for running simulation turns.

mod error;
mod routes;
mod sse;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use axum::Router;
use axum::routing::get;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;
use turn_runner::io::config::{DEFAULT_CONFIG_PATH, load_config};
use turn_runner::io::simulation::{ScriptRunner, SimulationRunner};
use turn_runner::io::store::{FileStore, WorldStore};
use turn_runner::turn::Orchestrator;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "turn-api")]
#[command(about = "HTTP API for running simulation turns")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "3001")]
    port: u16,

    /// Project directory; relative config paths resolve against it
    #[arg(long, default_value = ".")]
    project_dir: PathBuf,

    /// Config file (defaults to <project-dir>/.turns/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of static UI files served as fallback
    #[arg(long)]
    ui_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("turn_api=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let project_dir = args.project_dir.canonicalize().unwrap_or(args.project_dir);
    let config_path = args
        .config
        .unwrap_or_else(|| project_dir.join(DEFAULT_CONFIG_PATH));
    let cfg = load_config(&config_path)
        .with_context(|| format!("load config {}", config_path.display()))?
        .resolve_paths(&project_dir);
    info!(
        project_dir = %project_dir.display(),
        store_dir = %cfg.store_dir.display(),
        timeout_secs = cfg.timeout_secs,
        "starting turn-api"
    );

    let runner: Box<dyn SimulationRunner> = Box::new(ScriptRunner::from_config(&cfg));
    let store: Box<dyn WorldStore> = Box::new(FileStore::new(&cfg.store_dir));
    let state = AppState::new(Orchestrator::new(
        runner,
        store,
        cfg.world_id.clone(),
        cfg.output_limit_bytes,
    ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .nest("/api", routes::api_router())
        .route("/events", get(sse::events_handler))
        .layer(cors)
        .with_state(state);

    let ui_dir = args
        .ui_dir
        .unwrap_or_else(|| project_dir.join("ui").join("dist"));
    if ui_dir.exists() {
        info!(ui_dir = %ui_dir.display(), "serving static UI files");
        app = app.fallback_service(ServeDir::new(ui_dir).append_index_html_on_directories(true));
    } else {
        info!(ui_dir = %ui_dir.display(), "UI directory not found, API-only mode");
    }

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
