use std::sync::Arc;

use anyhow::Context;
use chrono::Duration;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use flightdeck_core::Config;
use flightdeck_server::auth::session::{load_or_generate_key, seal};
use flightdeck_server::auth::{Role, SessionClaims};
use flightdeck_server::{build_router, db, router, AppState};

#[derive(Parser, Debug)]
#[command(name = "flightdeck", about = "Flight school roster and maintenance service", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Apply database migrations and exit.
    Migrate,
    /// Mint a session token for a user.
    IssueToken {
        /// User id the token is issued to.
        #[arg(long)]
        user: Uuid,
        /// student, instructor, admin or owner.
        #[arg(long)]
        role: Role,
        /// Lifetime in hours (defaults to SESSION_TTL_HOURS).
        #[arg(long)]
        ttl_hours: Option<i64>,
    },
}

async fn serve(config: Config) -> anyhow::Result<()> {
    router::cors_layer(&config.server.cors_origin)?;
    let session_key = load_or_generate_key(&config.auth)?;
    let pg_pool = db::init_pg_pool(&config.postgres).await;
    if let Some(pool) = &pg_pool {
        db::migrate(pool).await.context("running migrations")?;
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, pg_pool, session_key));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server listening on http://{}", addr);
    info!("API docs at http://{}/docs", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn migrate(config: &Config) -> anyhow::Result<()> {
    let pool = db::init_pg_pool(&config.postgres)
        .await
        .context("PostgreSQL is not configured or unreachable")?;
    db::migrate(&pool).await?;
    Ok(())
}

fn issue_token(config: &Config, user: Uuid, role: Role, ttl_hours: Option<i64>) -> anyhow::Result<()> {
    let ttl_hours = ttl_hours.unwrap_or(config.auth.session_ttl_hours);
    anyhow::ensure!(ttl_hours > 0, "--ttl-hours must be positive");

    let key = load_or_generate_key(&config.auth)?;
    let claims = SessionClaims::new(user, role, Duration::hours(ttl_hours));
    let token = seal(&key, &claims)?;
    info!(user_id = %user, %role, expires_at = %claims.exp, "issued session token");
    println!("{token}");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    flightdeck_core::config::load_dotenv();
    let config = Config::from_env();
    config.log_summary();
    debug!(config = %config.redacted_summary(), "effective configuration");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Migrate => migrate(&config).await,
        Command::IssueToken { user, role, ttl_hours } => issue_token(&config, user, role, ttl_hours),
    }
}
