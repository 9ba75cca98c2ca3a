//! flowgate Relay Server
//!
//! Control plane that tracks live proxy nodes, relays their telemetry to
//! admin dashboards and applies traffic reports to the flow ledger.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use flowgate_core::config::{Config, default_database_path, load_config};
use flowgate_core::tracing_init::init_tracing;
use flowgate_crypto::AesGcmDecryptor;
use tracing::{info, warn};

use flowgate_relay::auth::JwtManager;
use flowgate_relay::hub::Broadcaster;
use flowgate_relay::registry::{AdminRoster, SessionRegistry};
use flowgate_relay::server::{AppState, ConnectionController, build_router};
use flowgate_relay::storage::RelayDatabase;

#[derive(Parser, Debug)]
#[command(name = "flowgate-relay")]
#[command(
    version,
    about = "flowgate relay server - node sessions, admin broadcast hub, flow ledger"
)]
struct Args {
    /// Path to a JSON config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long, global = true)]
    addr: Option<String>,

    /// Path to SQLite database file.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// JWT secret key for admin tokens.
    #[arg(long, global = true, env = "FLOWGATE_JWT_SECRET")]
    jwt_secret: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the relay server (default).
    Serve,
    /// Mint an admin access token with the configured secret.
    IssueToken {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        username: String,
    },
}

impl Args {
    /// Flags take precedence over file and environment configuration.
    fn apply(&self, config: &mut Config) {
        if let Some(addr) = &self.addr {
            config.server.addr.clone_from(addr);
        }
        if let Some(path) = &self.db_path {
            config.server.database_path = Some(path.clone());
        }
        if let Some(secret) = &self.jwt_secret {
            config.auth.jwt_secret.clone_from(secret);
        }
        if self.log_json {
            config.logging.json = true;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);

    let jwt = Arc::new(JwtManager::new(
        config.auth.jwt_secret.as_bytes(),
        config.auth.access_ttl_secs,
    ));

    match args.command.unwrap_or(Command::Serve) {
        Command::IssueToken { user_id, username } => {
            let (token, _ttl) = jwt.issue_access_token(&user_id, &username)?;
            print_token(&token);
            Ok(())
        }
        Command::Serve => serve(config, jwt).await,
    }
}

#[allow(clippy::print_stdout)]
fn print_token(token: &str) {
    println!("{token}");
}

async fn serve(config: Config, jwt: Arc<JwtManager>) -> anyhow::Result<()> {
    init_tracing(&config.logging.filter, config.logging.json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.addr,
        ws_path = %config.server.ws_path,
        "Starting flowgate-relay"
    );
    if config.auth.uses_dev_secret() {
        warn!("Using the built-in development JWT secret; set FLOWGATE_JWT_SECRET in production");
    }

    let db_path = match &config.server.database_path {
        Some(path) => path.clone(),
        None => default_database_path()
            .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?,
    };
    info!(path = %db_path.display(), "Opening relay database");
    let db = RelayDatabase::open(&db_path).await?;

    let roster = AdminRoster::new();
    let broadcaster = Broadcaster::new(
        roster,
        Duration::from_millis(config.broadcast.send_timeout_ms),
    );
    let controller = ConnectionController::new(
        SessionRegistry::new(),
        broadcaster,
        db,
        jwt,
        Arc::new(AesGcmDecryptor),
    );
    let state = AppState {
        controller,
        max_frame_bytes: config.server.max_frame_bytes,
    };
    let app = build_router(state, &config.server.ws_path);

    let listener = tokio::net::TcpListener::bind(&config.server.addr).await?;
    info!(addr = %listener.local_addr()?, "Relay server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("Received shutdown signal");
        })
        .await?;

    info!("Relay stopped");
    Ok(())
}
