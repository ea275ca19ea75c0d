mod config;
mod error;
mod server;
mod store;
mod whois;

use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use config::{Config, LogOutput};
use error::{AppError, AppResult};
use server::WhoisServer;
use server::signals::ShutdownSignals;
use store::pool::{PgPool, PoolLimits};
use store::postgres::PgStore;

#[tokio::main]
async fn main() {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", AppError::Config(e.to_string()));
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(config).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn init_logging(config: &Config) -> AppResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    match &config.log_output {
        LogOutput::Stdout => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .init();
        }
        LogOutput::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| AppError::LogFile {
                    path: path.clone(),
                    source,
                })?;

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
    }

    Ok(())
}

async fn run(config: Config) -> AppResult<()> {
    tracing::info!("Starting whois daemon using port {}", config.server.port);

    let signals = ShutdownSignals::register().map_err(AppError::Signal)?;

    // Pool size follows the admission ceiling so every admitted connection can query
    let pool = PgPool::open(
        &config.database,
        PoolLimits::new(config.server.max_connections),
    )?;
    let store = Arc::new(PgStore::new(pool));
    if let Err(e) = store.check().await {
        tracing::warn!("Database not reachable at startup: {}", e);
    }

    let address = config.server.listen_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| AppError::Bind {
            address: address.clone(),
            source,
        })?;

    tracing::info!(
        "Listening on {} (max connections {}, slot wait {}ms)",
        address,
        config.server.max_connections,
        config.server.slot_wait_ms
    );

    let server = WhoisServer::new(store, &config.server);
    server
        .run(listener, async {
            let signal = signals.recv().await;
            tracing::info!("Program exiting by signal {}", signal);
        })
        .await;

    Ok(())
}
