//! Rollcall - attendance sign-up backend

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rollcall::{
    config::Args,
    db::{EntityStore, MemoryStore, MongoClient, MongoStore},
    server,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("rollcall={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Print startup banner
    info!("======================================");
    info!("  Rollcall - sign-up backend");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("MongoDB: {} (db: {})", args.mongodb_uri, args.mongodb_db);
    info!("Asset dir: {}", args.asset_dir);
    info!("Token TTL: {}s", args.token_ttl_secs);
    info!("WeChat login: {}", if args.wx_configured() { "enabled" } else { "disabled" });
    info!("======================================");

    // Connect to MongoDB (optional in dev mode)
    let store: Arc<dyn EntityStore> = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db)
        .await
    {
        Ok(client) => {
            info!("MongoDB connected successfully");
            Arc::new(MongoStore::new(client))
        }
        Err(e) => {
            if args.dev_mode {
                warn!(
                    "MongoDB connection failed (dev mode, using in-memory store): {}",
                    e
                );
                Arc::new(MemoryStore::new())
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    let state = Arc::new(server::AppState::new(args, store));

    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
