use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keygate::config::Config;
use keygate::db::{create_pool, init_audit_db, init_db, queries, AppState};
use keygate::handlers;
use keygate::keys::{self, KeySecret};
use keygate::models::CreateClient;
use keygate::releases::{Catalog, GithubCatalog};

#[derive(Parser, Debug)]
#[command(name = "keygate")]
#[command(about = "License key issuance and validation backend")]
struct Cli {
    /// Seed the database with dev data (client + registered license)
    #[arg(long)]
    seed: bool,

    /// Delete databases on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

/// Seeds the database with a dev client and a registered license.
/// Only runs in dev mode and when the database is empty.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let existing = queries::get_client_by_email(&conn, "dev@keygate.local")
        .expect("Failed to query clients");
    if existing.is_some() {
        tracing::info!("Database already has dev data, skipping seed");
        return;
    }

    let client = queries::create_client(
        &conn,
        &CreateClient {
            email: "dev@keygate.local".to_string(),
            name: Some("Dev Client".to_string()),
            current_version: None,
        },
    )
    .expect("Failed to create dev client");

    let machine_code = "DEV-MACHINE-1";
    let license_key = keys::generate_key(&state.secret, &client.email, machine_code);
    let license = queries::create_license(
        &conn,
        &license_key,
        &client.email,
        Some(machine_code),
        None,
    )
    .expect("Failed to create dev license");

    tracing::info!("============================================");
    tracing::info!("DEV DATA SEEDED");
    tracing::info!("Client: {} (id: {})", client.email, client.id);
    tracing::info!("License: {}", license.id);
    tracing::info!("Machine code: {}", machine_code);
    tracing::info!("License key: {}", license_key);
    tracing::info!("============================================");

    // Copy-paste friendly output, outside log formatting
    println!();
    println!("--- COPY FROM HERE ---");
    println!("  email: {}", client.email);
    println!("  machine_code: {}", machine_code);
    println!("  license_key: {}", license_key);
    println!("--- END COPY ---");
    println!();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keygate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let secret = KeySecret::from_env(config.dev_mode).unwrap_or_else(|e| {
        eprintln!("Failed to load license secret: {}", e);
        std::process::exit(1);
    });

    // Create database connection pools
    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    let audit_pool =
        create_pool(&config.audit_database_path).expect("Failed to create audit database pool");

    // Initialize database schemas
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }
    {
        let conn = audit_pool.get().expect("Failed to get audit connection");
        init_audit_db(&conn).expect("Failed to initialize audit database");
    }

    let catalog = match config.releases_url.clone() {
        Some(url) => Catalog::Github(GithubCatalog::new(url, config.releases_token.clone())),
        None => {
            tracing::warn!("RELEASES_URL not set; version endpoints serve an empty catalog");
            Catalog::Fixed(Vec::new())
        }
    };

    let state = AppState {
        db: db_pool,
        audit: audit_pool,
        secret,
        catalog,
    };

    // Seed dev data if --seed flag is passed (only in dev mode)
    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set KEYGATE_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    // Build the application router
    let app = Router::new()
        // Public endpoints (rate-limited per IP)
        .merge(handlers::public::router(config.rate_limit))
        // Admin endpoints (actor via x-admin-name; auth terminates upstream)
        .merge(handlers::admin::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();
    let audit_path = config.audit_database_path.clone();

    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: databases will be deleted on exit");
    }

    tracing::info!("Keygate server listening on {}", addr);

    // Use into_make_service_with_connect_info to enable IP-based rate limiting
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");

    if cleanup_on_exit {
        tracing::info!("Cleaning up ephemeral databases...");
        for path in [&db_path, &audit_path] {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!("Failed to remove {}: {}", path, e);
            } else {
                tracing::info!("Removed {}", path);
            }
            let _ = std::fs::remove_file(format!("{}-wal", path));
            let _ = std::fs::remove_file(format!("{}-shm", path));
        }
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
