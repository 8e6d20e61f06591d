use std::sync::Arc;

use blog_platform::{
    config::Config,
    create_routes,
    repositories::{memory::MemoryRepo, PostgresRepo},
    AppState,
};
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "blog_platform=debug,tower_http=debug,axum::rejection=trace,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn build_state(config: Config) -> blog_platform::Result<AppState> {
    let Some(database_url) = config.database_url.clone() else {
        warn!("DATABASE_URL is not set, running against the in-memory store");
        return AppState::new(config, Arc::new(MemoryRepo::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;
    info!("Connection to the database is successful");

    sqlx::migrate!("./migrations").run(&pool).await?;

    AppState::new(config, Arc::new(PostgresRepo::new(pool)))
}

#[tokio::main]
async fn main() {
    install_tracing();

    let config = match Config::init() {
        Ok(config) => config,
        Err(err) => {
            error!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };
    config.debug_log();

    let port = config.port;
    let bootstrap_admin = config.bootstrap_admin.clone();

    let app_state = match build_state(config).await {
        Ok(state) => state,
        Err(err) => {
            error!("Failed to start: {:?}", err);
            std::process::exit(1);
        }
    };

    if let Some(username) = bootstrap_admin {
        match app_state.users_service.promote_to_admin(&username).await {
            Ok(()) => info!(%username, "Granted admin role"),
            Err(err) => warn!(%username, "Could not grant admin role: {:?}", err),
        }
    }

    let app = create_routes(Arc::new(app_state));

    let listener = match tokio::net::TcpListener::bind(format!("[::]:{}", port)).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Failed to bind port {}: {}", port, err);
            std::process::exit(1);
        }
    };
    info!("Listening on port {}", port);

    if let Err(err) = axum::serve(listener, app).await {
        error!("Server error: {}", err);
        std::process::exit(1);
    }
}
