//! Helpdesk API server

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use helpdesk_api::{routes::create_router, AppState, Config};
use helpdesk_shared::{create_pool, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "helpdesk_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config.database_url, config.database_max_connections).await?;
    run_migrations(&pool).await?;
    tracing::info!("Database ready");

    let store = Arc::new(helpdesk_api::store::PgStore::new(pool));
    let mailer = Arc::new(helpdesk_api::email::ResendMailer::new(
        config.resend_api_key.clone(),
        config.email_from.clone(),
        config.public_url.clone(),
    ));

    let bind_address = config.bind_address.clone();
    let state = AppState::new(config, store, mailer);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %bind_address, "Helpdesk API listening");
    axum::serve(listener, app).await?;

    Ok(())
}
