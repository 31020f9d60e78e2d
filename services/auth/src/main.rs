use std::sync::Arc;

use sea_orm::Database;
use tracing::{info, warn};

use tutor_auth::config::{AuthConfig, resolve_bot_token};
use tutor_auth::infra::db::{DbSettingsRepository, DbUserRepository};
use tutor_auth::infra::telegram::LinkAccountHandler;
use tutor_auth::router::build_router;
use tutor_auth::state::AppState;
use tutor_core::tracing::init_tracing;
use tutor_telegram::{BotApi, BotControl, PollingManager, PollingOptions, TelegramClient};

#[tokio::main]
async fn main() {
    init_tracing();

    let config = AuthConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let token = resolve_bot_token(
        config.telegram_bot_token.clone(),
        &DbSettingsRepository { db: db.clone() },
    )
    .await
    .expect("failed to read bot token setting");

    let (bot, polling) = match token {
        Some(token) => {
            info!(api_base = %config.telegram_api_base, "telegram bot token present");
            let client = TelegramClient::new(
                &config.telegram_api_base,
                &token,
                config.telegram_poll_timeout_secs,
            )
            .expect("failed to build telegram client");
            let bot: Arc<dyn BotApi> = Arc::new(client);
            let handler = LinkAccountHandler::new(DbUserRepository { db: db.clone() }, bot.clone());
            let manager = PollingManager::new(
                bot.clone(),
                Arc::new(handler),
                PollingOptions {
                    poll_timeout_secs: config.telegram_poll_timeout_secs,
                    ..PollingOptions::default()
                },
            );
            if config.telegram_autostart {
                manager.start();
            }
            let polling: Arc<dyn BotControl> = Arc::new(manager);
            (Some(bot), Some(polling))
        }
        None => {
            warn!("no telegram bot token configured; code delivery and polling disabled");
            (None, None)
        }
    };

    let state = AppState {
        db,
        bot,
        polling: polling.clone(),
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.auth_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("auth service listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    if let Some(polling) = polling {
        let status = polling.stop();
        info!(offset = status.offset, "polling stopped");
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
