use messaging_service::{
    config, db, error, logging, migrations, routes,
    services::{
        email::Mailer,
        notification_queue::NotificationQueue,
        pii::PiiCodec,
        push::{HttpPushGateway, PushProvider},
    },
    state::AppState,
    websocket::ConnectionRegistry,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env()?);

    let db = db::init_pool(&cfg.database_url)
        .await
        .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;

    // Schema must be in sync before serving traffic
    migrations::run_all(&db)
        .await
        .map_err(|e| error::AppError::StartServer(format!("migrations: {e}")))?;

    let mailer = match cfg.smtp.as_ref() {
        Some(smtp_cfg) => match Mailer::new(smtp_cfg) {
            Ok(mailer) => Some(Arc::new(mailer)),
            Err(e) => {
                tracing::warn!(error = %e, "failed to initialize mailer; email notifications disabled");
                None
            }
        },
        None => {
            tracing::info!("SMTP not configured; email notifications disabled");
            None
        }
    };

    let push: Option<Arc<dyn PushProvider>> = match cfg.push.as_ref() {
        Some(push_cfg) => Some(Arc::new(HttpPushGateway::new(push_cfg))),
        None => {
            tracing::info!("push gateway not configured; push notifications disabled");
            None
        }
    };

    let pii = PiiCodec::new(&cfg.pii_key);
    let notifications = NotificationQueue::start(mailer, push, pii.clone());

    let state = AppState {
        db,
        registry: ConnectionRegistry::new(),
        config: cfg.clone(),
        pii,
        notifications,
    };

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting messaging-service");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;

    axum::serve(listener, routes::build_router(state))
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;

    Ok(())
}
