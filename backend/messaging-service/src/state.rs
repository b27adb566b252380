use crate::{
    config::Config,
    services::{notification_queue::NotificationQueue, pii::PiiCodec},
    websocket::ConnectionRegistry,
};
use sqlx::{Pool, Postgres};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Postgres>,
    pub registry: ConnectionRegistry,
    pub config: Arc<Config>,
    pub pii: PiiCodec,
    pub notifications: NotificationQueue,
}
