use async_trait::async_trait;

use crate::{config::PushConfig, error::AppError};

/// Seam for push delivery. Device transports (APNs/FCM) are owned by the
/// platform push gateway; this service only hands it a token and a payload.
#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn send(&self, device_token: String, title: String, body: String)
        -> Result<(), AppError>;
}

/// Posts notifications to the platform push gateway over HTTP.
pub struct HttpPushGateway {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPushGateway {
    pub fn new(cfg: &PushConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: cfg.gateway_url.clone(),
        }
    }
}

#[async_trait]
impl PushProvider for HttpPushGateway {
    async fn send(
        &self,
        device_token: String,
        title: String,
        body: String,
    ) -> Result<(), AppError> {
        let payload = serde_json::json!({
            "token": device_token,
            "title": title,
            "body": body,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Config(format!("push gateway unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::Config(format!(
                "push gateway returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
