use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::{
    models::User,
    services::{email::Mailer, pii::PiiCodec, push::PushProvider},
};

/// Upper bound on any single outbound delivery call so one slow provider
/// can't pin the worker.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Queue capacity. When the worker falls this far behind, new jobs are
/// dropped (and logged) instead of blocking request handling.
const QUEUE_CAPACITY: usize = 1024;

/// One recipient's email/push delivery for one message.
#[derive(Debug)]
pub struct NotificationJob {
    pub recipient: User,
    pub sender_name: String,
    pub content: String,
}

/// In-process delivery queue decoupling outbound email/push from request
/// handling. Message persistence never waits on a provider: handlers
/// enqueue and move on, a single worker drains, and every failure is logged
/// rather than surfaced.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<NotificationJob>,
}

impl NotificationQueue {
    /// Spawn the delivery worker and return the enqueue handle. Providers
    /// that aren't configured simply skip their channel.
    pub fn start(
        mailer: Option<Arc<Mailer>>,
        push: Option<Arc<dyn PushProvider>>,
        pii: PiiCodec,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<NotificationJob>(QUEUE_CAPACITY);

        tokio::spawn(async move {
            info!("notification delivery worker started");
            while let Some(job) = rx.recv().await {
                deliver(&mailer, &push, &pii, job).await;
            }
        });

        Self { tx }
    }

    /// Best-effort enqueue. A full queue drops the job; the recipient still
    /// gets the realtime event, only the side-channel nudge is lost.
    pub fn enqueue(&self, job: NotificationJob) {
        if let Err(e) = self.tx.try_send(job) {
            warn!(error = %e, "notification queue full; dropping job");
        }
    }
}

async fn deliver(
    mailer: &Option<Arc<Mailer>>,
    push: &Option<Arc<dyn PushProvider>>,
    pii: &PiiCodec,
    job: NotificationJob,
) {
    let recipient = &job.recipient;

    if recipient.notify_email {
        if let (Some(mailer), Some(email)) = (mailer, recipient.email_plain(pii)) {
            let to_name = recipient.display_name(pii);
            let result = tokio::time::timeout(
                DELIVERY_TIMEOUT,
                mailer.send_message_notification(&email, &to_name, &job.sender_name, &job.content),
            )
            .await;
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(recipient = %recipient.id, error = %e, "email notification failed")
                }
                Err(_) => warn!(recipient = %recipient.id, "email notification timed out"),
            }
        }
    }

    if recipient.notify_push {
        if let (Some(push), Some(token)) = (push, recipient.push_token.clone()) {
            let result = tokio::time::timeout(
                DELIVERY_TIMEOUT,
                push.send(token, job.sender_name.clone(), job.content.clone()),
            )
            .await;
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(recipient = %recipient.id, error = %e, "push notification failed")
                }
                Err(_) => warn!(recipient = %recipient.id, "push notification timed out"),
            }
        }
    }
}
