// libs/scheduling-cell/src/services/notify.rs
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::models::BookableEvent;

/// Fire-and-forget webhook to the notification collaborator. Delivery is
/// best-effort: failures are logged and never surface to the booking path.
pub struct NotificationClient {
    client: Client,
    notify_url: String,
}

impl NotificationClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            notify_url: config.notify_url.clone(),
        }
    }

    /// Client with no endpoint configured; every dispatch is skipped.
    pub fn disabled() -> Self {
        Self {
            client: Client::new(),
            notify_url: String::new(),
        }
    }

    pub fn dispatch(&self, action: &'static str, event: &BookableEvent) {
        if self.notify_url.is_empty() {
            debug!("Notifications not configured, skipping {} dispatch", action);
            return;
        }

        let client = self.client.clone();
        let url = self.notify_url.clone();
        let payload = json!({
            "action": action,
            "event": event
        });

        tokio::spawn(async move {
            match client.post(&url).json(&payload).send().await {
                Ok(response) if !response.status().is_success() => {
                    warn!(
                        "Notification endpoint returned {} for {} dispatch",
                        response.status(),
                        action
                    );
                }
                Ok(_) => debug!("Notification dispatched: {}", action),
                Err(e) => warn!("Notification dispatch failed: {}", e),
            }
        });
    }
}
