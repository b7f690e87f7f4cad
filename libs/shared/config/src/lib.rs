use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend_url: String,
    pub backend_api_key: String,
    pub notify_url: String,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            backend_url: env::var("CLINIC_BACKEND_URL")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_BACKEND_URL not set, using empty value");
                    String::new()
                }),
            backend_api_key: env::var("CLINIC_BACKEND_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_BACKEND_API_KEY not set, using empty value");
                    String::new()
                }),
            notify_url: env::var("CLINIC_NOTIFY_URL")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_NOTIFY_URL not set, notifications disabled");
                    String::new()
                }),
            bind_addr: env::var("CLINIC_BIND_ADDR")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_BIND_ADDR not set, using default");
                    "0.0.0.0:3000".to_string()
                }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.backend_url.is_empty() && !self.backend_api_key.is_empty()
    }

    pub fn is_notifications_configured(&self) -> bool {
        !self.notify_url.is_empty()
    }
}
