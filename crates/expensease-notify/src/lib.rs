//! Outbound reminders: the [`Notifier`] seam and its Twilio WhatsApp client.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

#[cfg(feature = "http")]
pub mod twilio;

#[cfg(feature = "http")]
pub use twilio::TwilioClient;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned {status} (code {}): {message}", .code.map_or("N/A".to_string(), |c| c.to_string()))]
    Provider {
        status: u16,
        code: Option<i64>,
        message: String,
    },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Provider acknowledgement for one accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageReceipt {
    pub sid: String,
}

/// Something that can deliver a WhatsApp message.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `body` to `to`, a `whatsapp:+<number>` address.
    async fn send_whatsapp(&self, to: &str, body: &str) -> Result<MessageReceipt, NotifyError>;
}

/// Credentials and sender address for the Twilio messaging API.
#[derive(Clone, PartialEq, Eq)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender, e.g. `whatsapp:+14155238886`.
    pub whatsapp_from: String,
}

impl TwilioConfig {
    /// Build a config only when all three settings are present and non-empty.
    pub fn from_parts(
        account_sid: Option<String>,
        auth_token: Option<String>,
        whatsapp_from: Option<String>,
    ) -> Option<Self> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Some(Self {
            account_sid: present(account_sid)?,
            auth_token: present(auth_token)?,
            whatsapp_from: present(whatsapp_from)?,
        })
    }
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("whatsapp_from", &self.whatsapp_from)
            .finish()
    }
}
