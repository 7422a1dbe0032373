//! HTTP client for Twilio's Programmable Messaging API (WhatsApp channel).

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::{MessageReceipt, Notifier, NotifyError, TwilioConfig};

pub const DEFAULT_BASE_URL: &str = "https://api.twilio.com";

/// Twilio messaging client authenticated with an account SID and auth token.
pub struct TwilioClient {
    client: reqwest::Client,
    base_url: String,
    config: TwilioConfig,
}

/// Error body Twilio returns on non-2xx responses.
#[derive(Deserialize)]
struct TwilioErrorBody {
    code: Option<i64>,
    message: Option<String>,
}

impl TwilioClient {
    /// Create a client against the public Twilio API.
    pub fn new(config: TwilioConfig) -> Self {
        Self::with_base_url(config, DEFAULT_BASE_URL.to_string())
    }

    /// Create a client against another base URL (no trailing slash needed).
    pub fn with_base_url(config: TwilioConfig, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.config.account_sid
        )
    }
}

#[async_trait]
impl Notifier for TwilioClient {
    async fn send_whatsapp(&self, to: &str, body: &str) -> Result<MessageReceipt, NotifyError> {
        let url = self.messages_url();
        let form = [
            ("From", self.config.whatsapp_from.as_str()),
            ("To", to),
            ("Body", body),
        ];

        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let parsed: Option<TwilioErrorBody> = serde_json::from_str(&text).ok();
            let (code, message) = match parsed {
                Some(b) => (b.code, b.message.unwrap_or(text)),
                None => (None, text),
            };
            return Err(NotifyError::Provider {
                status: status.as_u16(),
                code,
                message,
            });
        }

        let receipt: MessageReceipt = serde_json::from_str(&resp.text().await?)?;
        info!(to = %to, sid = %receipt.sid, "whatsapp message accepted");
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC123".into(),
            auth_token: "token".into(),
            whatsapp_from: "whatsapp:+14155238886".into(),
        }
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = TwilioClient::with_base_url(config(), "http://localhost:4000/".into());
        assert_eq!(client.base_url, "http://localhost:4000");
        assert_eq!(
            client.messages_url(),
            "http://localhost:4000/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[tokio::test]
    async fn send_posts_form_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            .and(header_exists("authorization"))
            .and(body_string_contains("From=whatsapp%3A%2B14155238886"))
            .and(body_string_contains("To=whatsapp%3A%2B15550001111"))
            .and(body_string_contains("Body=hello"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "sid": "SM0001",
                "status": "queued"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = TwilioClient::with_base_url(config(), server.uri());
        let receipt = client
            .send_whatsapp("whatsapp:+15550001111", "hello")
            .await
            .unwrap();
        assert_eq!(receipt.sid, "SM0001");
    }

    #[tokio::test]
    async fn provider_error_carries_code_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": 63007,
                "message": "Twilio could not find a Channel with the specified From address",
                "status": 400
            })))
            .mount(&server)
            .await;

        let client = TwilioClient::with_base_url(config(), server.uri());
        let err = client
            .send_whatsapp("whatsapp:+15550001111", "hello")
            .await
            .unwrap_err();
        match err {
            NotifyError::Provider {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code, Some(63007));
                assert!(message.contains("Channel"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn malformed_success_body_is_a_json_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_string("<html>queued</html>"))
            .mount(&server)
            .await;

        let client = TwilioClient::with_base_url(config(), server.uri());
        let err = client.send_whatsapp("whatsapp:+1", "hi").await.unwrap_err();
        assert!(matches!(err, NotifyError::Json(_)), "got {err}");
    }

    #[tokio::test]
    async fn non_json_error_body_kept_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let client = TwilioClient::with_base_url(config(), server.uri());
        let err = client.send_whatsapp("whatsapp:+1", "hi").await.unwrap_err();
        assert!(matches!(
            err,
            NotifyError::Provider { status: 503, code: None, ref message } if message == "upstream down"
        ));
    }
}
