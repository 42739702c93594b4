//! Telegram Bot API notifier.

use crate::domain::error::NotifyError;
use crate::ports::config_port::ConfigPort;
use crate::ports::notify_port::Notifier;
use std::time::Duration;

const API_BASE: &str = "https://api.telegram.org";

pub struct TelegramNotifier {
    client: reqwest::blocking::Client,
    credentials: Option<(String, String)>,
}

impl TelegramNotifier {
    pub fn new(bot_token: Option<String>, chat_id: Option<String>) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            credentials: bot_token.zip(chat_id),
        })
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, NotifyError> {
        Self::new(
            config.get_string("telegram", "bot_token"),
            config.get_string("telegram", "chat_id"),
        )
    }

    /// False when credentials are unset and messages are dropped.
    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }
}

impl Notifier for TelegramNotifier {
    fn notify(&self, text: &str) -> Result<(), NotifyError> {
        let Some((token, chat_id)) = &self.credentials else {
            log::debug!("telegram not configured, message dropped");
            return Ok(());
        };

        let url = format!("{API_BASE}/bot{token}/sendMessage");
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
            .send()
            .map_err(|e| NotifyError::Transport(e.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_notifier_is_noop() {
        let notifier = TelegramNotifier::new(None, Some("42".into())).unwrap();
        assert!(!notifier.is_configured());
        assert!(notifier.notify("hello").is_ok());
    }

    #[test]
    fn configured_with_both_credentials() {
        let notifier = TelegramNotifier::new(Some("token".into()), Some("42".into())).unwrap();
        assert!(notifier.is_configured());
    }
}
