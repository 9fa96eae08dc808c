use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::config::MailConfig;

/// ConfirmationMessage
///
/// What gets delivered to a user after signup: the code they exchange for a token.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationMessage {
    pub username: String,
    pub email: String,
    pub code: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("mail relay request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail relay answered {0}")]
    Rejected(reqwest::StatusCode),
    #[error("simulated delivery failure")]
    Simulated,
}

// 1. The Abstraction (Trait)
/// Notifier Trait
///
/// Delivery channel for confirmation codes. Signup only depends on this trait, so the
/// HTTP relay can be replaced by the logging or mock implementation without touching it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_confirmation_code(&self, message: &ConfirmationMessage) -> Result<(), NotifyError>;
}

// 2. The Real Implementation (HTTP mail relay)
#[derive(Serialize)]
struct MailPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: String,
}

/// HttpMailer
///
/// Posts a JSON message to a transactional mail API (`MAIL_API_URL`), authenticated
/// with a bearer key.
pub struct HttpMailer {
    client: reqwest::Client,
    config: MailConfig,
    from: String,
}

impl HttpMailer {
    pub fn new(config: MailConfig, from: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            from: from.into(),
        }
    }
}

#[async_trait]
impl Notifier for HttpMailer {
    async fn send_confirmation_code(&self, message: &ConfirmationMessage) -> Result<(), NotifyError> {
        let payload = MailPayload {
            from: &self.from,
            to: &message.email,
            subject: "Your confirmation code",
            text: format!(
                "Hello {},\n\nyour confirmation code is: {}\n",
                message.username, message.code
            ),
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status()));
        }
        tracing::info!(username = %message.username, "confirmation code sent");
        Ok(())
    }
}

/// LogMailer
///
/// Local development channel: writes the code to the log instead of sending it.
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Notifier for LogMailer {
    async fn send_confirmation_code(&self, message: &ConfirmationMessage) -> Result<(), NotifyError> {
        tracing::info!(
            username = %message.username,
            email = %message.email,
            code = %message.code,
            "confirmation code (not sent, no mail relay configured)"
        );
        Ok(())
    }
}

// 3. The Mock Implementation (For Tests)
/// MockNotifier
///
/// Records every message instead of delivering it, so tests can read back the code a
/// user was sent.
#[derive(Clone, Default)]
pub struct MockNotifier {
    /// When true, every delivery fails.
    pub should_fail: bool,
    sent: Arc<Mutex<Vec<ConfirmationMessage>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Everything delivered so far, oldest first.
    pub fn sent(&self) -> Vec<ConfirmationMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// The most recent code delivered to `username`.
    pub fn last_code_for(&self, username: &str) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|message| message.username == username)
            .map(|message| message.code)
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send_confirmation_code(&self, message: &ConfirmationMessage) -> Result<(), NotifyError> {
        if self.should_fail {
            return Err(NotifyError::Simulated);
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        Ok(())
    }
}

/// NotifierState
///
/// The shared handle stored in `AppState`.
pub type NotifierState = Arc<dyn Notifier>;
