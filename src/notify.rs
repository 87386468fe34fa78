use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_LINE_API_BASE: &str = "https://api.line.me";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("push request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("messaging API returned {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Sends a diagnosis text followed by the stored image to one recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn push(&self, recipient: &str, text: &str, image_url: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum Message<'a> {
    Text {
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    Image {
        original_content_url: &'a str,
        preview_image_url: &'a str,
    },
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: Vec<Message<'a>>,
}

/// LINE Messaging API push client.
#[derive(Clone)]
pub struct LineNotifier {
    client: reqwest::Client,
    api_base: String,
    access_token: String,
}

impl LineNotifier {
    pub fn new(api_base: &str, access_token: &str) -> Self {
        LineNotifier {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    fn push_url(&self) -> String {
        format!("{}/v2/bot/message/push", self.api_base)
    }
}

fn push_body<'a>(recipient: &'a str, text: &'a str, image_url: &'a str) -> PushRequest<'a> {
    PushRequest {
        to: recipient,
        messages: vec![
            Message::Text { text },
            Message::Image {
                original_content_url: image_url,
                preview_image_url: image_url,
            },
        ],
    }
}

#[async_trait]
impl Notifier for LineNotifier {
    async fn push(&self, recipient: &str, text: &str, image_url: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.push_url())
            .bearer_auth(&self.access_token)
            .json(&push_body(recipient, text, image_url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status, body });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    Skipped,
    Failed,
}

/// Best-effort push. A missing recipient skips the call; transport errors are
/// logged and swallowed. Never retries.
pub async fn dispatch(
    notifier: &dyn Notifier,
    recipient: Option<&str>,
    text: &str,
    image_url: &str,
) -> DispatchOutcome {
    let recipient = match recipient.map(str::trim).filter(|r| !r.is_empty()) {
        Some(recipient) => recipient,
        None => {
            log::warn!("USER_ID is not set, skipping push notification");
            return DispatchOutcome::Skipped;
        }
    };

    match notifier.push(recipient, text, image_url).await {
        Ok(()) => {
            log::info!("Pushed diagnosis to {}", recipient);
            DispatchOutcome::Sent
        }
        Err(err) => {
            log::error!("Push notification failed: {}", err);
            DispatchOutcome::Failed
        }
    }
}
