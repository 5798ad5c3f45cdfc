use serde::Serialize;
use std::future::Future;
use tracing::{error, info};

const TELEGRAM_BASE_URL: &str = "https://api.telegram.org";

/// Best-effort sink for tick reports and command responses.
///
/// Delivery failures are logged and never escalated.
pub trait Notifier {
    fn notify(&self, message: &str) -> impl Future<Output = ()> + Send;
}

/// [`Notifier`] writing messages to the tracing log.
#[derive(Debug, Copy, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) {
        info!(%message, "notification");
    }
}

/// [`Notifier`] delivering messages to a Telegram chat via the Bot API `sendMessage` method.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    url: String,
    chat_id: String,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
    parse_mode: &'static str,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{TELEGRAM_BASE_URL}/bot{bot_token}/sendMessage"),
            chat_id,
        }
    }

    async fn send(&self, message: &str) -> Result<(), reqwest::Error> {
        self.client
            .post(&self.url)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text: format!("<pre>{}</pre>", escape_html(message)),
                parse_mode: "HTML",
            })
            .send()
            .await?
            .error_for_status()
            .map(|_| ())
    }
}

impl Notifier for TelegramNotifier {
    async fn notify(&self, message: &str) {
        if let Err(error) = self.send(message).await {
            // Never log the request url, it contains the bot token
            error!(error = %error.without_url(), "TelegramNotifier failed to deliver message");
        }
    }
}

/// Escape the characters Telegram HTML parse mode treats as markup.
pub fn escape_html(message: &str) -> String {
    message
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
