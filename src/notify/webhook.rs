use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::notify::{Notice, NotificationEmitter, NotificationFailure};

/// Posts each notice as JSON to a fixed URL, e.g. a chat bot relay.
pub struct WebhookEmitter {
    client: Client,
    url: String,
}

impl WebhookEmitter {
    pub fn new(url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl NotificationEmitter for WebhookEmitter {
    async fn emit(&self, notice: &Notice) -> Result<(), NotificationFailure> {
        let response = self
            .client
            .post(&self.url)
            .json(notice)
            .send()
            .await
            .map_err(|err| NotificationFailure(format!("webhook request failed: {err}")))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotificationFailure(format!("webhook responded with {status}")))
        }
    }
}
