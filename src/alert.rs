use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use crate::core::errors::Result;
use crate::utils::best_effort;

const ALERT_TIMEOUT: Duration = Duration::from_secs(5);

/// 告警通道
///
/// `notify` 永远不向调用方抛错：投递失败打日志后吞掉，
/// 不能因为告警发不出去而影响分发结果的落盘。
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subject: &str, body: &str);
}

/// Webhook 告警器
///
/// 没配 webhook 地址时整体空操作（设计如此，不是故障），
/// 没有告警配置的环境保持安静。
pub struct WebhookNotifier {
    client: Client,
    webhook_url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(ALERT_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            webhook_url,
        }
    }

    async fn post(&self, url: &str, subject: &str, body: &str) -> Result<()> {
        self.client
            .post(url)
            .json(&json!({
                "subject": subject,
                "text": body,
            }))
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, subject: &str, body: &str) {
        let Some(url) = &self.webhook_url else {
            return;
        };

        if best_effort("alert webhook", self.post(url, subject, body))
            .await
            .is_some()
        {
            tracing::info!(subject, "alert sent");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_webhook_configured_is_silent_noop() {
        let notifier = WebhookNotifier::new(None);
        notifier.notify("subject", "body").await;
    }

    #[tokio::test]
    async fn transport_failure_never_raises() {
        // 连不上的地址，notify 仍然正常返回
        let notifier = WebhookNotifier::new(Some("http://127.0.0.1:1/hook".to_string()));
        notifier.notify("Upload Failed: asset-1", "Account 1 error: boom").await;
    }
}
