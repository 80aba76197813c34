//! Generic JSON webhook sink.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use cronfleet_config::WebhookConfig;
use cronfleet_protocols::{NotificationPayload, Notifier, NotifyError};
use reqwest::Client;
use tracing::debug;

/// POSTs each payload as JSON to a fixed URL.
pub struct WebhookNotifier {
    client: Client,
    url: String,
    headers: BTreeMap<String, String>,
}

impl WebhookNotifier {
    pub fn new(config: &WebhookConfig, timeout: Duration) -> Result<Self, NotifyError> {
        if !config.url.starts_with("http://") && !config.url.starts_with("https://") {
            return Err(NotifyError::Config(format!(
                "webhook url must be http(s): {}",
                config.url
            )));
        }
        Ok(Self {
            client: crate::http_client(timeout)?,
            url: config.url.clone(),
            headers: config.headers.clone(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, payload: &NotificationPayload) -> Result<(), NotifyError> {
        let mut request = self.client.post(&self.url).json(payload);
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                sink: self.name().to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        debug!(job_id = %payload.job_id, url = %self.url, "Webhook delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    fn payload() -> NotificationPayload {
        let mut payload = NotificationPayload {
            job_id: "report".to_string(),
            execution_id: "0f3a9c".to_string(),
            status: "STOPPED".to_string(),
            stop_code: None,
            stopping_at: None,
            stopped_at: None,
            stopped_reason: None,
            containers: BTreeMap::new(),
        };
        payload.container_mut("app").log = "done\n".to_string();
        payload
    }

    fn config(url: String) -> WebhookConfig {
        let mut headers = BTreeMap::new();
        headers.insert("X-Api-Key".to_string(), "secret".to_string());
        WebhookConfig { url, headers }
    }

    #[tokio::test]
    async fn test_posts_payload_json() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/hooks/jobs"))
            .and(matchers::header("x-api-key", "secret"))
            .and(matchers::body_partial_json(serde_json::json!({
                "job_id": "report",
                "execution_id": "0f3a9c",
                "containers": {"app": {"log": "done\n"}}
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(
            &config(format!("{}/hooks/jobs", server.uri())),
            Duration::from_secs(5),
        )
        .unwrap();
        notifier.notify(&payload()).await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_rejection() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(&config(server.uri()), Duration::from_secs(5)).unwrap();
        let err = notifier.notify(&payload()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Rejected { ref sink, .. } if sink == "webhook"));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_rejects_non_http_url() {
        assert!(matches!(
            WebhookNotifier::new(&config("ftp://example.com".to_string()), Duration::from_secs(5)),
            Err(NotifyError::Config(_))
        ));
    }
}
