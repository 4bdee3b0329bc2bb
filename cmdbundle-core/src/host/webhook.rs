use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use super::{HostError, HostResult, WebhookClient, WebhookRequest, WebhookResponse};

/// POSTs webhook requests with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpWebhookClient {
    client: reqwest::Client,
}

impl HttpWebhookClient {
    pub fn new(timeout: Duration) -> HostResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

/// Converts configured headers, defaulting `Content-Type` to JSON.
pub fn build_headers(headers: &BTreeMap<String, String>) -> HostResult<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| HostError::InvalidHeader {
                name: name.clone(),
                message: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| HostError::InvalidHeader {
            name: name.clone(),
            message: e.to_string(),
        })?;
        map.insert(header_name, header_value);
    }
    if !map.contains_key(CONTENT_TYPE) {
        map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    Ok(map)
}

#[async_trait]
impl WebhookClient for HttpWebhookClient {
    #[tracing::instrument(level = "debug", skip(self, request), fields(url = %request.url))]
    async fn call(&self, request: WebhookRequest) -> HostResult<WebhookResponse> {
        let headers = build_headers(&request.headers)?;
        let response = self
            .client
            .post(&request.url)
            .headers(headers)
            .body(request.body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, "webhook responded");
        Ok(WebhookResponse { status, body })
    }
}
