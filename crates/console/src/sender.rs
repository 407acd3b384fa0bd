//! reqwest-backed network-send collaborator.

use forms::{Method, SendError, Sender};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

pub struct HttpSender {
    client: Client,
    token: Option<String>,
}

impl HttpSender {
    pub fn new(token: Option<String>, accept_invalid_certs: bool) -> reqwest::Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;
        Ok(Self { client, token })
    }
}

#[async_trait::async_trait]
impl Sender for HttpSender {
    async fn send(&self, method: Method, url: &str, body: Value) -> Result<Value, SendError> {
        let method = match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };
        debug!(%method, url, "sending request");

        let mut request = self.client.request(method, url);
        if !body.is_null() {
            request = request.json(&body);
        }
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SendError::new(e.status().map(|s| s.as_u16()), e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SendError::new(Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            return Err(SendError::new(Some(status.as_u16()), text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| SendError::new(Some(status.as_u16()), e.to_string()))
    }
}
