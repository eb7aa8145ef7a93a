use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, error};
use url::{Host, Url};

use crate::config::{ChatConfig, PayloadShape};
use crate::conversation::{Message, Mode};
use crate::error::{ChatError, Result};
use crate::negotiate::parse_body;

/// Sends one turn to the remote chat API and hands back the raw response body.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// `history` ends with the new user message. `mode` is the persona the
    /// turn was started in and picks the request body layout.
    async fn send(&self, mode: Mode, history: &[Message]) -> Result<Value>;

    /// Whether the endpoint is a local development server.
    fn is_loopback(&self) -> bool;
}

pub struct ApiClient {
    endpoint: Url,
    api_key: Option<String>,
    payloads: [(Mode, PayloadShape); 2],
    model: String,
    temperature: f64,
    max_tokens: u32,
    user_id: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            payloads: Mode::ALL.map(|mode| (mode, config.payload_for(mode))),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            user_id: config.user_id.clone(),
            client,
        })
    }

    pub fn payload_for(&self, mode: Mode) -> PayloadShape {
        self.payloads
            .iter()
            .find(|(m, _)| *m == mode)
            .map(|(_, shape)| *shape)
            .unwrap_or_else(|| mode.payload_shape())
    }

    pub fn request_body(&self, mode: Mode, history: &[Message]) -> Value {
        match self.payload_for(mode) {
            PayloadShape::History => json!({
                "messages": history,
                "model": self.model,
                "temperature": self.temperature,
                "max_tokens": self.max_tokens,
            }),
            PayloadShape::SingleTurn => {
                let user_input = history.last().map(|m| m.content.as_str()).unwrap_or_default();
                json!({
                    "user_input": user_input,
                    "user_unique_id": self.user_id,
                })
            }
        }
    }
}

#[async_trait]
impl ChatTransport for ApiClient {
    async fn send(&self, mode: Mode, history: &[Message]) -> Result<Value> {
        let payload = self.payload_for(mode);
        let request_body = self.request_body(mode, history);

        debug!(
            "Sending request to {}: {}",
            self.endpoint,
            serde_json::to_string_pretty(&request_body).unwrap_or_default()
        );

        let mut request = self.client.post(self.endpoint.as_str()).json(&request_body);
        if let (PayloadShape::History, Some(key)) = (payload, &self.api_key) {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!("API request failed with status {}: {}", status, text);
            return Err(ChatError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        debug!("Received response from chat API: {}", text);

        Ok(parse_body(&text))
    }

    fn is_loopback(&self) -> bool {
        is_loopback_endpoint(&self.endpoint)
    }
}

pub fn is_loopback_endpoint(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}
