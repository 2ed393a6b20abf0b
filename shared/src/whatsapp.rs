use async_trait::async_trait;
use log::{error, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::WhatsAppConfig;
use crate::dispatch::{MessageTransport, OutboundMessage, SendReceipt};
use crate::errors::DispatchError;
use crate::message::format_phone_number;

const MESSAGING_PRODUCT: &str = "whatsapp";

#[derive(Debug, Serialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct ImageBody {
    pub link: String,
    pub caption: String,
}

/// Body of `POST /<phone-number-id>/messages`.
#[derive(Debug, Serialize)]
pub struct SendMessageRequest {
    pub messaging_product: &'static str,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageBody>,
}

impl SendMessageRequest {
    pub fn text(to: String, body: String) -> Self {
        Self {
            messaging_product: MESSAGING_PRODUCT,
            to,
            kind: "text",
            text: Some(TextBody { body }),
            image: None,
        }
    }

    pub fn image(to: String, link: String, caption: String) -> Self {
        Self {
            messaging_product: MESSAGING_PRODUCT,
            to,
            kind: "image",
            text: None,
            image: Some(ImageBody { link, caption }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
pub struct SentMessage {
    pub id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ProviderError,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    message: Option<String>,
}

/// WhatsApp Business Cloud API client.
#[derive(Clone)]
pub struct WhatsAppClient {
    http: Client,
    config: WhatsAppConfig,
}

impl WhatsAppClient {
    pub fn new(config: WhatsAppConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    fn build_request(&self, message: &OutboundMessage) -> Result<SendMessageRequest, DispatchError> {
        let to = format_phone_number(&message.phone)?;
        let request = match (&message.image_url, self.config.enable_images) {
            (Some(link), true) => SendMessageRequest::image(to, link.clone(), message.text.clone()),
            _ => SendMessageRequest::text(to, message.text.clone()),
        };
        Ok(request)
    }
}

#[async_trait]
impl MessageTransport for WhatsAppClient {
    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt, DispatchError> {
        self.config.validate()?;
        let request = self.build_request(message)?;

        info!(
            "Sending {} message to {} (token {})",
            request.kind,
            request.to,
            self.config.redacted_token()
        );

        let response = self
            .http
            .post(self.config.messages_url())
            .bearer_auth(&self.config.access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to reach WhatsApp API: {}", e);
                DispatchError::Network(e.to_string())
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!("Failed to read WhatsApp API response: {}", e);
            DispatchError::Network(e.to_string())
        })?;

        if !status.is_success() {
            let err = provider_error(status.as_u16(), &body);
            error!("WhatsApp API rejected message to {}: {}", request.to, err);
            return Err(err);
        }

        let parsed: SendMessageResponse = serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse WhatsApp API response: {}", e);
            DispatchError::InvalidResponse(e.to_string())
        })?;

        let message_id = parsed.messages.into_iter().next().map(|m| m.id);
        info!("WhatsApp API accepted message to {}: {:?}", request.to, message_id);
        Ok(SendReceipt { message_id })
    }

    async fn check_access(&self) -> Result<(), DispatchError> {
        self.config.validate()?;

        let url = self.config.phone_number_url();
        info!("Checking WhatsApp API access at {}", url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(|e| {
                error!("WhatsApp API access check failed: {}", e);
                DispatchError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(provider_error(status.as_u16(), &body));
        }

        info!("WhatsApp API reachable");
        Ok(())
    }
}

fn provider_error(status: u16, body: &str) -> DispatchError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|env| env.error.message)
        .unwrap_or_else(|| "Unknown error".to_string());
    DispatchError::Provider { status, message }
}
