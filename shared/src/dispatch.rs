//! Preparing and sending invitations, one guest at a time.

use async_trait::async_trait;
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;

use crate::config::WhatsAppConfig;
use crate::errors::{ConfigError, DispatchError};
use crate::link::{wa_me_link, LinkEncoder};
use crate::message::MessageTemplate;
use crate::state::AppState;

/// One rendered invitation addressed to one guest.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub guest_id: String,
    pub guest_name: String,
    pub phone: String,
    pub text: String,
    pub image_url: Option<String>,
}

impl OutboundMessage {
    /// Click-to-chat URL for sending this message by hand.
    pub fn manual_link(&self) -> String {
        wa_me_link(&self.phone, &self.text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReceipt {
    pub message_id: Option<String>,
}

#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt, DispatchError>;

    /// Verifies the provider accepts our credentials without sending anything.
    async fn check_access(&self) -> Result<(), DispatchError> {
        Ok(())
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SendResult {
    pub guest_id: String,
    pub guest_name: String,
    pub phone: String,
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

/// Outcome of a bulk send, in input order.
#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct BulkReport {
    pub results: Vec<SendResult>,
    pub sent: usize,
    pub failed: usize,
}

impl BulkReport {
    pub fn summary(&self) -> String {
        format!("{} sent, {} failed", self.sent, self.failed)
    }
}

/// Outcome of the single-message path.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SingleSendOutcome {
    Sent { result: SendResult },
    /// The API failed; the organizer can finish by hand with `url`.
    ManualFallback { url: String, error: String },
}

#[derive(Clone)]
pub struct Dispatcher {
    config: WhatsAppConfig,
    transport: Arc<dyn MessageTransport>,
}

impl Dispatcher {
    pub fn new(config: WhatsAppConfig, transport: Arc<dyn MessageTransport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &WhatsAppConfig {
        &self.config
    }

    pub async fn check_access(&self) -> Result<(), DispatchError> {
        self.config.validate()?;
        self.transport.check_access().await
    }

    /// Renders one message per guest, each with its own confirmation link.
    pub fn prepare(
        &self,
        state: &AppState,
        template: &MessageTemplate,
        encoder: &LinkEncoder,
    ) -> Vec<OutboundMessage> {
        let image_url = state
            .image_key()
            .filter(|_| self.config.enable_images)
            .map(|key| encoder.image_url(key).to_string());

        state
            .guests()
            .iter()
            .map(|guest| {
                let link = encoder.build_link(state.event(), Some(guest), state.image_key());
                OutboundMessage {
                    guest_id: guest.id.clone(),
                    guest_name: guest.name.clone(),
                    phone: guest.phone_number.clone(),
                    text: template.render(guest, state.event(), link.as_str()),
                    image_url: image_url.clone(),
                }
            })
            .collect()
    }

    /// Sends every message in order with the configured delay between
    /// attempts. A failure is recorded and the batch carries on.
    pub async fn send_bulk(&self, messages: &[OutboundMessage]) -> Result<BulkReport, ConfigError> {
        self.config.validate()?;

        let mut report = BulkReport::default();
        for (i, message) in messages.iter().enumerate() {
            if i > 0 && !self.config.send_delay.is_zero() {
                tokio::time::sleep(self.config.send_delay).await;
            }

            let result = self.attempt(message).await;
            if result.success {
                report.sent += 1;
            } else {
                report.failed += 1;
            }
            info!("Progress: {}/{} messages attempted", i + 1, messages.len());
            report.results.push(result);
        }

        info!("Bulk send finished: {}", report.summary());
        Ok(report)
    }

    /// Sends one message; if the API fails, hands back a click-to-chat link.
    pub async fn send_single(&self, message: &OutboundMessage) -> Result<SingleSendOutcome, ConfigError> {
        self.config.validate()?;

        let result = self.attempt(message).await;
        if result.success {
            return Ok(SingleSendOutcome::Sent { result });
        }
        let error = result.error.unwrap_or_default();
        warn!(
            "Falling back to manual link for {}: {}",
            message.guest_name, error
        );
        Ok(SingleSendOutcome::ManualFallback {
            url: message.manual_link(),
            error,
        })
    }

    async fn attempt(&self, message: &OutboundMessage) -> SendResult {
        let outcome = self.transport.send(message).await;
        let (success, message_id, error) = match outcome {
            Ok(receipt) => (true, receipt.message_id, None),
            Err(e) => {
                warn!("Failed to send to {} ({}): {}", message.guest_name, message.phone, e);
                (false, None, Some(e.to_string()))
            }
        };
        SendResult {
            guest_id: message.guest_id.clone(),
            guest_name: message.guest_name.clone(),
            phone: message.phone.clone(),
            success,
            message_id,
            error,
        }
    }
}

/// Flags every successfully messaged guest as sent. Returns how many were.
pub fn record_results(state: &mut AppState, results: &[SendResult]) -> usize {
    results
        .iter()
        .filter(|r| r.success)
        .filter(|r| state.mark_sent(&r.guest_id))
        .count()
}
