use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::dispatch::{MessageTransport, OutboundMessage, SendReceipt};
use crate::errors::DispatchError;

/// In-memory stand-in for the WhatsApp API. Records every attempt and fails
/// for phone numbers registered with [`MockTransport::fail_for`].
#[derive(Default)]
pub struct MockTransport {
    failures: Mutex<HashMap<String, String>>,
    sent: Mutex<Vec<OutboundMessage>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, phone: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(phone.to_string(), message.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sent_phones(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.phone.clone())
            .collect()
    }
}

#[async_trait]
impl MessageTransport for MockTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<SendReceipt, DispatchError> {
        debug!("MockTransport send to {}", message.phone);
        let count = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(message.clone());
            sent.len()
        };

        let failure = self.failures.lock().unwrap().get(&message.phone).cloned();
        match failure {
            Some(message) => Err(DispatchError::Provider {
                status: 400,
                message,
            }),
            None => Ok(SendReceipt {
                message_id: Some(format!("wamid.mock{count}")),
            }),
        }
    }
}
