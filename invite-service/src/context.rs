use log::{debug, info, warn};
use rsvp_shared::clock::Clock;
use rsvp_shared::config::Settings;
use rsvp_shared::dispatch::{Dispatcher, MessageTransport};
use rsvp_shared::errors::ConfigError;
use rsvp_shared::event_store::EventStore;
use rsvp_shared::link::LinkEncoder;
use rsvp_shared::message::MessageTemplate;
use rsvp_shared::models::{ConfirmationUpdate, Notification};
use rsvp_shared::receiver::ConfirmationReceiver;
use rsvp_shared::state::AppState;
use rsvp_shared::store::KvStore;
use rsvp_shared::sync::ConfirmationPoller;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};

const RECENT_NOTIFICATIONS: usize = 50;
const DIRECT_CHANNEL_CAPACITY: usize = 64;

/// Recent confirmation notifications, newest last.
#[derive(Default)]
pub struct NotificationLog {
    recent: std::sync::Mutex<VecDeque<Notification>>,
}

impl NotificationLog {
    pub fn push(&self, notification: Notification) {
        if let Ok(mut recent) = self.recent.lock() {
            if recent.len() == RECENT_NOTIFICATIONS {
                recent.pop_front();
            }
            recent.push_back(notification);
        }
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        self.recent
            .lock()
            .map(|recent| recent.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Shared handles every request handler works with.
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<Mutex<AppState>>,
    pub store: EventStore,
    pub encoder: LinkEncoder,
    pub receiver: ConfirmationReceiver,
    pub dispatcher: Dispatcher,
    pub template: MessageTemplate,
    pub notifications: Arc<NotificationLog>,
}

/// The organizer-side sync loop's inputs, to be driven by `ConfirmationPoller::run`.
pub struct SyncParts {
    pub poller: ConfirmationPoller,
    pub updates: mpsc::Receiver<ConfirmationUpdate>,
}

impl AppContext {
    pub async fn build(
        settings: &Settings,
        kv: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        transport: Arc<dyn MessageTransport>,
    ) -> Result<(Self, SyncParts), ConfigError> {
        let encoder = LinkEncoder::new(&settings.public_base_url, clock.clone())?;
        let store = EventStore::new(kv, clock, settings.image_retention);

        let (guests, event) = store.load().await;
        info!("Restored {} guests from store", guests.len());
        let state = Arc::new(Mutex::new(AppState::new(guests, event)));

        let (updates_tx, updates_rx) = mpsc::channel(DIRECT_CHANNEL_CAPACITY);
        let (notify_tx, notify_rx) = broadcast::channel(RECENT_NOTIFICATIONS);

        let notifications = Arc::new(NotificationLog::default());
        tokio::spawn(collect_notifications(notify_rx, notifications.clone()));

        let context = AppContext {
            state,
            receiver: ConfirmationReceiver::new(store.clone(), Some(updates_tx)),
            dispatcher: Dispatcher::new(settings.whatsapp.clone(), transport),
            template: MessageTemplate::new(settings.message_template.clone()),
            store: store.clone(),
            encoder,
            notifications,
        };
        let sync = SyncParts {
            poller: ConfirmationPoller::new(store, settings.sync, notify_tx),
            updates: updates_rx,
        };
        Ok((context, sync))
    }
}

async fn collect_notifications(
    mut rx: broadcast::Receiver<Notification>,
    log: Arc<NotificationLog>,
) {
    loop {
        match rx.recv().await {
            Ok(notification) => {
                debug!("Notification: {}", notification.text());
                log.push(notification);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Notification log skipped {} entries", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
