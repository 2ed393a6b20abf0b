//! Runtime configuration, read once from the environment at startup.

use log::{info, warn};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::message::DEFAULT_TEMPLATE;

pub const DEFAULT_API_URL: &str = "https://graph.facebook.com/v23.0";

/// Minimum plausible length of a Cloud API access token.
pub const MIN_ACCESS_TOKEN_LEN: usize = 100;
/// Minimum plausible length of a sender phone-number id.
pub const MIN_PHONE_NUMBER_ID_LEN: usize = 10;

/// Credentials and behavior of the WhatsApp Cloud API client.
#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub access_token: String,
    pub phone_number_id: String,
    pub api_url: String,
    pub enable_images: bool,
    pub send_delay: Duration,
}

impl WhatsAppConfig {
    /// Rejects credentials that cannot possibly work, before any network call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_token.trim().len() < MIN_ACCESS_TOKEN_LEN {
            return Err(ConfigError::AccessTokenTooShort(self.access_token.trim().len()));
        }
        if self.phone_number_id.trim().len() < MIN_PHONE_NUMBER_ID_LEN {
            return Err(ConfigError::PhoneNumberIdTooShort(
                self.phone_number_id.trim().len(),
            ));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn messages_url(&self) -> String {
        format!(
            "{}/{}/messages",
            self.api_url.trim_end_matches('/'),
            self.phone_number_id
        )
    }

    pub fn phone_number_url(&self) -> String {
        format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            self.phone_number_id
        )
    }

    /// Token prefix safe to put in logs.
    pub fn redacted_token(&self) -> String {
        let prefix: String = self.access_token.chars().take(8).collect();
        format!("{prefix}...")
    }
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            phone_number_id: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            enable_images: true,
            send_delay: Duration::from_millis(1000),
        }
    }
}

/// Timing of the confirmation mailbox poller.
#[derive(Debug, Clone, Copy)]
pub struct SyncConfig {
    pub poll_interval: Duration,
    /// Records older than this are evicted without being applied.
    pub freshness: chrono::Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            freshness: chrono::Duration::hours(48),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    /// Base URL guests open; confirmation links and image links hang off it.
    pub public_base_url: String,
    pub store_dir: String,
    pub image_retention: usize,
    pub message_template: String,
    pub whatsapp: WhatsAppConfig,
    pub sync: SyncConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            store_dir: "./rsvp-data".to_string(),
            image_retention: 3,
            message_template: DEFAULT_TEMPLATE.to_string(),
            whatsapp: WhatsAppConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Settings::default();

        let settings = Settings {
            bind_addr: env::var("RSVP_BIND_ADDR").unwrap_or(defaults.bind_addr),
            public_base_url: env::var("RSVP_PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url),
            store_dir: env::var("RSVP_STORE_DIR").unwrap_or(defaults.store_dir),
            image_retention: parse_var("IMAGE_RETENTION", defaults.image_retention),
            message_template: env::var("MESSAGE_TEMPLATE").unwrap_or(defaults.message_template),
            whatsapp: WhatsAppConfig {
                access_token: env::var("WHATSAPP_ACCESS_TOKEN").unwrap_or_default(),
                phone_number_id: env::var("WHATSAPP_PHONE_NUMBER_ID").unwrap_or_default(),
                api_url: env::var("WHATSAPP_API_URL").unwrap_or(defaults.whatsapp.api_url),
                enable_images: env::var("WHATSAPP_ENABLE_IMAGES")
                    .map(|v| v.to_lowercase() != "false")
                    .unwrap_or(defaults.whatsapp.enable_images),
                send_delay: Duration::from_millis(parse_var("SEND_DELAY_MS", 1000u64)),
            },
            sync: SyncConfig {
                poll_interval: Duration::from_secs(parse_var("POLL_INTERVAL_SECS", 5u64).max(1)),
                freshness: freshness_window(parse_var(
                    "CONFIRMATION_FRESHNESS_SECS",
                    defaults.sync.freshness.num_seconds(),
                )),
            },
        };

        info!(
            "Loaded settings: bind_addr={}, public_base_url={}, store_dir={}, poll_interval={:?}, freshness={}s",
            settings.bind_addr,
            settings.public_base_url,
            settings.store_dir,
            settings.sync.poll_interval,
            settings.sync.freshness.num_seconds()
        );

        match settings.whatsapp.validate() {
            Ok(()) => info!("WhatsApp Cloud API configured, automatic sending enabled"),
            Err(e) => warn!("WhatsApp Cloud API not usable ({}), manual links only", e),
        }

        settings
    }
}

const MIN_FRESHNESS_SECS: i64 = 60;

/// Freshness window from seconds, clamped to at least a minute and to what
/// `chrono::Duration` can hold.
fn freshness_window(secs: i64) -> chrono::Duration {
    if secs < MIN_FRESHNESS_SECS {
        warn!(
            "CONFIRMATION_FRESHNESS_SECS={} is below {}s, using {}s",
            secs, MIN_FRESHNESS_SECS, MIN_FRESHNESS_SECS
        );
        return chrono::Duration::seconds(MIN_FRESHNESS_SECS);
    }
    chrono::Duration::try_seconds(secs).unwrap_or_else(|| {
        warn!("CONFIRMATION_FRESHNESS_SECS={} is out of range, using the maximum", secs);
        chrono::Duration::MAX
    })
}

fn parse_var<T: FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring unparseable {}={:?}", name, raw);
            default
        }),
        Err(_) => default,
    }
}
