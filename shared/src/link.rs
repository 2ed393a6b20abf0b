//! Confirmation link encoding.
//!
//! A link carries everything a receiver needs to render the confirmation
//! prompt without access to the organizer's state. Free-text fields are
//! capped by their form-urlencoded length to keep links short enough for
//! chat messages. Cuts fall on char boundaries and truncation is one-way;
//! a fitted value fits again unchanged.
//!
//! | field       | param | cap (encoded bytes) | required |
//! |-------------|-------|---------------------|----------|
//! | version     | `v`   | -   | yes      |
//! | event name  | `n`   | 60  | yes      |
//! | event date  | `d`   | 20  | yes      |
//! | location    | `l`   | 60  | no       |
//! | description | `ds`  | 120 | no       |
//! | guest id    | `g`   | -   | no       |
//! | guest name  | `gn`  | 40  | no       |
//! | image key   | `img` | -   | no       |
//! | cache token | `t`   | -   | yes      |

use log::warn;
use reqwest::Url;
use std::sync::Arc;
use url::form_urlencoded;

use crate::clock::{random_suffix, Clock};
use crate::errors::ConfigError;
use crate::models::{Event, Guest};

pub const LINK_VERSION: u32 = 1;

const CONFIRM_PATH: &str = "confirm";
const WA_ME_BASE: &str = "https://wa.me/";

/// One query parameter of the link schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkField {
    pub param: &'static str,
    /// Budget for the value once form-urlencoded.
    pub max_encoded_len: Option<usize>,
    pub required: bool,
}

impl LinkField {
    const fn new(param: &'static str, max_encoded_len: Option<usize>, required: bool) -> Self {
        Self {
            param,
            max_encoded_len,
            required,
        }
    }

    /// Trims and caps a value to this field's budget.
    pub fn fit(&self, value: &str) -> String {
        let value = value.trim();
        let Some(max) = self.max_encoded_len else {
            return value.to_string();
        };

        let mut fitted = String::new();
        let mut used = 0;
        let mut buf = [0u8; 4];
        for c in value.chars() {
            let cost = encoded_len(c.encode_utf8(&mut buf));
            if used + cost > max {
                break;
            }
            used += cost;
            fitted.push(c);
        }
        // A cut inside a run of words can leave trailing whitespace.
        fitted.truncate(fitted.trim_end().len());
        fitted
    }
}

/// Length of `value` once form-urlencoded, as it appears in the query.
pub fn encoded_len(value: &str) -> usize {
    form_urlencoded::byte_serialize(value.as_bytes())
        .map(str::len)
        .sum()
}

pub const VERSION: LinkField = LinkField::new("v", None, true);
pub const EVENT_NAME: LinkField = LinkField::new("n", Some(60), true);
pub const EVENT_DATE: LinkField = LinkField::new("d", Some(20), true);
pub const EVENT_LOCATION: LinkField = LinkField::new("l", Some(60), false);
pub const EVENT_DESCRIPTION: LinkField = LinkField::new("ds", Some(120), false);
pub const GUEST_ID: LinkField = LinkField::new("g", None, false);
pub const GUEST_NAME: LinkField = LinkField::new("gn", Some(40), false);
pub const IMAGE_KEY: LinkField = LinkField::new("img", None, false);
pub const CACHE_TOKEN: LinkField = LinkField::new("t", None, true);

pub const SCHEMA: [LinkField; 9] = [
    VERSION,
    EVENT_NAME,
    EVENT_DATE,
    EVENT_LOCATION,
    EVENT_DESCRIPTION,
    GUEST_ID,
    GUEST_NAME,
    IMAGE_KEY,
    CACHE_TOKEN,
];

/// Builds confirmation and image links under the public base URL.
#[derive(Clone)]
pub struct LinkEncoder {
    base: Url,
    clock: Arc<dyn Clock>,
}

impl LinkEncoder {
    pub fn new(public_base_url: &str, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: public_base_url.to_string(),
            reason,
        };

        // A trailing slash makes `join` append instead of replacing the last segment.
        let normalized = format!("{}/", public_base_url.trim_end_matches('/'));
        let base = Url::parse(&normalized).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(invalid("expected an http(s) URL".to_string()));
        }
        Ok(Self { base, clock })
    }

    /// Link for one guest, or an event-wide link when `guest` is `None`.
    pub fn build_link(&self, event: &Event, guest: Option<&Guest>, image_key: Option<&str>) -> Url {
        let mut url = self.confirm_url();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(VERSION.param, &LINK_VERSION.to_string());
            for (field, value) in [
                (EVENT_NAME, event.name.as_str()),
                (EVENT_DATE, event.date.as_str()),
                (EVENT_LOCATION, event.location.as_str()),
                (EVENT_DESCRIPTION, event.description.as_str()),
            ] {
                let fitted = field.fit(value);
                if !fitted.is_empty() {
                    query.append_pair(field.param, &fitted);
                }
            }
            if let Some(guest) = guest {
                query.append_pair(GUEST_ID.param, &guest.id);
                let name = GUEST_NAME.fit(&guest.name);
                if !name.is_empty() {
                    query.append_pair(GUEST_NAME.param, &name);
                }
            }
            if let Some(image_key) = image_key.filter(|k| !k.is_empty()) {
                query.append_pair(IMAGE_KEY.param, image_key);
            }
            query.append_pair(CACHE_TOKEN.param, &self.cache_token());
        }
        url
    }

    /// Public URL an image stored under `image_key` is served from.
    pub fn image_url(&self, image_key: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("images").push(image_key);
        }
        url
    }

    fn confirm_url(&self) -> Url {
        self.base
            .join(CONFIRM_PATH)
            .unwrap_or_else(|_| self.base.clone())
    }

    fn cache_token(&self) -> String {
        format!("{}-{}", self.clock.now().timestamp_millis(), random_suffix(9))
    }
}

/// The raw fields carried by a link, capped again on the way in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPayload {
    pub version: Option<u32>,
    pub event_name: Option<String>,
    pub event_date: Option<String>,
    pub event_location: Option<String>,
    pub event_description: Option<String>,
    pub guest_id: Option<String>,
    pub guest_name: Option<String>,
    pub image_key: Option<String>,
}

impl LinkPayload {
    pub fn from_url(url: &Url) -> Self {
        Self::from_pairs(url.query_pairs())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut payload = LinkPayload::default();
        for (key, value) in pairs {
            let key = key.as_ref();
            let value = value.as_ref();
            let slot = match key {
                k if k == VERSION.param => {
                    payload.version = value.trim().parse().ok();
                    continue;
                }
                k if k == EVENT_NAME.param => (&mut payload.event_name, EVENT_NAME),
                k if k == EVENT_DATE.param => (&mut payload.event_date, EVENT_DATE),
                k if k == EVENT_LOCATION.param => (&mut payload.event_location, EVENT_LOCATION),
                k if k == EVENT_DESCRIPTION.param => {
                    (&mut payload.event_description, EVENT_DESCRIPTION)
                }
                k if k == GUEST_ID.param => (&mut payload.guest_id, GUEST_ID),
                k if k == GUEST_NAME.param => (&mut payload.guest_name, GUEST_NAME),
                k if k == IMAGE_KEY.param => (&mut payload.image_key, IMAGE_KEY),
                _ => continue,
            };
            let (target, field) = slot;
            let fitted = field.fit(value);
            if !fitted.is_empty() {
                *target = Some(fitted);
            }
        }

        match payload.version {
            Some(LINK_VERSION) => {}
            Some(other) => warn!("Decoding link with unknown version {}", other),
            None => warn!("Decoding link without a version parameter"),
        }
        payload
    }
}

/// Click-to-chat URL that opens WhatsApp with `text` prefilled.
pub fn wa_me_link(phone: &str, text: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    match Url::parse(WA_ME_BASE).and_then(|base| base.join(&digits)) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("text", text);
            url.to_string()
        }
        Err(_) => format!("{WA_ME_BASE}{digits}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};

    fn encoder() -> LinkEncoder {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap());
        LinkEncoder::new("https://rsvp.example.com/app", Arc::new(clock)).unwrap()
    }

    fn long_event() -> Event {
        Event {
            name: "N".repeat(200),
            date: "2025-06-21T19:00:00.000Z-extra".into(),
            location: "Ç".repeat(100),
            description: "description ".repeat(40),
        }
    }

    fn param(url: &Url, name: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn link_points_at_confirm_page_under_base_path() {
        let url = encoder().build_link(&Event::default(), None, None);
        assert_eq!(url.path(), "/app/confirm");
        assert_eq!(param(&url, "v").as_deref(), Some("1"));
        assert!(param(&url, "t").is_some());
    }

    #[test]
    fn empty_event_never_fails_and_omits_fields() {
        let url = encoder().build_link(&Event::default(), None, None);
        for field in [EVENT_NAME, EVENT_DATE, EVENT_LOCATION, EVENT_DESCRIPTION, GUEST_ID] {
            assert_eq!(param(&url, field.param), None);
        }
    }

    /// Raw, still-encoded value of `name` as serialized in the query.
    fn raw_param(url: &Url, name: &str) -> Option<String> {
        url.query()?
            .split('&')
            .find_map(|pair| pair.strip_prefix(&format!("{name}=")).map(str::to_string))
    }

    #[test]
    fn every_capped_field_respects_its_budget() {
        let mut guest = Guest::new("Zé ".repeat(30), "11999999999", Utc::now());
        guest.id = "guest_1_abc".into();
        let event = Event {
            description: "🎉".repeat(200),
            ..long_event()
        };
        let url = encoder().build_link(&event, Some(&guest), None);

        for field in SCHEMA {
            if let (Some(max), Some(raw)) = (field.max_encoded_len, raw_param(&url, field.param)) {
                assert!(
                    raw.len() <= max,
                    "{} is {} bytes encoded, cap {}",
                    field.param,
                    raw.len(),
                    max
                );
            }
        }
        // Each emoji costs 12 encoded bytes
        assert_eq!(param(&url, "ds"), Some("🎉".repeat(10)));
        assert_eq!(param(&url, "g").as_deref(), Some("guest_1_abc"));
    }

    #[test]
    fn fitting_twice_changes_nothing() {
        let samples = [
            "description ".repeat(40),
            "Salão de Festas São João ".repeat(10),
            "  padded  ".to_string(),
            "a".repeat(59) + " b",
        ];
        for field in [EVENT_NAME, EVENT_LOCATION, EVENT_DESCRIPTION, GUEST_NAME] {
            for sample in &samples {
                let once = field.fit(sample);
                assert_eq!(field.fit(&once), once, "{} on {:?}", field.param, sample);
                assert!(!once.ends_with(' '));
            }
        }
    }

    #[test]
    fn decode_recovers_capped_fields() {
        let event = long_event();
        let guest = Guest::new("Maria Santos", "11888888888", Utc::now());
        let url = encoder().build_link(&event, Some(&guest), Some("img_1_abc"));

        let payload = LinkPayload::from_url(&url);
        assert_eq!(payload.version, Some(LINK_VERSION));
        assert_eq!(payload.event_name, Some(EVENT_NAME.fit(&event.name)));
        // ':' encodes as %3A
        assert_eq!(payload.event_date.as_deref(), Some("2025-06-21T19:00"));
        assert_eq!(payload.event_location, Some("Ç".repeat(10)));
        // The cut lands right after a space
        assert_eq!(
            payload.event_description,
            Some(vec!["description"; 10].join(" "))
        );
        assert_eq!(
            payload.event_description,
            Some(EVENT_DESCRIPTION.fit(&event.description))
        );
        assert_eq!(payload.guest_id, Some(guest.id.clone()));
        assert_eq!(payload.guest_name.as_deref(), Some("Maria Santos"));
        assert_eq!(payload.image_key.as_deref(), Some("img_1_abc"));
    }

    #[test]
    fn non_volatile_params_are_reproducible() {
        let encoder = encoder();
        let event = long_event();
        let mut guest = Guest::new("Ana", "1", Utc::now());
        guest.id = "guest_fixed".into();

        let strip_token = |url: Url| -> Vec<(String, String)> {
            url.query_pairs()
                .filter(|(k, _)| k != CACHE_TOKEN.param)
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        };

        let a = encoder.build_link(&event, Some(&guest), Some("img_k"));
        let b = encoder.build_link(&event, Some(&guest), Some("img_k"));
        assert_ne!(param(&a, "t"), param(&b, "t"));
        assert_eq!(strip_token(a), strip_token(b));
    }

    #[test]
    fn unknown_params_are_ignored() {
        let payload = LinkPayload::from_pairs([("v", "1"), ("utm_source", "chat"), ("n", "  Party  ")]);
        assert_eq!(payload.event_name.as_deref(), Some("Party"));
        assert_eq!(payload.guest_id, None);
    }

    #[test]
    fn image_url_is_served_under_base() {
        let url = encoder().image_url("img_1_abc");
        assert_eq!(url.as_str(), "https://rsvp.example.com/app/images/img_1_abc");
    }

    #[test]
    fn rejects_non_http_base() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        assert!(LinkEncoder::new("mailto:someone@example.com", clock.clone()).is_err());
        assert!(LinkEncoder::new("not a url", clock).is_err());
    }

    #[test]
    fn wa_me_link_keeps_only_digits() {
        let link = wa_me_link("+55 (11) 99999-9999", "Olá & bem-vindo");
        assert!(link.starts_with("https://wa.me/5511999999999?text="));
        let url = Url::parse(&link).unwrap();
        assert_eq!(param(&url, "text").as_deref(), Some("Olá & bem-vindo"));
    }
}
