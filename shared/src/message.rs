use chrono::NaiveDateTime;

use crate::errors::ValidationError;
use crate::models::{Event, Guest};

/// Invitation text used when no template is configured.
pub const DEFAULT_TEMPLATE: &str = "Hi {name}! You're invited to {event} on {date} at {time}, \
at {location}.\n{description}\n\nPlease confirm your attendance: {link}";

const MIN_PHONE_DIGITS: usize = 10;

/// An invitation text with `{placeholder}` slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    body: String,
}

impl MessageTemplate {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    /// Fills `{name}`, `{event}`, `{date}`, `{time}`, `{location}`,
    /// `{description}` and `{link}`. Missing event fields get readable
    /// stand-ins rather than blanks.
    pub fn render(&self, guest: &Guest, event: &Event, link: &str) -> String {
        let or = |value: &str, fallback: &str| {
            if value.trim().is_empty() {
                fallback.to_string()
            } else {
                value.to_string()
            }
        };

        self.body
            .replace("{name}", &guest.name)
            .replace("{event}", &or(&event.name, "our event"))
            .replace("{date}", &format_date(&event.date))
            .replace("{time}", &format_time(&event.date))
            .replace("{location}", &or(&event.location, "location to be announced"))
            .replace("{description}", &event.description)
            .replace("{link}", link)
    }
}

impl Default for MessageTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

fn parse_event_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_local())
        })
}

/// Long-form date, e.g. "Saturday, June 21, 2025".
pub fn format_date(raw: &str) -> String {
    if raw.trim().is_empty() {
        return "date not set".to_string();
    }
    match parse_event_date(raw) {
        Some(dt) => dt.format("%A, %B %-d, %Y").to_string(),
        None => raw.trim().to_string(),
    }
}

/// 24-hour time, e.g. "19:00".
pub fn format_time(raw: &str) -> String {
    match parse_event_date(raw) {
        Some(dt) => dt.format("%H:%M").to_string(),
        None => "time not set".to_string(),
    }
}

/// Normalizes a loosely typed number to `+<digits>`.
pub fn format_phone_number(phone: &str) -> Result<String, ValidationError> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < MIN_PHONE_DIGITS {
        return Err(ValidationError::PhoneTooShort(phone.to_string()));
    }
    Ok(format!("+{digits}"))
}
