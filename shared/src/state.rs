//! The organizer's in-memory state. Every mutation goes through a method
//! here so the rules on guest ids and status transitions live in one place.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::errors::ValidationError;
use crate::models::{Decision, Event, Guest, GuestStatus, GuestSummary};

/// Result of applying a guest's answer to the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Status moved from pending to the decision.
    Applied { guest_name: String },
    /// The guest already holds this decision.
    AlreadyApplied,
    /// The guest already answered differently; answers are not reversed.
    Conflict { current: GuestStatus },
    UnknownGuest,
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    guests: Vec<Guest>,
    event: Event,
    image_key: Option<String>,
}

impl AppState {
    pub fn new(guests: Vec<Guest>, event: Event) -> Self {
        Self {
            guests,
            event,
            image_key: None,
        }
    }

    pub fn guests(&self) -> &[Guest] {
        &self.guests
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn image_key(&self) -> Option<&str> {
        self.image_key.as_deref()
    }

    pub fn find_guest(&self, guest_id: &str) -> Option<&Guest> {
        self.guests.iter().find(|g| g.id == guest_id)
    }

    /// Replaces the list with freshly created pending guests.
    pub fn import_guests<I, N, P>(&mut self, entries: I, now: DateTime<Utc>) -> &[Guest]
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: Into<String>,
    {
        let mut seen = HashSet::new();
        self.guests = entries
            .into_iter()
            .map(|(name, phone)| {
                let mut guest = Guest::new(name, phone, now);
                // Same-millisecond ids only differ by the random suffix.
                while !seen.insert(guest.id.clone()) {
                    guest.id = crate::models::generate_guest_id(now);
                }
                guest
            })
            .collect();
        &self.guests
    }

    /// Replaces the list wholesale, e.g. with one reloaded from the store.
    pub fn replace_guests(&mut self, guests: Vec<Guest>) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for guest in &guests {
            if !seen.insert(guest.id.as_str()) {
                return Err(ValidationError::DuplicateGuestId(guest.id.clone()));
            }
        }
        self.guests = guests;
        Ok(())
    }

    pub fn set_event(&mut self, event: Event) {
        self.event = event;
    }

    pub fn set_image_key(&mut self, image_key: Option<String>) {
        self.image_key = image_key;
    }

    pub fn apply_decision(&mut self, guest_id: &str, decision: Decision) -> ApplyOutcome {
        let Some(guest) = self.guests.iter_mut().find(|g| g.id == guest_id) else {
            return ApplyOutcome::UnknownGuest;
        };
        let target = GuestStatus::from(decision);
        match guest.status {
            GuestStatus::Pending => {
                guest.status = target;
                ApplyOutcome::Applied {
                    guest_name: guest.name.clone(),
                }
            }
            current if current == target => ApplyOutcome::AlreadyApplied,
            current => ApplyOutcome::Conflict { current },
        }
    }

    pub fn mark_sent(&mut self, guest_id: &str) -> bool {
        match self.guests.iter_mut().find(|g| g.id == guest_id) {
            Some(guest) => {
                guest.sent = true;
                true
            }
            None => false,
        }
    }

    pub fn summary(&self) -> GuestSummary {
        GuestSummary::from_guests(&self.guests)
    }

    /// Checks that there is someone to invite and something to invite them to.
    pub fn ready_to_send(&self) -> Result<(), ValidationError> {
        if self.guests.is_empty() {
            return Err(ValidationError::EmptyGuestList);
        }
        if self.event.name.trim().is_empty() {
            return Err(ValidationError::MissingEventField("name"));
        }
        if self.event.date.trim().is_empty() {
            return Err(ValidationError::MissingEventField("date"));
        }
        Ok(())
    }
}
