use thiserror::Error;

/// Failures of the persisted key-value store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize value for key {key}: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid store key: {0}")]
    InvalidKey(String),
}

/// User input that blocks a specific action until corrected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No guests loaded")]
    EmptyGuestList,

    #[error("Event is missing required field: {0}")]
    MissingEventField(&'static str),

    #[error("Phone number too short: {0}")]
    PhoneTooShort(String),

    #[error("Guest id must not be empty")]
    EmptyGuestId,

    #[error("Guest id contains unsupported characters: {0}")]
    InvalidGuestId(String),

    #[error("Duplicate guest id: {0}")]
    DuplicateGuestId(String),

    #[error("Unknown guest: {0}")]
    UnknownGuest(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),
}

/// Messaging configuration that blocks every send attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Access token missing or too short ({0} characters)")]
    AccessTokenTooShort(usize),

    #[error("Phone number id missing or too short ({0} characters)")]
    PhoneNumberIdTooShort(usize),

    #[error("Invalid base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Failures talking to the messaging provider.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Unexpected provider response: {0}")]
    InvalidResponse(String),
}

/// Umbrella error for the library's public operations.
#[derive(Error, Debug)]
pub enum RsvpError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

pub type Result<T> = std::result::Result<T, RsvpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_error_wraps_config_transparently() {
        let err = DispatchError::from(ConfigError::AccessTokenTooShort(50));
        assert_eq!(
            err.to_string(),
            "Access token missing or too short (50 characters)"
        );
    }

    #[test]
    fn provider_error_surfaces_message() {
        let err = DispatchError::Provider {
            status: 400,
            message: "Invalid parameter".into(),
        };
        assert!(err.to_string().contains("Invalid parameter"));
    }
}
