pub mod clock;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod event_store;
pub mod link;
pub mod message;
pub mod models;
pub mod receiver;
pub mod state;
pub mod store;
pub mod sync;
pub mod whatsapp;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
