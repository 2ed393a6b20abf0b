pub mod confirmation_handlers;
pub mod event_handlers;
pub mod guest_handlers;
pub mod image_handlers;
pub mod link_handlers;
pub mod message_handlers;
