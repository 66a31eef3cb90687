//! Inbound platform events

mod platform_event;

pub use platform_event::PlatformEvent;
