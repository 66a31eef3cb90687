//! # modmail-gateway
//!
//! REST implementation of the `PlatformGateway` port. Each method is one
//! platform call wrapped with bounded-retry rate-limit handling; all other
//! failures map onto `PlatformError` for the service layer to swallow or
//! surface.

mod backoff;
mod rest;
mod wire;

pub use rest::RestGateway;
