//! Business logic services
//!
//! Each service borrows the shared `ServiceContext` and orchestrates one
//! slice of the modmail core: tracking, relay, lifecycle, scheduling, bans
//! and configuration.

pub mod ban;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod format;
pub mod lifecycle;
pub mod prompts;
pub mod relay;
pub mod scheduler;
pub mod tracking;

// Re-export all services for convenience
pub use ban::BanService;
pub use config::ConfigService;
pub use context::{ServiceContext, ServiceContextBuilder};
pub use error::{ServiceError, ServiceResult};
pub use events::EventRouter;
pub use lifecycle::LifecycleService;
pub use prompts::PendingPromptRegistry;
pub use relay::RelayService;
pub use scheduler::{InactivityScheduler, SweepStats};
pub use tracking::MessageTracker;
