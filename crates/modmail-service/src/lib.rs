//! # modmail-service
//!
//! Application layer: message tracking, the relay engine, the conversation
//! lifecycle state machine, the inactivity scheduler, the ban ledger and the
//! config facade, wired together through `ServiceContext`.

pub mod services;

pub use services::{
    BanService, ConfigService, EventRouter, InactivityScheduler, LifecycleService, MessageTracker,
    PendingPromptRegistry, RelayService, ServiceContext, ServiceContextBuilder, ServiceError,
    ServiceResult, SweepStats,
};
