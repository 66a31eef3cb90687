//! Channel capability classification
//!
//! The platform adapter resolves what a channel can do exactly once, at the
//! boundary, instead of scattering "is this a thread?" checks through the
//! services.

use serde::{Deserialize, Serialize};

/// What kind of operations a resolved channel supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelCapability {
    /// A forum or text channel that can spawn threads.
    Threadable,
    /// A thread that can be locked and archived.
    Archivable,
    /// A user DM channel: plain sends only.
    Direct,
}

impl ChannelCapability {
    /// Resolve from the platform's numeric channel type.
    ///
    /// 1 = DM, 11/12 = thread, 15 = forum; other guild channel types are
    /// treated as threadable text channels.
    pub fn from_platform_type(channel_type: u8) -> Self {
        match channel_type {
            1 => Self::Direct,
            11 | 12 => Self::Archivable,
            _ => Self::Threadable,
        }
    }

    /// Whether a thread can be created inside this channel.
    #[inline]
    pub fn can_spawn_thread(&self) -> bool {
        matches!(self, Self::Threadable)
    }

    /// Whether this channel can be locked and archived.
    #[inline]
    pub fn can_archive(&self) -> bool {
        matches!(self, Self::Archivable)
    }
}
