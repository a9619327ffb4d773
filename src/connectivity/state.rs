use core::sync::atomic::{AtomicU8, Ordering};

use super::events::Trigger;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectivityState {
    Unconfigured = 0,
    StaConnecting = 1,
    StaConnected = 2,
    ApFallback = 3,
    Provisioning = 4,
}

impl ConnectivityState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unconfigured => "Unconfigured",
            Self::StaConnecting => "StaConnecting",
            Self::StaConnected => "StaConnected",
            Self::ApFallback => "ApFallback",
            Self::Provisioning => "Provisioning",
        }
    }

    /// Access point is up and the provisioning portal is (or is about to be) served.
    pub const fn is_access_point(self) -> bool {
        matches!(self, Self::ApFallback | Self::Provisioning)
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::StaConnecting,
            2 => Self::StaConnected,
            3 => Self::ApFallback,
            4 => Self::Provisioning,
            _ => Self::Unconfigured,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectivityStatusSnapshot {
    pub state: ConnectivityState,
    pub retry_count: u8,
    pub last_trigger: Trigger,
}

/// Published connectivity state. Written only by the connectivity manager,
/// readable from any task.
pub struct ConnectivityStatus {
    state: AtomicU8,
    retry_count: AtomicU8,
    last_trigger: AtomicU8,
}

impl ConnectivityStatus {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectivityState::Unconfigured as u8),
            retry_count: AtomicU8::new(0),
            last_trigger: AtomicU8::new(Trigger::None as u8),
        }
    }

    pub fn state(&self) -> ConnectivityState {
        ConnectivityState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn snapshot(&self) -> ConnectivityStatusSnapshot {
        ConnectivityStatusSnapshot {
            state: self.state(),
            retry_count: self.retry_count.load(Ordering::Relaxed),
            last_trigger: Trigger::from_u8(self.last_trigger.load(Ordering::Relaxed)),
        }
    }

    pub(super) fn publish(&self, state: ConnectivityState, retry_count: u8, trigger: Trigger) {
        self.retry_count.store(retry_count, Ordering::Relaxed);
        self.last_trigger.store(trigger as u8, Ordering::Relaxed);
        self.state.store(state as u8, Ordering::Release);
    }
}

impl Default for ConnectivityStatus {
    fn default() -> Self {
        Self::new()
    }
}
