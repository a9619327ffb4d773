use embassy_futures::select::{select, Either};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use embassy_time::{Duration, Timer};

/// Pending restart request. Scheduling again replaces the previous deadline.
pub struct RestartSignal {
    requested: Signal<CriticalSectionRawMutex, Duration>,
}

impl RestartSignal {
    pub const fn new() -> Self {
        Self {
            requested: Signal::new(),
        }
    }

    pub fn schedule(&self, delay: Duration) {
        log::info!("provision: restart in {} ms", delay.as_millis());
        self.requested.signal(delay);
    }

    pub fn is_pending(&self) -> bool {
        self.requested.signaled()
    }

    /// Resolves once a scheduled delay elapses without being re-armed.
    pub async fn wait_due(&self) {
        let mut delay = self.requested.wait().await;
        loop {
            match select(Timer::after(delay), self.requested.wait()).await {
                Either::First(()) => return,
                Either::Second(rearmed) => delay = rearmed,
            }
        }
    }
}

impl Default for RestartSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for a due restart, then hands control to `restart`, which is not
/// expected to return.
pub async fn run_restart_timer(signal: &RestartSignal, restart: impl FnOnce()) {
    signal.wait_due().await;
    log::warn!("provision: restarting");
    restart();
}
