//! Station/access-point decision and link supervision.
//!
//! Radio callbacks never touch state directly: the driver adapter pushes
//! [`LinkEvent`]s into a [`LinkEvents`] channel and the manager consumes them,
//! so the whole state machine can be driven with synthetic events.

mod engine;
mod events;
mod machine;
mod state;
#[cfg(test)]
mod tests;

use core::convert::Infallible;

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex};
use embassy_time::{with_timeout, Duration, Instant};
use heapless::Vec;

pub use engine::{ConnectivityApplyResult, ConnectivityEngine};
pub use events::{ConnectivityEvent, LinkEvent, LinkEvents, Trigger, LINK_EVENT_QUEUE_LEN};
pub use machine::{ActionBuffer, ConnectivityAction};
pub use state::{ConnectivityState, ConnectivityStatus, ConnectivityStatusSnapshot};

use crate::config::{ConnectivityPolicy, SCAN_MAX_APS};
use crate::control::ControlState;
use crate::credentials::{resolve_credentials, CredentialSource, CredentialStore, KeyValueStore};
use crate::error::{BootError, LinkError};
use crate::telemetry::Telemetry;
use crate::types::{AccessPointConfig, Credentials, ScanRecord};

pub type ScanResults = Vec<ScanRecord, SCAN_MAX_APS>;

/// Radio driver. Association outcomes are reported asynchronously through
/// [`LinkEvents`], never through these return values.
#[allow(async_fn_in_trait)]
pub trait LinkDriver {
    /// Station mode with `credentials`, accepting open and secured networks.
    async fn start_station(&mut self, credentials: &Credentials) -> Result<(), LinkError>;

    async fn connect(&mut self) -> Result<(), LinkError>;

    /// Mixed AP+STA mode: the station side stays up so scans keep working
    /// and an association already in flight is not torn down.
    async fn start_access_point(&mut self, config: &AccessPointConfig) -> Result<(), LinkError>;

    /// Blocking scan, at most `max` records in driver order.
    async fn scan(&mut self, max: usize) -> Result<ScanResults, LinkError>;

    fn mac_address(&self) -> [u8; 6];
}

/// The radio is shared between the connectivity manager and the provisioning
/// scan handler.
pub type SharedLink<L> = Mutex<CriticalSectionRawMutex, L>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FallbackReason {
    NoCredentials,
    RetriesExhausted,
    Timeout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootOutcome {
    Connected { source: CredentialSource },
    AccessPoint { reason: FallbackReason },
}

pub struct ConnectivityManager<'a, L> {
    link: &'a SharedLink<L>,
    events: &'a LinkEvents,
    status: &'a ConnectivityStatus,
    control: &'a ControlState<'a>,
    telemetry: &'a Telemetry,
    engine: ConnectivityEngine,
    policy: ConnectivityPolicy,
    started_at: Instant,
    fallback_pending: bool,
    fallback_reason: Option<FallbackReason>,
}

impl<'a, L: LinkDriver> ConnectivityManager<'a, L> {
    pub fn new(
        link: &'a SharedLink<L>,
        events: &'a LinkEvents,
        status: &'a ConnectivityStatus,
        control: &'a ControlState<'a>,
        telemetry: &'a Telemetry,
        policy: ConnectivityPolicy,
    ) -> Self {
        Self {
            link,
            events,
            status,
            control,
            telemetry,
            engine: ConnectivityEngine::new(policy.max_retries),
            policy,
            started_at: Instant::now(),
            fallback_pending: false,
            fallback_reason: None,
        }
    }

    pub fn state(&self) -> ConnectivityState {
        self.engine.state()
    }

    /// Resolves credentials and either joins a network or ends up with the
    /// access point running. Only radio start failures are errors.
    pub async fn boot<S: KeyValueStore>(
        &mut self,
        store: &mut CredentialStore<S>,
        compiled: Option<Credentials>,
    ) -> Result<BootOutcome, BootError> {
        let Some((credentials, source)) = resolve_credentials(store, compiled) else {
            log::info!("wifi: no credentials, starting provisioning access point");
            self.dispatch(ConnectivityEvent::Boot {
                has_credentials: false,
            })
            .await;
            self.finish_fallback().await?;
            return Ok(BootOutcome::AccessPoint {
                reason: FallbackReason::NoCredentials,
            });
        };

        log::info!(
            "wifi: station connect ssid='{}' source={:?}",
            credentials.ssid(),
            source
        );
        self.link
            .lock()
            .await
            .start_station(&credentials)
            .await
            .map_err(BootError::Station)?;

        while self.events.try_receive().is_ok() {}
        self.dispatch(ConnectivityEvent::Boot {
            has_credentials: true,
        })
        .await;

        let deadline = Duration::from_millis(self.policy.connect_timeout_ms as u64);
        if with_timeout(deadline, self.wait_for_link()).await.is_err() {
            log::warn!(
                "wifi: no link after {} ms, starting provisioning access point",
                self.policy.connect_timeout_ms
            );
            self.dispatch(ConnectivityEvent::ConnectTimeout).await;
        }
        self.finish_fallback().await?;

        match self.engine.state() {
            ConnectivityState::StaConnected => Ok(BootOutcome::Connected { source }),
            _ => Ok(BootOutcome::AccessPoint {
                reason: self.fallback_reason.unwrap_or(FallbackReason::Timeout),
            }),
        }
    }

    /// Feeds one radio event through the state machine and performs the
    /// resulting side effects.
    pub async fn handle_event(
        &mut self,
        event: LinkEvent,
    ) -> Result<Option<ConnectivityApplyResult>, BootError> {
        let result = self.observe(event).await;
        self.finish_fallback().await?;
        Ok(result)
    }

    /// Event loop after boot. Returns only if the access point cannot be
    /// started after a late fallback.
    pub async fn run(&mut self) -> Result<Infallible, BootError> {
        loop {
            let event = self.events.receive().await;
            self.handle_event(event).await?;
        }
    }

    /// Records that the provisioning server is up.
    pub async fn mark_provisioning(&mut self) -> ConnectivityApplyResult {
        self.dispatch(ConnectivityEvent::ProvisioningStarted).await
    }

    async fn wait_for_link(&mut self) {
        loop {
            let event = self.events.receive().await;
            self.observe(event).await;
            if matches!(
                self.engine.state(),
                ConnectivityState::StaConnected | ConnectivityState::ApFallback
            ) {
                return;
            }
        }
    }

    async fn observe(&mut self, event: LinkEvent) -> Option<ConnectivityApplyResult> {
        match event {
            LinkEvent::StaAssociated => log::info!("wifi: station associated"),
            LinkEvent::StaDisconnected { reason } => {
                self.telemetry.record_disconnect();
                log::warn!(
                    "wifi: station disconnected reason={} ({})",
                    reason,
                    disconnect_reason_label(reason)
                );
            }
            LinkEvent::GotIp { address } => {
                let [a, b, c, d] = address;
                if self.engine.state().is_access_point() {
                    log::info!("wifi: got ip {}.{}.{}.{} after fallback, ignored", a, b, c, d);
                } else {
                    log::info!("wifi: got ip {}.{}.{}.{}", a, b, c, d);
                }
            }
            LinkEvent::ApClientJoined { aid } => log::info!("wifi: ap client joined aid={}", aid),
            LinkEvent::ApClientLeft { aid } => log::info!("wifi: ap client left aid={}", aid),
        }

        let event = ConnectivityEvent::from_link(event)?;
        Some(self.dispatch(event).await)
    }

    async fn dispatch(&mut self, event: ConnectivityEvent) -> ConnectivityApplyResult {
        let result = self.engine.apply(event);
        let trigger = event.trigger();
        self.status.publish(result.after, result.retries, trigger);
        if result.changed() {
            emit_net_event(result.before, result.after, trigger, self.started_at);
        }

        for action in result.actions.iter().copied() {
            match action {
                ConnectivityAction::IssueConnect => {
                    self.telemetry.record_connect_attempt();
                    if result.retries > 0 {
                        log::info!(
                            "wifi: retrying station connect ({}/{})",
                            result.retries,
                            self.policy.max_retries
                        );
                    }
                    if let Err(err) = self.link.lock().await.connect().await {
                        log::warn!("wifi: connect request failed err={}", err);
                    }
                }
                ConnectivityAction::SignalConnected => {
                    self.telemetry.record_link_up();
                    log::info!("wifi: station connected");
                }
                ConnectivityAction::FallBack => {
                    self.telemetry.record_ap_fallback();
                    self.fallback_pending = true;
                    self.fallback_reason = Some(match trigger {
                        Trigger::NoCredentials => FallbackReason::NoCredentials,
                        Trigger::StaDisconnected => FallbackReason::RetriesExhausted,
                        _ => FallbackReason::Timeout,
                    });
                }
                ConnectivityAction::ClearControl => self.control.clear(),
            }
        }
        result
    }

    async fn finish_fallback(&mut self) -> Result<(), BootError> {
        if !core::mem::take(&mut self.fallback_pending) {
            return Ok(());
        }
        let mut link = self.link.lock().await;
        let config = AccessPointConfig::for_device(link.mac_address());
        log::info!(
            "wifi: starting access point ssid='{}' channel={} max_clients={} open={}",
            config.ssid,
            config.channel,
            config.max_clients,
            config.is_open()
        );
        link.start_access_point(&config)
            .await
            .map_err(BootError::AccessPoint)
    }
}

fn emit_net_event(
    from: ConnectivityState,
    to: ConnectivityState,
    trigger: Trigger,
    started_at: Instant,
) {
    let at_ms = started_at.elapsed().as_millis() as u32;
    log::info!(
        "NET_EVENT {{\"from\":\"{}\",\"to\":\"{}\",\"trigger\":\"{}\",\"at_ms\":{}}}",
        from.as_str(),
        to.as_str(),
        trigger.as_str(),
        at_ms
    );
}

fn disconnect_reason_label(reason: u8) -> &'static str {
    match reason {
        2 => "auth_expire",
        8 => "assoc_leave",
        15 => "4way_handshake_timeout",
        200 => "beacon_timeout",
        201 => "no_ap_found",
        202 => "auth_fail",
        203 => "assoc_fail",
        204 => "handshake_timeout",
        205 => "connection_fail",
        _ => "other",
    }
}
