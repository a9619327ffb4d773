//! Bring-up order shared by every board: decide station vs access point,
//! mark provisioning, then announce whatever is being served.

use crate::config::{PROVISION_PORT, STREAM_PORT};
use crate::connectivity::{BootOutcome, ConnectivityManager, LinkDriver};
use crate::credentials::{CredentialStore, KeyValueStore};
use crate::discovery::{Discovery, ServiceAnnouncer};
use crate::error::BootError;
use crate::types::Credentials;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceRole {
    /// Joined a network; streaming only.
    Station,
    /// Own access point with the provisioning portal next to streaming.
    Provisioning,
}

impl DeviceRole {
    pub const fn from_outcome(outcome: &BootOutcome) -> Self {
        match outcome {
            BootOutcome::Connected { .. } => Self::Station,
            BootOutcome::AccessPoint { .. } => Self::Provisioning,
        }
    }

    pub const fn serves_provisioning(self) -> bool {
        matches!(self, Self::Provisioning)
    }
}

/// Runs the boot decision and the announcements that follow it. The stream
/// server and capture loop run in both roles; the caller starts the
/// provisioning server when the returned role asks for it.
///
/// Announcement failures are logged and left for a later call to retry.
pub async fn bring_up<L, S, A>(
    manager: &mut ConnectivityManager<'_, L>,
    store: &mut CredentialStore<S>,
    compiled: Option<Credentials>,
    discovery: &mut Discovery<A>,
) -> Result<DeviceRole, BootError>
where
    L: LinkDriver,
    S: KeyValueStore,
    A: ServiceAnnouncer,
{
    let outcome = manager.boot(store, compiled).await?;
    let role = DeviceRole::from_outcome(&outcome);
    log::info!("runtime: boot outcome {:?}, role {:?}", outcome, role);

    if role.serves_provisioning() {
        manager.mark_provisioning().await;
        if let Err(err) = discovery.announce_provisioning(PROVISION_PORT) {
            log::warn!("runtime: provisioning announcement failed err={}", err);
        }
    }
    if let Err(err) = discovery.announce_stream(STREAM_PORT) {
        log::warn!("runtime: stream announcement failed err={}", err);
    }
    Ok(role)
}
