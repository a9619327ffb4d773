//! Provisioning portal served while the access point is up: scan, save and
//! forget credentials, then restart into the new configuration.

pub mod form;
pub mod http;
pub mod portal;
pub mod restart;

use alloc::string::String;
use alloc::vec::Vec;

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex};
use embassy_time::Duration;
use serde::Serialize;

pub use http::{handle_connection, HttpError, HEADER_BUF_LEN};
pub use restart::{run_restart_timer, RestartSignal};

use crate::config::{RESTART_DELAY_MS, SCAN_MAX_APS};
use crate::connectivity::{LinkDriver, ScanResults, SharedLink};
use crate::credentials::{CredentialStore, KeyValueStore, MaskedPassphrase};
use crate::error::{CredentialsError, ProvisionError};
use crate::telemetry::Telemetry;
use crate::types::Credentials;

#[derive(Serialize)]
struct ScanReply<'r> {
    aps: Vec<ApEntry<'r>>,
}

#[derive(Serialize)]
struct ApEntry<'r> {
    ssid: &'r str,
    rssi: i8,
}

pub struct ProvisioningService<'a, L, S> {
    link: &'a SharedLink<L>,
    store: Mutex<CriticalSectionRawMutex, CredentialStore<S>>,
    restart: &'a RestartSignal,
    telemetry: &'a Telemetry,
}

impl<'a, L: LinkDriver, S: KeyValueStore> ProvisioningService<'a, L, S> {
    pub fn new(
        link: &'a SharedLink<L>,
        store: CredentialStore<S>,
        restart: &'a RestartSignal,
        telemetry: &'a Telemetry,
    ) -> Self {
        Self {
            link,
            store: Mutex::new(store),
            restart,
            telemetry,
        }
    }

    pub fn into_store(self) -> CredentialStore<S> {
        self.store.into_inner()
    }

    /// Blocking scan, at most [`SCAN_MAX_APS`] entries in driver order.
    pub async fn scan(&self) -> Result<ScanResults, ProvisionError> {
        self.telemetry.record_provisioning_request();
        let mut records = self
            .link
            .lock()
            .await
            .scan(SCAN_MAX_APS)
            .await
            .map_err(|err| {
                log::warn!("provision: scan failed err={}", err);
                ProvisionError::ScanStart(err)
            })?;
        records.truncate(SCAN_MAX_APS);
        log::info!("provision: scan found={}", records.len());
        Ok(records)
    }

    /// `{"aps":[{"ssid":..,"rssi":..}]}`
    pub async fn scan_json(&self) -> Result<String, ProvisionError> {
        let records = self.scan().await?;
        let mut aps = Vec::new();
        aps.try_reserve_exact(records.len())
            .map_err(|_| ProvisionError::NoMem)?;
        aps.extend(records.iter().map(|record| ApEntry {
            ssid: &record.ssid,
            rssi: record.rssi,
        }));
        serde_json::to_string(&ScanReply { aps }).map_err(|_| ProvisionError::NoMem)
    }

    /// Validates and persists, then schedules a restart. Nothing is written
    /// when validation fails.
    pub async fn save(&self, ssid: &str, passphrase: &str) -> Result<(), ProvisionError> {
        self.telemetry.record_provisioning_request();
        log::info!(
            "provision: save request ssid='{}' {}",
            ssid,
            MaskedPassphrase(passphrase)
        );
        let credentials = Credentials::new(ssid, passphrase).map_err(|err| match err {
            CredentialsError::EmptySsid => ProvisionError::SsidRequired,
            CredentialsError::SsidTooLong { .. } => ProvisionError::SsidTooLong,
            CredentialsError::PassphraseTooLong { .. } => ProvisionError::PassTooLong,
        })?;

        self.store.lock().await.save(&credentials).map_err(|err| {
            log::error!("provision: save failed err={}", err);
            ProvisionError::Store(err)
        })?;
        self.restart
            .schedule(Duration::from_millis(RESTART_DELAY_MS));
        Ok(())
    }

    /// Erases stored credentials and schedules a restart. A store error is
    /// logged only: the restart still happens.
    pub async fn forget(&self) {
        self.telemetry.record_provisioning_request();
        if let Err(err) = self.store.lock().await.forget() {
            log::warn!("provision: forget failed err={}", err);
        }
        self.restart
            .schedule(Duration::from_millis(RESTART_DELAY_MS));
    }
}
