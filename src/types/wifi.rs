use core::fmt::Write as _;

use heapless::String;

use crate::config::{AP_CHANNEL, AP_MAX_CLIENTS, AP_PASS, AP_SSID, PASSPHRASE_MAX, SSID_MAX};
use crate::error::CredentialsError;

/// Station credentials. The ssid is never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    ssid: String<SSID_MAX>,
    passphrase: String<PASSPHRASE_MAX>,
}

impl Credentials {
    pub fn new(ssid: &str, passphrase: &str) -> Result<Self, CredentialsError> {
        if ssid.is_empty() {
            return Err(CredentialsError::EmptySsid);
        }
        let ssid = String::try_from(ssid)
            .map_err(|_| CredentialsError::SsidTooLong { max: SSID_MAX })?;
        let passphrase = String::try_from(passphrase).map_err(|_| {
            CredentialsError::PassphraseTooLong {
                max: PASSPHRASE_MAX,
            }
        })?;
        Ok(Self { ssid, passphrase })
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    pub fn is_open(&self) -> bool {
        self.passphrase.is_empty()
    }
}

/// One entry of a provisioning scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanRecord {
    pub ssid: String<SSID_MAX>,
    pub rssi: i8,
}

impl ScanRecord {
    /// Builds a record, truncating over-long names at a char boundary.
    pub fn new(ssid: &str, rssi: i8) -> Self {
        let mut name = String::new();
        for ch in ssid.chars() {
            if name.push(ch).is_err() {
                break;
            }
        }
        Self { ssid: name, rssi }
    }
}

/// Parameters for the provisioning access point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessPointConfig {
    pub ssid: String<SSID_MAX>,
    pub passphrase: String<PASSPHRASE_MAX>,
    pub channel: u8,
    pub max_clients: u8,
}

impl AccessPointConfig {
    /// Configured AP name suffixed with the last two MAC bytes, so two vehicles
    /// powered up side by side do not advertise the same network.
    pub fn for_device(mac: [u8; 6]) -> Self {
        let mut ssid = String::<SSID_MAX>::new();
        let suffix_len = 5;
        for ch in AP_SSID.chars() {
            if ssid.len() + ch.len_utf8() + suffix_len > SSID_MAX {
                break;
            }
            let _ = ssid.push(ch);
        }
        let _ = write!(ssid, "-{:02X}{:02X}", mac[4], mac[5]);

        // AP_PASS is bounded at build time, see `config::is_valid_ap_passphrase`.
        let passphrase = String::try_from(AP_PASS).unwrap_or_default();

        Self {
            ssid,
            passphrase,
            channel: AP_CHANNEL,
            max_clients: AP_MAX_CLIENTS,
        }
    }

    pub fn is_open(&self) -> bool {
        self.passphrase.is_empty()
    }
}
