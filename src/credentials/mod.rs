//! Durable station credentials on top of the key-value collaborator.

mod flash;

use core::fmt;

pub use flash::{FlashKvStore, KV_RECORD_LEN};

use crate::config::{
    CREDENTIALS_NAMESPACE, LOG_SENSITIVE, PASSPHRASE_KEY, PASSPHRASE_MAX, SSID_KEY, SSID_MAX,
};
use crate::error::StoreError;
use crate::types::Credentials;

/// Namespaced string storage, NVS style: writes become durable on `commit`.
pub trait KeyValueStore {
    /// Copies the value into `out` and returns its length, `None` when absent.
    fn get(&mut self, namespace: &str, key: &str, out: &mut [u8])
        -> Result<Option<usize>, StoreError>;
    fn set(&mut self, namespace: &str, key: &str, value: &str) -> Result<(), StoreError>;
    /// Returns whether the key existed.
    fn erase(&mut self, namespace: &str, key: &str) -> Result<bool, StoreError>;
    fn commit(&mut self) -> Result<(), StoreError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &mut T {
    fn get(
        &mut self,
        namespace: &str,
        key: &str,
        out: &mut [u8],
    ) -> Result<Option<usize>, StoreError> {
        (**self).get(namespace, key, out)
    }

    fn set(&mut self, namespace: &str, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(namespace, key, value)
    }

    fn erase(&mut self, namespace: &str, key: &str) -> Result<bool, StoreError> {
        (**self).erase(namespace, key)
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        (**self).commit()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialSource {
    Stored,
    Compiled,
}

pub struct CredentialStore<S> {
    store: S,
}

impl<S: KeyValueStore> CredentialStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// `Ok(None)` when no ssid is stored or the stored ssid is empty. A missing
    /// passphrase loads as an open network.
    pub fn load(&mut self) -> Result<Option<Credentials>, StoreError> {
        let mut ssid = [0u8; SSID_MAX];
        let Some(ssid_len) = self.store.get(CREDENTIALS_NAMESPACE, SSID_KEY, &mut ssid)? else {
            return Ok(None);
        };
        if ssid_len == 0 {
            return Ok(None);
        }

        let mut passphrase = [0u8; PASSPHRASE_MAX];
        let passphrase_len = self
            .store
            .get(CREDENTIALS_NAMESPACE, PASSPHRASE_KEY, &mut passphrase)?
            .unwrap_or(0);

        let ssid = core::str::from_utf8(&ssid[..ssid_len]).map_err(|_| StoreError::Corrupt)?;
        let passphrase = core::str::from_utf8(&passphrase[..passphrase_len])
            .map_err(|_| StoreError::Corrupt)?;
        let credentials = Credentials::new(ssid, passphrase).map_err(|_| StoreError::Corrupt)?;

        log::info!("wifi: loaded credentials from store ssid='{}'", credentials.ssid());
        log::info!(
            "wifi: loaded credentials from store {}",
            MaskedPassphrase(credentials.passphrase())
        );
        Ok(Some(credentials))
    }

    pub fn save(&mut self, credentials: &Credentials) -> Result<(), StoreError> {
        self.store
            .set(CREDENTIALS_NAMESPACE, SSID_KEY, credentials.ssid())?;
        self.store
            .set(CREDENTIALS_NAMESPACE, PASSPHRASE_KEY, credentials.passphrase())?;
        self.store.commit()?;
        log::info!("wifi: saved credentials ssid='{}'", credentials.ssid());
        log::info!(
            "wifi: saved credentials {}",
            MaskedPassphrase(credentials.passphrase())
        );
        Ok(())
    }

    /// Erases both keys. Succeeds when nothing was stored.
    pub fn forget(&mut self) -> Result<(), StoreError> {
        let had_ssid = self.store.erase(CREDENTIALS_NAMESPACE, SSID_KEY)?;
        let had_passphrase = self.store.erase(CREDENTIALS_NAMESPACE, PASSPHRASE_KEY)?;
        self.store.commit()?;
        log::info!(
            "wifi: cleared stored credentials (had_ssid={} had_pass={})",
            had_ssid,
            had_passphrase
        );
        Ok(())
    }
}

/// Picks the credentials for this boot: store first, then the compiled-in
/// fallback. A store read failure is logged and treated as "nothing stored".
pub fn resolve_credentials<S: KeyValueStore>(
    store: &mut CredentialStore<S>,
    compiled: Option<Credentials>,
) -> Option<(Credentials, CredentialSource)> {
    match store.load() {
        Ok(Some(credentials)) => return Some((credentials, CredentialSource::Stored)),
        Ok(None) => {}
        Err(err) => log::warn!("wifi: credential load failed err={}", err),
    }
    compiled.map(|credentials| (credentials, CredentialSource::Compiled))
}

/// Log-safe rendering of a passphrase: length plus first/last character,
/// or the clear text when `RC_LOG_SENSITIVE` was set at build time.
pub struct MaskedPassphrase<'a>(pub &'a str);

impl fmt::Display for MaskedPassphrase<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_masked(f, self.0, LOG_SENSITIVE)
    }
}

fn write_masked(f: &mut impl fmt::Write, pass: &str, sensitive: bool) -> fmt::Result {
    let len = pass.len();
    if sensitive {
        return write!(f, "pass='{}' (len={})", pass, len);
    }
    let mut chars = pass.chars();
    match (chars.next(), chars.next_back()) {
        (None, _) => write!(f, "pass_len=0"),
        (Some(only), None) => write!(f, "pass_len={} pass_mask='{}'", len, only),
        (Some(first), Some(last)) => {
            write!(f, "pass_len={} pass_mask='{}***{}'", len, first, last)
        }
    }
}
