use embedded_storage::ReadStorage;
use esp_storage::FlashStorage;

use crate::credentials::{CredentialStore, FlashKvStore};

pub type FlashCredentialStore = CredentialStore<FlashKvStore<FlashStorage<'static>>>;

/// Credentials live in the last flash sector.
pub fn credential_store(flash: esp_hal::peripherals::FLASH<'static>) -> FlashCredentialStore {
    let flash = FlashStorage::new(flash).multicore_auto_park();
    let capacity = flash.capacity() as u32;
    let offset = capacity.saturating_sub(FlashStorage::SECTOR_SIZE);
    CredentialStore::new(FlashKvStore::new(flash, offset))
}
