use embedded_storage::{ReadStorage, Storage};
use heapless::{String, Vec};

use super::KeyValueStore;
use crate::error::StoreError;

pub const KV_RECORD_LEN: usize = 1024;
const KV_MAGIC: u32 = u32::from_le_bytes(*b"RCKV");
const KV_VERSION: u8 = 1;
const KV_HEADER_LEN: usize = 6;
const KV_MAX_ENTRIES: usize = 8;
const KV_NAME_MAX: usize = 15;
const KV_VALUE_MAX: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
struct KvEntry {
    namespace: String<KV_NAME_MAX>,
    key: String<KV_NAME_MAX>,
    value: String<KV_VALUE_MAX>,
}

impl KvEntry {
    fn matches(&self, namespace: &str, key: &str) -> bool {
        self.namespace == namespace && self.key == key
    }
}

type KvTable = Vec<KvEntry, KV_MAX_ENTRIES>;

/// Key-value store kept as one checksummed record at a fixed flash offset.
///
/// The table is read on first use; `set`/`erase` only touch RAM until
/// `commit` rewrites the record.
pub struct FlashKvStore<F> {
    flash: F,
    offset: u32,
    table: Option<KvTable>,
}

impl<F: ReadStorage + Storage> FlashKvStore<F> {
    pub fn new(flash: F, offset: u32) -> Self {
        Self {
            flash,
            offset,
            table: None,
        }
    }

    pub fn into_flash(self) -> F {
        self.flash
    }

    fn table(&mut self) -> Result<&mut KvTable, StoreError> {
        if self.table.is_none() {
            let mut record = [0u8; KV_RECORD_LEN];
            self.flash
                .read(self.offset, &mut record)
                .map_err(|_| StoreError::Io)?;
            let table = decode_record(&record).unwrap_or_else(|| {
                log::warn!("kv: record at {:#x} unreadable, starting empty", self.offset);
                KvTable::new()
            });
            self.table = Some(table);
        }
        self.table.as_mut().ok_or(StoreError::Io)
    }
}

impl<F: ReadStorage + Storage> KeyValueStore for FlashKvStore<F> {
    fn get(
        &mut self,
        namespace: &str,
        key: &str,
        out: &mut [u8],
    ) -> Result<Option<usize>, StoreError> {
        let table = self.table()?;
        let Some(entry) = table.iter().find(|entry| entry.matches(namespace, key)) else {
            return Ok(None);
        };
        let value = entry.value.as_bytes();
        if value.len() > out.len() {
            return Err(StoreError::BufferTooSmall {
                needed: value.len(),
            });
        }
        out[..value.len()].copy_from_slice(value);
        Ok(Some(value.len()))
    }

    fn set(&mut self, namespace: &str, key: &str, value: &str) -> Result<(), StoreError> {
        let value: String<KV_VALUE_MAX> =
            String::try_from(value).map_err(|_| StoreError::ValueTooLong)?;
        let table = self.table()?;
        if let Some(entry) = table.iter_mut().find(|entry| entry.matches(namespace, key)) {
            entry.value = value;
            return Ok(());
        }
        let entry = KvEntry {
            namespace: String::try_from(namespace).map_err(|_| StoreError::KeyTooLong)?,
            key: String::try_from(key).map_err(|_| StoreError::KeyTooLong)?,
            value,
        };
        table.push(entry).map_err(|_| StoreError::Full)
    }

    fn erase(&mut self, namespace: &str, key: &str) -> Result<bool, StoreError> {
        let table = self.table()?;
        let before = table.len();
        table.retain(|entry| !entry.matches(namespace, key));
        Ok(table.len() != before)
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        let record = encode_record(self.table()?)?;
        self.flash
            .write(self.offset, &record)
            .map_err(|_| StoreError::Io)
    }
}

fn encode_record(table: &KvTable) -> Result<[u8; KV_RECORD_LEN], StoreError> {
    let mut record = [0xFFu8; KV_RECORD_LEN];
    record[0..4].copy_from_slice(&KV_MAGIC.to_le_bytes());
    record[4] = KV_VERSION;
    record[5] = table.len() as u8;

    let mut cursor = KV_HEADER_LEN;
    for entry in table {
        let fields = [
            entry.namespace.as_bytes(),
            entry.key.as_bytes(),
            entry.value.as_bytes(),
        ];
        let entry_len = 3 + fields.iter().map(|field| field.len()).sum::<usize>();
        if cursor + entry_len > KV_RECORD_LEN - 1 {
            return Err(StoreError::Full);
        }
        for (idx, field) in fields.iter().enumerate() {
            record[cursor + idx] = field.len() as u8;
        }
        cursor += 3;
        for field in fields {
            record[cursor..cursor + field.len()].copy_from_slice(field);
            cursor += field.len();
        }
    }

    record[KV_RECORD_LEN - 1] = checksum8(&record[..KV_RECORD_LEN - 1]);
    Ok(record)
}

fn decode_record(record: &[u8; KV_RECORD_LEN]) -> Option<KvTable> {
    if record.iter().all(|&byte| byte == 0xFF) {
        return Some(KvTable::new());
    }
    if u32::from_le_bytes([record[0], record[1], record[2], record[3]]) != KV_MAGIC {
        return None;
    }
    if record[4] != KV_VERSION {
        return None;
    }
    if checksum8(&record[..KV_RECORD_LEN - 1]) != record[KV_RECORD_LEN - 1] {
        return None;
    }

    let count = record[5] as usize;
    let mut table = KvTable::new();
    let mut cursor = KV_HEADER_LEN;
    for _ in 0..count {
        let lens = record.get(cursor..cursor + 3)?;
        let (ns_len, key_len, value_len) = (lens[0] as usize, lens[1] as usize, lens[2] as usize);
        cursor += 3;
        let namespace = take_str(record, &mut cursor, ns_len)?;
        let key = take_str(record, &mut cursor, key_len)?;
        let value = take_str(record, &mut cursor, value_len)?;
        table
            .push(KvEntry {
                namespace: String::try_from(namespace).ok()?,
                key: String::try_from(key).ok()?,
                value: String::try_from(value).ok()?,
            })
            .ok()?;
    }
    Some(table)
}

fn take_str<'a>(record: &'a [u8], cursor: &mut usize, len: usize) -> Option<&'a str> {
    let end = cursor.checked_add(len)?;
    if end > KV_RECORD_LEN - 1 {
        return None;
    }
    let bytes = record.get(*cursor..end)?;
    *cursor = end;
    core::str::from_utf8(bytes).ok()
}

fn checksum8(bytes: &[u8]) -> u8 {
    let mut acc = 0x5Au8;
    for &byte in bytes {
        acc ^= byte.rotate_left(1);
    }
    acc
}
