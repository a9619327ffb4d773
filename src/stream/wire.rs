//! Header carried in front of every uncompressed frame.
//!
//! ```text
//! [0..4)   b"RAWH"
//! [4]      version (1)
//! [5]      format (0 = RGB565, 1 = GRAY8)
//! [6..8)   width, u16 LE
//! [8..10)  height, u16 LE
//! [10..14) payload length, u32 LE
//! ```
//!
//! Compressed frames go out bare. A JPEG always starts with `FF D8`, so a
//! receiver can never mistake one for this magic.

use crate::error::WireError;

pub const RAW_MAGIC: [u8; 4] = *b"RAWH";
pub const RAW_VERSION: u8 = 1;
pub const RAW_HEADER_LEN: usize = 14;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RawFormat {
    Rgb565 = 0,
    Gray8 = 1,
}

impl RawFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb565 => 2,
            Self::Gray8 => 1,
        }
    }

    fn from_tag(tag: u8) -> Result<Self, WireError> {
        match tag {
            0 => Ok(Self::Rgb565),
            1 => Ok(Self::Gray8),
            other => Err(WireError::UnknownFormat(other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawFrameHeader {
    pub format: RawFormat,
    pub width: u16,
    pub height: u16,
    pub payload_len: u32,
}

impl RawFrameHeader {
    pub fn encode(&self) -> [u8; RAW_HEADER_LEN] {
        let mut out = [0u8; RAW_HEADER_LEN];
        out[0..4].copy_from_slice(&RAW_MAGIC);
        out[4] = RAW_VERSION;
        out[5] = self.format as u8;
        out[6..8].copy_from_slice(&self.width.to_le_bytes());
        out[8..10].copy_from_slice(&self.height.to_le_bytes());
        out[10..14].copy_from_slice(&self.payload_len.to_le_bytes());
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() < RAW_HEADER_LEN {
            return Err(WireError::TooShort { len: bytes.len() });
        }
        if bytes[0..4] != RAW_MAGIC {
            return Err(WireError::BadMagic);
        }
        if bytes[4] != RAW_VERSION {
            return Err(WireError::UnsupportedVersion(bytes[4]));
        }
        Ok(Self {
            format: RawFormat::from_tag(bytes[5])?,
            width: u16::from_le_bytes([bytes[6], bytes[7]]),
            height: u16::from_le_bytes([bytes[8], bytes[9]]),
            payload_len: u32::from_le_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]),
        })
    }
}

/// True when `message` opens with the raw-frame magic. Anything else is a
/// directly decodable compressed image.
pub fn is_raw_frame(message: &[u8]) -> bool {
    message.len() >= RAW_MAGIC.len() && message[..RAW_MAGIC.len()] == RAW_MAGIC
}
