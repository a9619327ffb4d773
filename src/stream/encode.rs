use alloc::borrow::Cow;
use alloc::vec::Vec;

use super::frame::{Frame, PixelFormat};
use super::wire::{RawFormat, RawFrameHeader};
use crate::config::StreamEncoding;
use crate::error::EncodeError;

/// What goes on the wire for one frame.
#[derive(Debug)]
pub enum WireMessage<'a> {
    /// Directly decodable image, no header.
    Compressed(Cow<'a, [u8]>),
    /// Header message followed by a payload message.
    Raw {
        header: RawFrameHeader,
        payload: Cow<'a, [u8]>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodingStrategy {
    Passthrough,
    SoftwareEncode { quality: u8 },
    Raw(RawFormat),
}

impl EncodingStrategy {
    /// Picks the strategy for one frame. Compressed frames are always passed
    /// through; `None` means the pixel format cannot be streamed at all.
    pub fn select(encoding: StreamEncoding, format: PixelFormat, quality: u8) -> Option<Self> {
        match (encoding, format) {
            (_, PixelFormat::Jpeg) => Some(Self::Passthrough),
            (StreamEncoding::Auto, PixelFormat::Rgb565 | PixelFormat::Grayscale) => {
                Some(Self::SoftwareEncode { quality })
            }
            (StreamEncoding::RawColor, PixelFormat::Rgb565) => Some(Self::Raw(RawFormat::Rgb565)),
            (StreamEncoding::RawColor | StreamEncoding::RawLuma, PixelFormat::Grayscale)
            | (StreamEncoding::RawLuma, PixelFormat::Rgb565) => Some(Self::Raw(RawFormat::Gray8)),
            (_, PixelFormat::Yuv422) => None,
        }
    }

    /// Raw framing of the same pixels, used when software encoding fails.
    pub fn fallback(self, format: PixelFormat) -> Option<Self> {
        match (self, format) {
            (Self::SoftwareEncode { .. }, PixelFormat::Rgb565) => Some(Self::Raw(RawFormat::Rgb565)),
            (Self::SoftwareEncode { .. }, PixelFormat::Grayscale) => Some(Self::Raw(RawFormat::Gray8)),
            _ => None,
        }
    }

    pub fn encode<'a>(self, frame: &Frame<'a>) -> Result<WireMessage<'a>, EncodeError> {
        match self {
            Self::Passthrough => {
                if frame.format != PixelFormat::Jpeg {
                    return Err(EncodeError::UnsupportedFormat);
                }
                if frame.data.is_empty() {
                    return Err(EncodeError::EmptyFrame);
                }
                Ok(WireMessage::Compressed(Cow::Borrowed(frame.data)))
            }
            Self::SoftwareEncode { quality } => {
                encode_jpeg(frame, quality).map(|jpeg| WireMessage::Compressed(Cow::Owned(jpeg)))
            }
            Self::Raw(target) => encode_raw(frame, target),
        }
    }
}

/// Dimensions actually covered by the buffer. Drivers may hand out a buffer
/// shorter than `width * height`, so the height is derived from the length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub width: u16,
    pub height: u16,
    pub len: usize,
}

pub fn effective_geometry(frame: &Frame<'_>) -> Result<Geometry, EncodeError> {
    let bytes_per_pixel = match frame.format {
        PixelFormat::Rgb565 => 2,
        PixelFormat::Grayscale => 1,
        PixelFormat::Jpeg | PixelFormat::Yuv422 => return Err(EncodeError::UnsupportedFormat),
    };
    let row_bytes = frame.width as usize * bytes_per_pixel;
    if row_bytes == 0 {
        return Err(EncodeError::EmptyFrame);
    }
    let height = (frame.data.len() / row_bytes).min(u16::MAX as usize);
    let len = row_bytes * height;
    if height == 0 || len == 0 {
        return Err(EncodeError::EmptyFrame);
    }
    Ok(Geometry {
        width: frame.width,
        height: height as u16,
        len,
    })
}

fn encode_raw<'a>(frame: &Frame<'a>, target: RawFormat) -> Result<WireMessage<'a>, EncodeError> {
    let geometry = effective_geometry(frame)?;
    let pixels = &frame.data[..geometry.len];
    let payload = match (frame.format, target) {
        (PixelFormat::Rgb565, RawFormat::Rgb565) | (PixelFormat::Grayscale, RawFormat::Gray8) => {
            Cow::Borrowed(pixels)
        }
        (PixelFormat::Rgb565, RawFormat::Gray8) => Cow::Owned(luma_plane(pixels)?),
        _ => return Err(EncodeError::UnsupportedFormat),
    };
    let header = RawFrameHeader {
        format: target,
        width: geometry.width,
        height: geometry.height,
        payload_len: payload.len() as u32,
    };
    Ok(WireMessage::Raw { header, payload })
}

/// `(r8, g8, b8)` of one big-endian RGB565 pixel, low bits filled by
/// replicating the high ones.
pub fn expand_rgb565(hi: u8, lo: u8) -> (u8, u8, u8) {
    let pixel = u16::from_be_bytes([hi, lo]);
    let r5 = ((pixel >> 11) & 0x1F) as u8;
    let g6 = ((pixel >> 5) & 0x3F) as u8;
    let b5 = (pixel & 0x1F) as u8;
    ((r5 << 3) | (r5 >> 2), (g6 << 2) | (g6 >> 4), (b5 << 3) | (b5 >> 2))
}

/// `Y = (77 R + 150 G + 29 B) >> 8`.
pub fn rgb565_to_luma(hi: u8, lo: u8) -> u8 {
    let (r, g, b) = expand_rgb565(hi, lo);
    let y = r as u16 * 77 + g as u16 * 150 + b as u16 * 29;
    (y >> 8) as u8
}

pub fn luma_plane(rgb565: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    out.try_reserve_exact(rgb565.len() / 2)
        .map_err(|_| EncodeError::OutOfMemory)?;
    out.extend(
        rgb565
            .chunks_exact(2)
            .map(|pixel| rgb565_to_luma(pixel[0], pixel[1])),
    );
    Ok(out)
}

#[cfg(feature = "sw-jpeg")]
fn encode_jpeg(frame: &Frame<'_>, quality: u8) -> Result<Vec<u8>, EncodeError> {
    use jpeg_encoder::{ColorType, Encoder};

    let geometry = effective_geometry(frame)?;
    let pixels = &frame.data[..geometry.len];
    let (source, color) = match frame.format {
        PixelFormat::Rgb565 => (Cow::Owned(rgb888_plane(pixels)?), ColorType::Rgb),
        PixelFormat::Grayscale => (Cow::Borrowed(pixels), ColorType::Luma),
        PixelFormat::Jpeg | PixelFormat::Yuv422 => return Err(EncodeError::UnsupportedFormat),
    };

    let mut out = Vec::new();
    out.try_reserve(source.len() / 8)
        .map_err(|_| EncodeError::OutOfMemory)?;
    Encoder::new(&mut out, quality)
        .encode(&source, geometry.width, geometry.height, color)
        .map_err(|_| EncodeError::Encoder)?;
    if out.is_empty() {
        return Err(EncodeError::Encoder);
    }
    Ok(out)
}

#[cfg(not(feature = "sw-jpeg"))]
fn encode_jpeg(_frame: &Frame<'_>, _quality: u8) -> Result<Vec<u8>, EncodeError> {
    Err(EncodeError::UnsupportedFormat)
}

#[cfg(feature = "sw-jpeg")]
fn rgb888_plane(rgb565: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    out.try_reserve_exact(rgb565.len() / 2 * 3)
        .map_err(|_| EncodeError::OutOfMemory)?;
    for pixel in rgb565.chunks_exact(2) {
        let (r, g, b) = expand_rgb565(pixel[0], pixel[1]);
        out.extend_from_slice(&[r, g, b]);
    }
    Ok(out)
}
