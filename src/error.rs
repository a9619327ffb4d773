//! Error types shared across the crate.
//!
//! Collaborator failures (radio, storage, camera, transport) each get their own
//! enum so callers can tell a transient link problem from a fatal setup error.

use thiserror::Error;

/// Failures reported by the radio collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("radio not initialized")]
    NotInitialized,
    #[error("invalid radio configuration")]
    InvalidConfig,
    #[error("radio start failed")]
    StartFailed,
    #[error("connect request rejected")]
    ConnectRejected,
    #[error("scan could not be started")]
    ScanStart,
    #[error("out of memory")]
    NoMem,
    #[error("driver error code {0}")]
    Driver(i32),
}

/// Failures reported by the key-value collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("namespace or key too long")]
    KeyTooLong,
    #[error("value too long")]
    ValueTooLong,
    #[error("buffer too small, need {needed} bytes")]
    BufferTooSmall { needed: usize },
    #[error("store is full")]
    Full,
    #[error("stored record is corrupt")]
    Corrupt,
    #[error("storage read/write failed")]
    Io,
}

/// Rejections when building [`Credentials`](crate::types::Credentials).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CredentialsError {
    #[error("ssid is empty")]
    EmptySsid,
    #[error("ssid longer than {max} bytes")]
    SsidTooLong { max: usize },
    #[error("passphrase longer than {max} bytes")]
    PassphraseTooLong { max: usize },
}

/// Provisioning request failures. Each maps to the status and short body the
/// portal returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ProvisionError {
    #[error("scan could not be started: {0}")]
    ScanStart(LinkError),
    #[error("out of memory")]
    NoMem,
    #[error("malformed request")]
    BadRequest,
    #[error("request body read failed")]
    RecvFailed,
    #[error("ssid is required")]
    SsidRequired,
    #[error("ssid too long")]
    SsidTooLong,
    #[error("passphrase too long")]
    PassTooLong,
    #[error("credential store failed: {0}")]
    Store(StoreError),
}

impl ProvisionError {
    pub const fn status(&self) -> u16 {
        match self {
            Self::BadRequest | Self::SsidRequired | Self::SsidTooLong | Self::PassTooLong => 400,
            Self::ScanStart(_) | Self::NoMem | Self::RecvFailed | Self::Store(_) => 500,
        }
    }

    pub const fn body(&self) -> &'static str {
        match self {
            Self::ScanStart(_) => "scan_start_failed",
            Self::NoMem => "no_mem",
            Self::BadRequest => "bad_request",
            Self::RecvFailed => "recv_failed",
            Self::SsidRequired => "ssid_required",
            Self::SsidTooLong => "ssid_too_long",
            Self::PassTooLong => "pass_too_long",
            Self::Store(_) => "save_failed",
        }
    }
}

/// Camera collaborator failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("camera init failed")]
    InitFailed,
    #[error("pixel format not supported by sensor")]
    NotSupported,
    #[error("camera unavailable after {attempts} init attempts")]
    Unavailable { attempts: u32 },
}

/// Per-session transport failures. Never fatal to the broadcast loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("session closed")]
    Closed,
    #[error("send failed")]
    SendFailed,
    #[error("receive failed")]
    ReceiveFailed,
    #[error("out of memory")]
    NoMem,
}

/// Frame encoding failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("pixel format cannot be encoded")]
    UnsupportedFormat,
    #[error("frame has no pixels")]
    EmptyFrame,
    #[error("out of memory")]
    OutOfMemory,
    #[error("encoder rejected frame")]
    Encoder,
}

/// Raw-frame header decode failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("message too short ({len} bytes)")]
    TooShort { len: usize },
    #[error("raw frame magic mismatch")]
    BadMagic,
    #[error("unsupported raw frame version {0}")]
    UnsupportedVersion(u8),
    #[error("unknown raw pixel format {0}")]
    UnknownFormat(u8),
}

/// Service announcement failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum AnnounceError {
    #[error("responder init failed")]
    Init,
    #[error("service registration failed")]
    Register,
}

/// Unrecoverable boot-sequence errors; a restart is the only remedy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum BootError {
    #[error("radio init failed: {0}")]
    RadioInit(LinkError),
    #[error("station start failed: {0}")]
    Station(LinkError),
    #[error("access point start failed: {0}")]
    AccessPoint(LinkError),
}
