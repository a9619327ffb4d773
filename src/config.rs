//! Compile-time configuration and the runtime policies derived from it.
//!
//! String settings come from the build environment (`RC_WIFI_SSID=... cargo build`),
//! numeric ones are plain constants. Policies carry `defaults()` and a
//! `sanitized()` pass that clamps values into ranges the radio and camera
//! tolerate.

use crate::types::Credentials;

/// Control vector width: `[forward, backward, left, right, stop]`.
pub const CONTROL_LEN: usize = 5;
pub const SSID_MAX: usize = 32;
pub const PASSPHRASE_MAX: usize = 64;
pub const SCAN_MAX_APS: usize = 20;
/// Practical fan-out cap; sessions past this are not served frames.
pub const MAX_BROADCAST_SESSIONS: usize = 8;

pub const STREAM_PORT: u16 = 8888;
pub const PROVISION_PORT: u16 = 80;
pub const RESTART_DELAY_MS: u64 = 800;
pub const SAVE_BODY_MAX: usize = 1024;

pub const CREDENTIALS_NAMESPACE: &str = "wifi";
pub const SSID_KEY: &str = "ssid";
pub const PASSPHRASE_KEY: &str = "pass";

pub const LOG_SENSITIVE: bool = option_env!("RC_LOG_SENSITIVE").is_some();

pub const MDNS_INSTANCE: &str = env_or(option_env!("RC_MDNS_INSTANCE"), "ESP32-RC-CAR01");
pub const MDNS_HOSTNAME: &str = env_or(option_env!("RC_MDNS_HOSTNAME"), MDNS_INSTANCE);

pub const AP_SSID: &str = env_or(option_env!("RC_AP_SSID"), MDNS_INSTANCE);
pub const AP_PASS: &str = env_or(option_env!("RC_AP_PASS"), "");
pub const AP_CHANNEL: u8 = 1;
/// WPA2 lower bound; shorter non-empty passphrases are rejected by the radio.
pub const AP_PASS_MIN: usize = 8;
pub const AP_MAX_CLIENTS: u8 = 2;

pub const STA_MAX_RETRY_DEFAULT: u8 = 5;
pub const STA_CONNECT_TIMEOUT_DEFAULT_MS: u32 = 15_000;

pub const STREAM_FPS_DEFAULT: i32 = 5;
pub const STREAM_IDLE_DELAY_DEFAULT_MS: u32 = 200;
pub const FRAME_ACQUIRE_TIMEOUT_DEFAULT_MS: u32 = 1_000;
pub const SW_JPEG_QUALITY_DEFAULT: u8 = 80;
// 1 = single attempt, 0 = retry forever.
pub const CAM_INIT_MAX_RETRIES_DEFAULT: u32 = 1;
pub const CAM_INIT_RETRY_DELAY_DEFAULT_MS: u32 = 2_000;

/// Empty (open access point) or a WPA2 passphrase of 8..=64 bytes.
pub const fn is_valid_ap_passphrase(pass: &str) -> bool {
    pass.is_empty() || (pass.len() >= AP_PASS_MIN && pass.len() <= PASSPHRASE_MAX)
}

const _: () = assert!(
    is_valid_ap_passphrase(AP_PASS),
    "RC_AP_PASS must be empty or 8..=64 bytes"
);

const fn env_or(value: Option<&'static str>, default: &'static str) -> &'static str {
    match value {
        Some(value) => value,
        None => default,
    }
}

/// Fallback station credentials baked in at build time, if any.
pub fn compiled_wifi_credentials() -> Option<Credentials> {
    let ssid = option_env!("RC_WIFI_SSID")?;
    let passphrase = option_env!("RC_WIFI_PASS").unwrap_or("");
    Credentials::new(ssid, passphrase).ok()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectivityPolicy {
    pub max_retries: u8,
    pub connect_timeout_ms: u32,
}

impl ConnectivityPolicy {
    pub const fn defaults() -> Self {
        Self {
            max_retries: STA_MAX_RETRY_DEFAULT,
            connect_timeout_ms: STA_CONNECT_TIMEOUT_DEFAULT_MS,
        }
    }

    pub const fn sanitized(self) -> Self {
        Self {
            max_retries: clamp_u8(self.max_retries, 0, 32),
            connect_timeout_ms: clamp_u32(self.connect_timeout_ms, 1_000, 120_000),
        }
    }
}

impl Default for ConnectivityPolicy {
    fn default() -> Self {
        Self::defaults()
    }
}

/// How frames are put on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamEncoding {
    /// Forward compressed frames as-is, software-encode uncompressed ones.
    Auto,
    /// Always send raw 16-bit color behind a raw-frame header.
    RawColor,
    /// Always send raw 8-bit luminance behind a raw-frame header.
    RawLuma,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamPolicy {
    pub target_fps: i32,
    pub idle_poll_ms: u32,
    pub acquire_timeout_ms: u32,
    pub encoding: StreamEncoding,
    pub jpeg_quality: u8,
    pub camera_init_retries: u32,
    pub camera_init_retry_delay_ms: u32,
}

impl StreamPolicy {
    pub const fn defaults() -> Self {
        Self {
            target_fps: STREAM_FPS_DEFAULT,
            idle_poll_ms: STREAM_IDLE_DELAY_DEFAULT_MS,
            acquire_timeout_ms: FRAME_ACQUIRE_TIMEOUT_DEFAULT_MS,
            encoding: StreamEncoding::Auto,
            jpeg_quality: SW_JPEG_QUALITY_DEFAULT,
            camera_init_retries: CAM_INIT_MAX_RETRIES_DEFAULT,
            camera_init_retry_delay_ms: CAM_INIT_RETRY_DELAY_DEFAULT_MS,
        }
    }

    pub const fn sanitized(self) -> Self {
        Self {
            idle_poll_ms: clamp_u32(self.idle_poll_ms, 10, 5_000),
            acquire_timeout_ms: clamp_u32(self.acquire_timeout_ms, 10, 10_000),
            jpeg_quality: clamp_u8(self.jpeg_quality, 1, 100),
            ..self
        }
    }

    /// Inter-frame sleep: `1000 / fps` ms, at least 1 ms, 200 ms when the rate
    /// is not positive.
    pub const fn frame_interval_ms(&self) -> u32 {
        if self.target_fps <= 0 {
            return 200;
        }
        let interval = 1_000 / self.target_fps as u32;
        if interval == 0 {
            1
        } else {
            interval
        }
    }
}

impl Default for StreamPolicy {
    fn default() -> Self {
        Self::defaults()
    }
}

const fn clamp_u32(value: u32, min: u32, max: u32) -> u32 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

const fn clamp_u8(value: u8, min: u8, max: u8) -> u8 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ap_passphrase_bounds() {
        assert!(is_valid_ap_passphrase(""));
        assert!(is_valid_ap_passphrase("12345678"));
        assert!(is_valid_ap_passphrase(&"p".repeat(PASSPHRASE_MAX)));
        assert!(!is_valid_ap_passphrase("1234567"));
        assert!(!is_valid_ap_passphrase(&"p".repeat(70)));
        assert!(is_valid_ap_passphrase(AP_PASS));
    }

    #[test]
    fn frame_interval_follows_rate() {
        let mut policy = StreamPolicy::defaults();
        assert_eq!(policy.frame_interval_ms(), 200);
        policy.target_fps = 20;
        assert_eq!(policy.frame_interval_ms(), 50);
        policy.target_fps = 5_000;
        assert_eq!(policy.frame_interval_ms(), 1);
        policy.target_fps = 0;
        assert_eq!(policy.frame_interval_ms(), 200);
        policy.target_fps = -3;
        assert_eq!(policy.frame_interval_ms(), 200);
    }

    #[test]
    fn sanitized_clamps_out_of_range_values() {
        let policy = StreamPolicy {
            idle_poll_ms: 0,
            jpeg_quality: 0,
            ..StreamPolicy::defaults()
        }
        .sanitized();
        assert_eq!(policy.idle_poll_ms, 10);
        assert_eq!(policy.jpeg_quality, 1);

        let connectivity = ConnectivityPolicy {
            max_retries: 200,
            connect_timeout_ms: 10,
        }
        .sanitized();
        assert_eq!(connectivity.max_retries, 32);
        assert_eq!(connectivity.connect_timeout_ms, 1_000);
    }
}
