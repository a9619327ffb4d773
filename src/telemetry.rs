//! Relaxed event counters shared by the connectivity, streaming and control
//! paths. Counters wrap on overflow.

use core::sync::atomic::{AtomicU32, Ordering};

pub struct Telemetry {
    sta_connect_attempts: AtomicU32,
    sta_disconnects: AtomicU32,
    link_ups: AtomicU32,
    ap_fallbacks: AtomicU32,
    frames_acquired: AtomicU32,
    frames_passthrough: AtomicU32,
    frames_encoded: AtomicU32,
    frames_raw: AtomicU32,
    encode_fallbacks: AtomicU32,
    session_send_failures: AtomicU32,
    control_updates: AtomicU32,
    control_ignored: AtomicU32,
    provisioning_requests: AtomicU32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub sta_connect_attempts: u32,
    pub sta_disconnects: u32,
    pub link_ups: u32,
    pub ap_fallbacks: u32,
    pub frames_acquired: u32,
    pub frames_passthrough: u32,
    pub frames_encoded: u32,
    pub frames_raw: u32,
    pub encode_fallbacks: u32,
    pub session_send_failures: u32,
    pub control_updates: u32,
    pub control_ignored: u32,
    pub provisioning_requests: u32,
}

impl Telemetry {
    pub const fn new() -> Self {
        Self {
            sta_connect_attempts: AtomicU32::new(0),
            sta_disconnects: AtomicU32::new(0),
            link_ups: AtomicU32::new(0),
            ap_fallbacks: AtomicU32::new(0),
            frames_acquired: AtomicU32::new(0),
            frames_passthrough: AtomicU32::new(0),
            frames_encoded: AtomicU32::new(0),
            frames_raw: AtomicU32::new(0),
            encode_fallbacks: AtomicU32::new(0),
            session_send_failures: AtomicU32::new(0),
            control_updates: AtomicU32::new(0),
            control_ignored: AtomicU32::new(0),
            provisioning_requests: AtomicU32::new(0),
        }
    }

    pub fn record_connect_attempt(&self) {
        bump(&self.sta_connect_attempts);
    }

    pub fn record_disconnect(&self) {
        bump(&self.sta_disconnects);
    }

    pub fn record_link_up(&self) {
        bump(&self.link_ups);
    }

    pub fn record_ap_fallback(&self) {
        bump(&self.ap_fallbacks);
    }

    pub fn record_frame_acquired(&self) {
        bump(&self.frames_acquired);
    }

    pub fn record_frame_passthrough(&self) {
        bump(&self.frames_passthrough);
    }

    pub fn record_frame_encoded(&self) {
        bump(&self.frames_encoded);
    }

    pub fn record_frame_raw(&self) {
        bump(&self.frames_raw);
    }

    pub fn record_encode_fallback(&self) {
        bump(&self.encode_fallbacks);
    }

    pub fn record_send_failure(&self) {
        bump(&self.session_send_failures);
    }

    pub fn record_control_update(&self) {
        bump(&self.control_updates);
    }

    pub fn record_control_ignored(&self) {
        bump(&self.control_ignored);
    }

    pub fn record_provisioning_request(&self) {
        bump(&self.provisioning_requests);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            sta_connect_attempts: load(&self.sta_connect_attempts),
            sta_disconnects: load(&self.sta_disconnects),
            link_ups: load(&self.link_ups),
            ap_fallbacks: load(&self.ap_fallbacks),
            frames_acquired: load(&self.frames_acquired),
            frames_passthrough: load(&self.frames_passthrough),
            frames_encoded: load(&self.frames_encoded),
            frames_raw: load(&self.frames_raw),
            encode_fallbacks: load(&self.encode_fallbacks),
            session_send_failures: load(&self.session_send_failures),
            control_updates: load(&self.control_updates),
            control_ignored: load(&self.control_ignored),
            provisioning_requests: load(&self.provisioning_requests),
        }
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

fn bump(counter: &AtomicU32) {
    counter.fetch_add(1, Ordering::Relaxed);
}

fn load(counter: &AtomicU32) -> u32 {
    counter.load(Ordering::Relaxed)
}
