//! Camera capture and fan-out to connected viewers.

pub mod encode;
pub mod frame;
pub mod hub;
pub mod wire;

use core::convert::Infallible;

use embassy_time::{Duration, Timer};

pub use encode::{EncodingStrategy, WireMessage};
pub use frame::{Camera, Frame, FrameGuard, PixelFormat};
pub use hub::{broadcast, has_viewers, BroadcastReport, SessionInfo, SessionList, ViewerHub};
pub use wire::{is_raw_frame, RawFormat, RawFrameHeader, RAW_HEADER_LEN};

use crate::config::StreamPolicy;
use crate::error::{CameraError, EncodeError};
use crate::telemetry::Telemetry;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Server down or nobody upgraded; no frame was acquired.
    Idle,
    NoFrame,
    /// Frame acquired but not streamable.
    Skipped(EncodeError),
    Sent(BroadcastReport),
}

pub struct BroadcastPipeline<'a, C, H> {
    camera: C,
    hub: &'a H,
    policy: StreamPolicy,
    telemetry: &'a Telemetry,
}

impl<'a, C: Camera, H: ViewerHub> BroadcastPipeline<'a, C, H> {
    pub fn new(camera: C, hub: &'a H, policy: StreamPolicy, telemetry: &'a Telemetry) -> Self {
        Self {
            camera,
            hub,
            policy: policy.sanitized(),
            telemetry,
        }
    }

    /// Brings the sensor up, retrying per policy (`0` retries forever).
    pub async fn init_camera(&mut self) -> Result<(), CameraError> {
        let max_attempts = self.policy.camera_init_retries;
        let mut attempts = 0u32;
        loop {
            attempts = attempts.saturating_add(1);
            match self.camera.init().await {
                Ok(()) => {
                    log::info!("stream: camera ready attempts={}", attempts);
                    return Ok(());
                }
                Err(err) => log::error!("stream: camera init failed attempt={} err={}", attempts, err),
            }
            if max_attempts != 0 && attempts >= max_attempts {
                return Err(CameraError::Unavailable { attempts });
            }
            Timer::after(Duration::from_millis(
                self.policy.camera_init_retry_delay_ms as u64,
            ))
            .await;
        }
    }

    /// One gated capture/encode/broadcast cycle. The frame buffer is back with
    /// the camera by the time this returns.
    pub async fn step(&mut self) -> StepOutcome {
        if !has_viewers(self.hub) {
            return StepOutcome::Idle;
        }

        let timeout = Duration::from_millis(self.policy.acquire_timeout_ms as u64);
        let Some(guard) = FrameGuard::acquire(&mut self.camera, timeout).await else {
            return StepOutcome::NoFrame;
        };
        self.telemetry.record_frame_acquired();
        let frame = guard.frame();

        let Some(strategy) =
            EncodingStrategy::select(self.policy.encoding, frame.format, self.policy.jpeg_quality)
        else {
            log::warn!("stream: unsupported pixel format {:?}", frame.format);
            return StepOutcome::Skipped(EncodeError::UnsupportedFormat);
        };

        let message = match strategy.encode(&frame) {
            Ok(message) => message,
            Err(err) => {
                let Some(fallback) = strategy.fallback(frame.format) else {
                    log::debug!("stream: frame skipped err={}", err);
                    return StepOutcome::Skipped(err);
                };
                log::debug!("stream: software encode failed err={}, sending raw", err);
                self.telemetry.record_encode_fallback();
                match fallback.encode(&frame) {
                    Ok(message) => message,
                    Err(err) => {
                        log::debug!("stream: frame skipped err={}", err);
                        return StepOutcome::Skipped(err);
                    }
                }
            }
        };

        match (&message, strategy) {
            (WireMessage::Raw { .. }, _) => self.telemetry.record_frame_raw(),
            (WireMessage::Compressed(_), EncodingStrategy::Passthrough) => {
                self.telemetry.record_frame_passthrough()
            }
            (WireMessage::Compressed(_), _) => self.telemetry.record_frame_encoded(),
        }

        let report = broadcast(self.hub, &message, self.telemetry).await;
        drop(message);
        drop(guard);
        StepOutcome::Sent(report)
    }

    /// Capture loop. Returns only when the camera never came up; the rest of
    /// the system keeps running without video.
    pub async fn run(mut self) -> Result<Infallible, CameraError> {
        if let Err(err) = self.init_camera().await {
            log::warn!("stream: capture stopped, {}", err);
            return Err(err);
        }

        loop {
            let pause_ms = match self.step().await {
                StepOutcome::Idle => self.policy.idle_poll_ms,
                _ => self.policy.frame_interval_ms(),
            };
            Timer::after(Duration::from_millis(pause_ms as u64)).await;
        }
    }
}
