//! Inbound control vector published for the actuator side.

#[cfg(test)]
mod tests;

use core::cell::RefCell;
use core::fmt;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};

use crate::config::CONTROL_LEN;
use crate::error::TransportError;
use crate::stream::ViewerHub;
use crate::telemetry::Telemetry;
use crate::types::SessionId;

/// `[forward, backward, left, right, stop]`, one flag or magnitude per byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControlVector([u8; CONTROL_LEN]);

impl ControlVector {
    pub const ZERO: Self = Self([0; CONTROL_LEN]);

    /// `None` unless `bytes` is exactly one vector long.
    pub fn from_message(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; CONTROL_LEN] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; CONTROL_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn forward(&self) -> u8 {
        self.0[0]
    }

    pub fn backward(&self) -> u8 {
        self.0[1]
    }

    pub fn left(&self) -> u8 {
        self.0[2]
    }

    pub fn right(&self) -> u8 {
        self.0[3]
    }

    pub fn stop(&self) -> u8 {
        self.0[4]
    }
}

impl fmt::Display for ControlVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UP:{} DOWN:{} LEFT:{} RIGHT:{} STOP:{}",
            self.forward(),
            self.backward(),
            self.left(),
            self.right(),
            self.stop()
        )
    }
}

/// One message received on a duplex session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InboundMessage<'a> {
    Binary(&'a [u8]),
    Text(&'a str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlOutcome {
    Updated(ControlVector),
    Unchanged,
    /// Binary payload of a length this build does not understand.
    Ignored { len: usize },
    Diagnostic,
}

#[derive(Clone, Copy)]
struct Published {
    vector: ControlVector,
    writer: Option<SessionId>,
}

/// Latest control vector plus the session that wrote it.
///
/// Updates replace the whole vector under one lock, so readers never see a
/// half-applied message.
pub struct ControlState<'a> {
    published: Mutex<CriticalSectionRawMutex, RefCell<Published>>,
    telemetry: &'a Telemetry,
}

impl<'a> ControlState<'a> {
    pub const fn new(telemetry: &'a Telemetry) -> Self {
        Self {
            published: Mutex::new(RefCell::new(Published {
                vector: ControlVector::ZERO,
                writer: None,
            })),
            telemetry,
        }
    }

    pub fn read(&self) -> ControlVector {
        self.published.lock(|published| published.borrow().vector)
    }

    pub fn on_message(&self, session: SessionId, message: InboundMessage<'_>) -> ControlOutcome {
        match message {
            InboundMessage::Text(text) => {
                log::info!("control: [WS Text] {}", text);
                ControlOutcome::Diagnostic
            }
            InboundMessage::Binary(bytes) => {
                let Some(vector) = ControlVector::from_message(bytes) else {
                    self.telemetry.record_control_ignored();
                    log::debug!(
                        "control: ignoring binary message session={} len={}",
                        session,
                        bytes.len()
                    );
                    return ControlOutcome::Ignored { len: bytes.len() };
                };
                let changed = self.published.lock(|published| {
                    let mut published = published.borrow_mut();
                    published.writer = Some(session);
                    if published.vector == vector {
                        return false;
                    }
                    published.vector = vector;
                    true
                });
                if !changed {
                    return ControlOutcome::Unchanged;
                }
                self.telemetry.record_control_update();
                log::info!("control: [RC State] {}", vector);
                ControlOutcome::Updated(vector)
            }
        }
    }

    /// Clears the vector when `session` was its last writer.
    pub fn on_session_closed(&self, session: SessionId) {
        let cleared = self.published.lock(|published| {
            let mut published = published.borrow_mut();
            if published.writer != Some(session) {
                return false;
            }
            published.writer = None;
            let was_set = !published.vector.is_zero();
            published.vector = ControlVector::ZERO;
            was_set
        });
        if cleared {
            log::info!("control: session={} closed, vector cleared", session);
        }
    }

    /// Closes only the failing session. The vector and the other sessions
    /// are untouched, even when the failing session was the last writer;
    /// clearing belongs to the disconnect path.
    pub async fn on_receive_error<H: ViewerHub>(
        &self,
        hub: &H,
        session: SessionId,
        err: TransportError,
    ) {
        log::warn!("control: receive failed session={} err={}", session, err);
        hub.close(session).await;
    }

    pub fn clear(&self) {
        let was_set = self.published.lock(|published| {
            let mut published = published.borrow_mut();
            published.writer = None;
            let was_set = !published.vector.is_zero();
            published.vector = ControlVector::ZERO;
            was_set
        });
        if was_set {
            log::info!("control: vector cleared");
        }
    }
}
