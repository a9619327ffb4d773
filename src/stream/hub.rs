use heapless::Vec;

use super::encode::WireMessage;
use crate::config::MAX_BROADCAST_SESSIONS;
use crate::error::TransportError;
use crate::telemetry::Telemetry;
use crate::types::SessionId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    /// Completed the WebSocket upgrade; plain HTTP clients are never sent frames.
    pub upgraded: bool,
}

pub type SessionList = Vec<SessionInfo, MAX_BROADCAST_SESSIONS>;

/// Streaming server as seen by the broadcast loop and the control channel.
#[allow(async_fn_in_trait)]
pub trait ViewerHub {
    fn is_running(&self) -> bool;

    /// Fills `out` with the currently open sessions. Sessions past the list's
    /// capacity are dropped from the snapshot.
    fn snapshot_sessions(&self, out: &mut SessionList);

    async fn send_binary(&self, session: SessionId, payload: &[u8]) -> Result<(), TransportError>;

    async fn close(&self, session: SessionId);
}

pub fn upgraded_sessions<H: ViewerHub>(hub: &H) -> SessionList {
    let mut sessions = SessionList::new();
    hub.snapshot_sessions(&mut sessions);
    sessions.retain(|session| session.upgraded);
    sessions
}

pub fn has_viewers<H: ViewerHub>(hub: &H) -> bool {
    hub.is_running() && !upgraded_sessions(hub).is_empty()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Sends `message` to every upgraded session. A failing session is counted
/// and skipped; it never stops delivery to the rest.
pub async fn broadcast<H: ViewerHub>(
    hub: &H,
    message: &WireMessage<'_>,
    telemetry: &Telemetry,
) -> BroadcastReport {
    let mut report = BroadcastReport::default();
    for session in upgraded_sessions(hub) {
        match send_to(hub, session.id, message).await {
            Ok(()) => report.delivered += 1,
            Err(err) => {
                report.failed += 1;
                telemetry.record_send_failure();
                log::debug!("stream: send failed session={} err={}", session.id, err);
            }
        }
    }
    report
}

async fn send_to<H: ViewerHub>(
    hub: &H,
    session: SessionId,
    message: &WireMessage<'_>,
) -> Result<(), TransportError> {
    match message {
        WireMessage::Compressed(bytes) => hub.send_binary(session, bytes.as_ref()).await,
        WireMessage::Raw { header, payload } => {
            // Two writes per session keep header and payload adjacent on the wire.
            hub.send_binary(session, &header.encode()).await?;
            hub.send_binary(session, payload.as_ref()).await
        }
    }
}
