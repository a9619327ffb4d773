//! In-memory collaborators for unit tests.

use core::cell::RefCell;
use core::convert::Infallible;
use std::collections::{BTreeMap, VecDeque};
use std::string::{String, ToString};
use std::vec::Vec;

use embedded_io_async::{ErrorType, Read, Write};
use embedded_storage::{ReadStorage, Storage};
use embassy_time::Duration;

use crate::connectivity::{LinkDriver, LinkEvent, LinkEvents, ScanResults};
use crate::credentials::KeyValueStore;
use crate::discovery::{ServiceAnnouncer, ServiceSpec};
use crate::error::{AnnounceError, CameraError, LinkError, StoreError, TransportError};
use crate::stream::{Camera, Frame, PixelFormat, SessionInfo, SessionList, ViewerHub};
use crate::types::{AccessPointConfig, Credentials, ScanRecord, SessionId};

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    pub entries: BTreeMap<(String, String), String>,
    pub commits: usize,
    pub fail_get: bool,
    pub fail_set: bool,
    pub fail_commit: bool,
}

impl MemoryKvStore {
    pub fn value(&self, namespace: &str, key: &str) -> Option<&str> {
        self.entries
            .get(&(namespace.to_string(), key.to_string()))
            .map(String::as_str)
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(
        &mut self,
        namespace: &str,
        key: &str,
        out: &mut [u8],
    ) -> Result<Option<usize>, StoreError> {
        if self.fail_get {
            return Err(StoreError::Io);
        }
        let Some(value) = self.value(namespace, key) else {
            return Ok(None);
        };
        if value.len() > out.len() {
            return Err(StoreError::BufferTooSmall {
                needed: value.len(),
            });
        }
        out[..value.len()].copy_from_slice(value.as_bytes());
        Ok(Some(value.len()))
    }

    fn set(&mut self, namespace: &str, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_set {
            return Err(StoreError::Io);
        }
        self.entries
            .insert((namespace.to_string(), key.to_string()), value.to_string());
        Ok(())
    }

    fn erase(&mut self, namespace: &str, key: &str) -> Result<bool, StoreError> {
        Ok(self
            .entries
            .remove(&(namespace.to_string(), key.to_string()))
            .is_some())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if self.fail_commit {
            return Err(StoreError::Io);
        }
        self.commits += 1;
        Ok(())
    }
}

/// Byte-addressed flash image, erased to `0xFF`.
pub struct RamFlash {
    pub bytes: Vec<u8>,
}

impl RamFlash {
    pub fn new(len: usize) -> Self {
        Self {
            bytes: vec![0xFF; len],
        }
    }

    fn range(&self, offset: u32, len: usize) -> Result<core::ops::Range<usize>, ()> {
        let start = offset as usize;
        let end = start.checked_add(len).ok_or(())?;
        if end > self.bytes.len() {
            return Err(());
        }
        Ok(start..end)
    }
}

impl ReadStorage for RamFlash {
    type Error = ();

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, bytes.len())?;
        bytes.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.bytes.len()
    }
}

impl Storage for RamFlash {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, bytes.len())?;
        self.bytes[range].copy_from_slice(bytes);
        Ok(())
    }
}

/// Radio that answers each `connect` with the next batch of scripted events.
pub struct ScriptedLink<'a> {
    events: &'a LinkEvents,
    pub connect_script: VecDeque<Vec<LinkEvent>>,
    pub connect_calls: usize,
    pub station: Option<Credentials>,
    pub access_point: Option<AccessPointConfig>,
    pub access_point_starts: usize,
    pub scan_results: Vec<ScanRecord>,
    pub scan_calls: usize,
    pub fail_scan: bool,
    pub fail_access_point: bool,
    pub mac: [u8; 6],
}

impl<'a> ScriptedLink<'a> {
    pub fn new(events: &'a LinkEvents) -> Self {
        Self {
            events,
            connect_script: VecDeque::new(),
            connect_calls: 0,
            station: None,
            access_point: None,
            access_point_starts: 0,
            scan_results: Vec::new(),
            scan_calls: 0,
            fail_scan: false,
            fail_access_point: false,
            mac: [0x24, 0x6F, 0x28, 0x00, 0xC0, 0x01],
        }
    }

    pub fn on_connect(mut self, events: &[LinkEvent]) -> Self {
        self.connect_script.push_back(events.to_vec());
        self
    }
}

impl LinkDriver for ScriptedLink<'_> {
    async fn start_station(&mut self, credentials: &Credentials) -> Result<(), LinkError> {
        self.station = Some(credentials.clone());
        Ok(())
    }

    async fn connect(&mut self) -> Result<(), LinkError> {
        self.connect_calls += 1;
        if let Some(batch) = self.connect_script.pop_front() {
            for event in batch {
                self.events
                    .try_send(event)
                    .map_err(|_| LinkError::ConnectRejected)?;
            }
        }
        Ok(())
    }

    async fn start_access_point(&mut self, config: &AccessPointConfig) -> Result<(), LinkError> {
        if self.fail_access_point {
            return Err(LinkError::StartFailed);
        }
        self.access_point_starts += 1;
        self.access_point = Some(config.clone());
        Ok(())
    }

    async fn scan(&mut self, max: usize) -> Result<ScanResults, LinkError> {
        self.scan_calls += 1;
        if self.fail_scan {
            return Err(LinkError::ScanStart);
        }
        let mut results = ScanResults::new();
        for record in self.scan_results.iter().take(max) {
            if results.push(record.clone()).is_err() {
                break;
            }
        }
        Ok(results)
    }

    fn mac_address(&self) -> [u8; 6] {
        self.mac
    }
}

pub struct ScriptedFrame {
    pub data: Vec<u8>,
    pub width: u16,
    pub height: u16,
    pub format: PixelFormat,
}

impl ScriptedFrame {
    pub fn jpeg(len: usize) -> Self {
        let mut data = vec![0u8; len.max(4)];
        data[..2].copy_from_slice(&[0xFF, 0xD8]);
        let end = data.len();
        data[end - 2..].copy_from_slice(&[0xFF, 0xD9]);
        Self {
            data,
            width: 320,
            height: 240,
            format: PixelFormat::Jpeg,
        }
    }

    pub fn pixels(format: PixelFormat, width: u16, height: u16, fill: u8) -> Self {
        let bytes_per_pixel = match format {
            PixelFormat::Rgb565 | PixelFormat::Yuv422 => 2,
            PixelFormat::Grayscale | PixelFormat::Jpeg => 1,
        };
        Self {
            data: vec![fill; width as usize * height as usize * bytes_per_pixel],
            width,
            height,
            format,
        }
    }
}

/// Camera that hands out its frames in order, then reports timeouts.
#[derive(Default)]
pub struct ScriptedCamera {
    pub frames: Vec<ScriptedFrame>,
    next: usize,
    pub init_results: VecDeque<Result<(), CameraError>>,
    pub init_calls: usize,
    pub acquired: usize,
    pub released: Vec<usize>,
    pub outstanding: usize,
}

impl ScriptedCamera {
    pub fn with_frames(frames: Vec<ScriptedFrame>) -> Self {
        Self {
            frames,
            ..Self::default()
        }
    }
}

impl Camera for ScriptedCamera {
    type Handle = usize;

    async fn init(&mut self) -> Result<(), CameraError> {
        self.init_calls += 1;
        self.init_results.pop_front().unwrap_or(Ok(()))
    }

    async fn acquire(&mut self, _timeout: Duration) -> Option<usize> {
        if self.next >= self.frames.len() {
            return None;
        }
        let handle = self.next;
        self.next += 1;
        self.acquired += 1;
        self.outstanding += 1;
        Some(handle)
    }

    fn frame<'a>(&'a self, handle: &'a usize) -> Frame<'a> {
        let frame = &self.frames[*handle];
        Frame {
            data: &frame.data,
            width: frame.width,
            height: frame.height,
            format: frame.format,
        }
    }

    fn release(&mut self, handle: &usize) {
        self.outstanding -= 1;
        self.released.push(*handle);
    }
}

#[derive(Default)]
struct HubState {
    running: bool,
    sessions: Vec<SessionInfo>,
    failing: Vec<SessionId>,
    sent: Vec<(SessionId, Vec<u8>)>,
    closed: Vec<SessionId>,
}

/// Transport that records every message per session.
pub struct RecordingHub {
    state: RefCell<HubState>,
}

impl RecordingHub {
    pub fn with_sessions(ids: &[SessionId]) -> Self {
        let sessions = ids
            .iter()
            .map(|&id| SessionInfo { id, upgraded: true })
            .collect();
        Self {
            state: RefCell::new(HubState {
                running: true,
                sessions,
                ..HubState::default()
            }),
        }
    }

    /// Open connection that has not completed the WebSocket upgrade.
    pub fn add_pending(&self, id: SessionId) {
        self.state
            .borrow_mut()
            .sessions
            .push(SessionInfo { id, upgraded: false });
    }

    pub fn fail_session(&self, id: SessionId) {
        self.state.borrow_mut().failing.push(id);
    }

    pub fn set_running(&self, running: bool) {
        self.state.borrow_mut().running = running;
    }

    pub fn sent_to(&self, id: SessionId) -> Vec<Vec<u8>> {
        self.state
            .borrow()
            .sent
            .iter()
            .filter(|(session, _)| *session == id)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub fn closed(&self) -> Vec<SessionId> {
        self.state.borrow().closed.clone()
    }
}

impl ViewerHub for RecordingHub {
    fn is_running(&self) -> bool {
        self.state.borrow().running
    }

    fn snapshot_sessions(&self, out: &mut SessionList) {
        for session in self.state.borrow().sessions.iter() {
            if out.push(*session).is_err() {
                break;
            }
        }
    }

    async fn send_binary(&self, session: SessionId, payload: &[u8]) -> Result<(), TransportError> {
        let mut state = self.state.borrow_mut();
        if state.failing.contains(&session) {
            return Err(TransportError::SendFailed);
        }
        state.sent.push((session, payload.to_vec()));
        Ok(())
    }

    async fn close(&self, session: SessionId) {
        let mut state = self.state.borrow_mut();
        state.sessions.retain(|info| info.id != session);
        state.closed.push(session);
    }
}

#[derive(Debug, Default)]
pub struct RecordingAnnouncer {
    pub starts: usize,
    pub registered: Vec<ServiceSpec>,
    pub fail_start: bool,
    pub fail_next_registers: usize,
}

impl ServiceAnnouncer for RecordingAnnouncer {
    fn start(&mut self, _hostname: &str, _instance: &str) -> Result<(), AnnounceError> {
        if self.fail_start {
            return Err(AnnounceError::Init);
        }
        self.starts += 1;
        Ok(())
    }

    fn register(&mut self, service: &ServiceSpec) -> Result<(), AnnounceError> {
        if self.fail_next_registers > 0 {
            self.fail_next_registers -= 1;
            return Err(AnnounceError::Register);
        }
        self.registered.push(*service);
        Ok(())
    }
}

/// One client connection: reads come from `input` in chunks of at most
/// `chunk` bytes, writes land in `output`.
pub struct MockConnection {
    input: Vec<u8>,
    position: usize,
    chunk: usize,
    pub output: Vec<u8>,
}

impl MockConnection {
    pub fn new(input: &[u8]) -> Self {
        Self {
            input: input.to_vec(),
            position: 0,
            chunk: usize::MAX,
            output: Vec::new(),
        }
    }

    pub fn chunked(input: &[u8], chunk: usize) -> Self {
        Self {
            chunk: chunk.max(1),
            ..Self::new(input)
        }
    }

    pub fn response(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    pub fn status(&self) -> Option<u16> {
        let response = self.response();
        response.split(' ').nth(1)?.parse().ok()
    }

    pub fn body(&self) -> String {
        let response = self.response();
        response
            .split_once("\r\n\r\n")
            .map(|(_, body)| body.to_string())
            .unwrap_or_default()
    }
}

impl ErrorType for MockConnection {
    type Error = Infallible;
}

impl Read for MockConnection {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let remaining = &self.input[self.position..];
        let n = remaining.len().min(buf.len()).min(self.chunk);
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }
}

impl Write for MockConnection {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Form-encoded `POST` with a correct content length.
pub fn post_form(path: &str, body: &str) -> Vec<u8> {
    format!(
        "POST {} HTTP/1.1\r\nHost: 192.168.4.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{}",
        path,
        body.len(),
        body
    )
    .into_bytes()
}

pub fn get(path: &str) -> Vec<u8> {
    format!("GET {} HTTP/1.1\r\nHost: 192.168.4.1\r\n\r\n", path).into_bytes()
}
