//! Minimal HTTP/1.0 handling for the provisioning portal. One request per
//! connection; the response always closes it.

mod helpers;

use alloc::borrow::Cow;
use alloc::vec::Vec;

use embassy_time::{with_timeout, Duration};
use embedded_io_async::{Read, Write};

use self::helpers::{
    drain_remaining_body, find_header_end, parse_content_length, parse_request_line, read_body,
    target_path, write_response,
};
use super::form::parse_save_form;
use super::portal::{is_captive_probe, LANDING_PAGE};
use super::ProvisioningService;
use crate::config::SAVE_BODY_MAX;
use crate::connectivity::LinkDriver;
use crate::credentials::KeyValueStore;
use crate::error::ProvisionError;

pub const HEADER_BUF_LEN: usize = 1024;
const HEADER_READ_TIMEOUT_MS: u64 = 10_000;

const TEXT_PLAIN: &str = "text/plain";
const TEXT_HTML: &str = "text/html";
const APPLICATION_JSON: &str = "application/json";

/// Status and short body sent back for a rejected request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HttpError {
    pub status: u16,
    pub body: &'static str,
}

impl HttpError {
    const fn new(status: u16, body: &'static str) -> Self {
        Self { status, body }
    }
}

impl From<ProvisionError> for HttpError {
    fn from(err: ProvisionError) -> Self {
        Self::new(err.status(), err.body())
    }
}

struct Response {
    content_type: &'static str,
    body: Cow<'static, str>,
}

impl Response {
    fn text(body: &'static str) -> Self {
        Self {
            content_type: TEXT_PLAIN,
            body: Cow::Borrowed(body),
        }
    }
}

/// Reads one request from `conn`, dispatches it to `service` and writes the
/// response. Returns the status sent; an `Err` has already been answered
/// when the connection was still usable.
pub async fn handle_connection<C, L, S>(
    conn: &mut C,
    service: &ProvisioningService<'_, L, S>,
    header_buf: &mut [u8],
) -> Result<u16, HttpError>
where
    C: Read + Write,
    L: LinkDriver,
    S: KeyValueStore,
{
    match serve(conn, service, header_buf).await {
        Ok(response) => {
            write_response(conn, 200, response.content_type, response.body.as_bytes()).await;
            Ok(200)
        }
        Err(err) => {
            write_response(conn, err.status, TEXT_PLAIN, err.body.as_bytes()).await;
            Err(err)
        }
    }
}

async fn serve<C, L, S>(
    conn: &mut C,
    service: &ProvisioningService<'_, L, S>,
    header_buf: &mut [u8],
) -> Result<Response, HttpError>
where
    C: Read + Write,
    L: LinkDriver,
    S: KeyValueStore,
{
    let mut filled = 0usize;
    let header_end = loop {
        if filled == header_buf.len() {
            return Err(HttpError::new(413, "header too large"));
        }

        let n = match with_timeout(
            Duration::from_millis(HEADER_READ_TIMEOUT_MS),
            conn.read(&mut header_buf[filled..]),
        )
        .await
        {
            Ok(Ok(n)) => n,
            Ok(Err(_)) => return Err(HttpError::new(400, "bad_request")),
            Err(_) => return Err(HttpError::new(408, "request header timeout")),
        };
        if n == 0 {
            return Err(HttpError::new(400, "bad_request"));
        }
        filled += n;

        if let Some(end) = find_header_end(&header_buf[..filled]) {
            break end;
        }
    };

    let header = core::str::from_utf8(&header_buf[..header_end])
        .map_err(|_| HttpError::new(400, "bad_request"))?;
    let (method, target) =
        parse_request_line(header).ok_or(HttpError::new(400, "bad_request"))?;
    let content_length = parse_content_length(header)
        .map_err(|_| HttpError::new(400, "bad_request"))?
        .unwrap_or(0);
    let body_start = header_end + 4;
    let buffered = &header_buf[body_start.min(filled)..filled];
    let path = target_path(target);
    log::debug!("provision: {} {}", method, path);

    match (method, path) {
        ("POST", "/api/save") => {
            if content_length == 0 || content_length > SAVE_BODY_MAX {
                return Err(ProvisionError::BadRequest.into());
            }
            let mut body = Vec::new();
            body.try_reserve_exact(content_length)
                .map_err(|_| ProvisionError::NoMem)?;
            body.resize(content_length, 0);
            read_body(conn, buffered, &mut body)
                .await
                .map_err(|_| ProvisionError::RecvFailed)?;

            let form = parse_save_form(&body)?;
            service.save(&form.ssid, &form.pass).await?;
            return Ok(Response::text("saved. rebooting..."));
        }
        ("POST", "/api/forget") => {
            drain_remaining_body(conn, content_length, buffered.len())
                .await
                .map_err(|_| ProvisionError::RecvFailed)?;
            service.forget().await;
            return Ok(Response::text("cleared. rebooting..."));
        }
        _ => {}
    }

    drain_remaining_body(conn, content_length, buffered.len())
        .await
        .map_err(|_| ProvisionError::RecvFailed)?;

    match (method, path) {
        ("GET", "/api/scan") => Ok(Response {
            content_type: APPLICATION_JSON,
            body: Cow::Owned(service.scan_json().await?),
        }),
        ("GET", "/") => Ok(landing()),
        ("GET", path) if is_captive_probe(path) => Ok(landing()),
        _ => Err(HttpError::new(404, "not found")),
    }
}

fn landing() -> Response {
    Response {
        content_type: TEXT_HTML,
        body: Cow::Borrowed(LANDING_PAGE),
    }
}
