use core::cmp::min;

use embedded_io_async::{Read, Write};

pub(super) async fn drain_remaining_body<C: Read>(
    conn: &mut C,
    content_length: usize,
    already_in_buffer: usize,
) -> Result<(), &'static str> {
    if already_in_buffer >= content_length {
        return Ok(());
    }
    let mut remaining = content_length - already_in_buffer;
    let mut sink = [0u8; 128];
    while remaining > 0 {
        let want = min(remaining, sink.len());
        let n = conn.read(&mut sink[..want]).await.map_err(|_| "drain")?;
        if n == 0 {
            return Err("drain eof");
        }
        remaining -= n;
    }
    Ok(())
}

/// Fills `body` from the bytes already buffered after the header, then from
/// the connection. Fails on early EOF.
pub(super) async fn read_body<C: Read>(
    conn: &mut C,
    buffered: &[u8],
    body: &mut [u8],
) -> Result<(), &'static str> {
    let from_buffer = min(buffered.len(), body.len());
    body[..from_buffer].copy_from_slice(&buffered[..from_buffer]);
    let mut filled = from_buffer;
    while filled < body.len() {
        let n = conn.read(&mut body[filled..]).await.map_err(|_| "read body")?;
        if n == 0 {
            return Err("body eof");
        }
        filled += n;
    }
    Ok(())
}

pub(super) fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|window| window == b"\r\n\r\n")
}

pub(super) fn parse_request_line(header: &str) -> Option<(&str, &str)> {
    let first_line = header.lines().next()?;
    let mut parts = first_line.split_ascii_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    let _version = parts.next()?;
    Some((method, target))
}

pub(super) fn parse_content_length(header: &str) -> Result<Option<usize>, &'static str> {
    let mut content_length = None;

    for line in header.lines().skip(1) {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };

        if !name.eq_ignore_ascii_case("content-length") {
            continue;
        }

        let parsed = value
            .trim()
            .parse::<usize>()
            .map_err(|_| "invalid content-length")?;

        if content_length.is_some() {
            return Err("duplicate content-length");
        }

        content_length = Some(parsed);
    }

    Ok(content_length)
}

pub(super) fn target_path(target: &str) -> &str {
    target.split('?').next().unwrap_or(target)
}

pub(super) const fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        413 => "Payload Too Large",
        _ => "Internal Server Error",
    }
}

pub(super) async fn write_response<C: Write>(
    conn: &mut C,
    status: u16,
    content_type: &str,
    body: &[u8],
) {
    let mut status_line = [0u8; 3];
    write_decimal(&mut status_line, status as usize);
    let mut content_length = [0u8; 20];
    let digits = write_decimal(&mut content_length, body.len());

    let _ = conn.write_all(b"HTTP/1.0 ").await;
    let _ = conn.write_all(&status_line).await;
    let _ = conn.write_all(b" ").await;
    let _ = conn.write_all(reason_phrase(status).as_bytes()).await;
    let _ = conn.write_all(b"\r\nContent-Type: ").await;
    let _ = conn.write_all(content_type.as_bytes()).await;
    let _ = conn
        .write_all(b"\r\nConnection: close\r\nContent-Length: ")
        .await;
    let _ = conn.write_all(&content_length[content_length.len() - digits..]).await;
    let _ = conn.write_all(b"\r\n\r\n").await;
    let _ = conn.write_all(body).await;
    let _ = conn.flush().await;
}

/// Right-aligns the decimal digits of `value` in `out`, returns the digit count.
fn write_decimal(out: &mut [u8], mut value: usize) -> usize {
    let mut idx = out.len();
    loop {
        idx -= 1;
        out[idx] = b'0' + (value % 10) as u8;
        value /= 10;
        if value == 0 || idx == 0 {
            break;
        }
    }
    out.len() - idx
}
