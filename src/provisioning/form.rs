//! `application/x-www-form-urlencoded` body of a save request.

use heapless::String;

use crate::config::{PASSPHRASE_MAX, SSID_MAX};
use crate::error::ProvisionError;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaveForm {
    pub ssid: String<SSID_MAX>,
    pub pass: String<PASSPHRASE_MAX>,
}

/// Single pass over `key=value&...`. Only `ssid` and `pass` are kept, the
/// first occurrence wins. Values that overflow their bound are rejected
/// rather than cut.
pub fn parse_save_form(body: &[u8]) -> Result<SaveForm, ProvisionError> {
    let mut form = SaveForm::default();
    let mut seen_ssid = false;
    let mut seen_pass = false;

    for pair in body.split(|&b| b == b'&') {
        let (key, value) = match pair.iter().position(|&b| b == b'=') {
            Some(eq) => (&pair[..eq], &pair[eq + 1..]),
            None => continue,
        };
        match key {
            b"ssid" if !seen_ssid => {
                seen_ssid = true;
                percent_decode_into(value, &mut form.ssid).map_err(|err| match err {
                    DecodeError::Overflow => ProvisionError::SsidTooLong,
                    DecodeError::Malformed => ProvisionError::BadRequest,
                })?;
            }
            b"pass" if !seen_pass => {
                seen_pass = true;
                percent_decode_into(value, &mut form.pass).map_err(|err| match err {
                    DecodeError::Overflow => ProvisionError::PassTooLong,
                    DecodeError::Malformed => ProvisionError::BadRequest,
                })?;
            }
            _ => {}
        }
    }

    Ok(form)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DecodeError {
    Overflow,
    Malformed,
}

fn percent_decode_into<const N: usize>(
    encoded: &[u8],
    out: &mut String<N>,
) -> Result<(), DecodeError> {
    let mut raw = heapless::Vec::<u8, N>::new();
    let mut i = 0usize;
    while i < encoded.len() {
        let b = encoded[i];
        let decoded = if b == b'%' {
            if i + 2 >= encoded.len() {
                return Err(DecodeError::Malformed);
            }
            let hi = decode_hex(encoded[i + 1]).ok_or(DecodeError::Malformed)?;
            let lo = decode_hex(encoded[i + 2]).ok_or(DecodeError::Malformed)?;
            i += 3;
            (hi << 4) | lo
        } else if b == b'+' {
            i += 1;
            b' '
        } else {
            i += 1;
            b
        };
        raw.push(decoded).map_err(|_| DecodeError::Overflow)?;
    }

    let text = core::str::from_utf8(&raw).map_err(|_| DecodeError::Malformed)?;
    out.clear();
    out.push_str(text).map_err(|_| DecodeError::Overflow)
}

fn decode_hex(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(10 + (b - b'a')),
        b'A'..=b'F' => Some(10 + (b - b'A')),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_both_fields() {
        let form = parse_save_form(b"ssid=My+Home%21&pass=p%40ss%3Dword").unwrap();
        assert_eq!(form.ssid.as_str(), "My Home!");
        assert_eq!(form.pass.as_str(), "p@ss=word");
    }

    #[test]
    fn missing_fields_are_empty() {
        let form = parse_save_form(b"other=1&pass=").unwrap();
        assert!(form.ssid.is_empty());
        assert!(form.pass.is_empty());
    }

    #[test]
    fn first_occurrence_wins() {
        let form = parse_save_form(b"ssid=first&ssid=second").unwrap();
        assert_eq!(form.ssid.as_str(), "first");
    }

    #[test]
    fn oversized_fields_are_rejected() {
        let mut body = b"ssid=".to_vec();
        body.extend(core::iter::repeat(b'a').take(SSID_MAX + 1));
        assert_eq!(parse_save_form(&body), Err(ProvisionError::SsidTooLong));

        let mut body = b"ssid=home&pass=".to_vec();
        body.extend(core::iter::repeat(b'p').take(PASSPHRASE_MAX + 1));
        assert_eq!(parse_save_form(&body), Err(ProvisionError::PassTooLong));

        let mut body = b"ssid=".to_vec();
        body.extend(core::iter::repeat(b'a').take(SSID_MAX));
        assert_eq!(parse_save_form(&body).unwrap().ssid.len(), SSID_MAX);
    }

    #[test]
    fn truncated_escape_is_malformed() {
        assert_eq!(parse_save_form(b"ssid=ab%4"), Err(ProvisionError::BadRequest));
        assert_eq!(parse_save_form(b"ssid=%zz"), Err(ProvisionError::BadRequest));
        assert_eq!(parse_save_form(b"ssid=%ff"), Err(ProvisionError::BadRequest));
    }
}
