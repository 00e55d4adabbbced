use http::header::{HeaderMap, HeaderName, HeaderValue};
use httparse::{parse_headers, Status, EMPTY_HEADER};
use memchr::memchr;
use tracing::warn;

use crate::{Error, Result};

/// Most headers one part may carry, a part with more fails with
/// [`Error::InvalidHeader`].
pub(crate) const MAX_HEADERS: usize = 64;
pub(crate) const DASHES: [u8; 2] = [b'-', b'-']; // `--`
pub(crate) const CRLF: [u8; 2] = [b'\r', b'\n']; // `\r\n`
pub(crate) const CRLFS: [u8; 4] = [b'\r', b'\n', b'\r', b'\n']; // `\r\n\r\n`

/// Content type assumed for a file part that does not declare one.
pub const DEFAULT_FILE_CONTENT_TYPE: &str = "text/plain";

const NAME: &[u8; 4] = b"name";
const FILE_NAME: &[u8; 8] = b"filename";
const FORM_DATA: &[u8; 9] = b"form-data";
const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Extracts the boundary from a `Content-Type` value.
///
/// Returns `Ok(None)` when the content type is not `multipart/form-data`,
/// the caller has nothing to parse then. A quoted boundary is unquoted.
///
/// # Errors
///
/// [`Error::MissingBoundary`] when the content type is `multipart/form-data`
/// but has no boundary, or the boundary is empty or spans lines.
pub fn parse_boundary(content_type: &str) -> Result<Option<String>> {
    let content_type = content_type.trim_start();

    let is_form_data = content_type
        .get(..MULTIPART_FORM_DATA.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(MULTIPART_FORM_DATA));
    if !is_form_data {
        return Ok(None);
    }

    let m = content_type
        .parse::<mime::Mime>()
        .map_err(|_| Error::MissingBoundary)?;

    // `multipart/form-dataX` shares the prefix only
    if m.type_() != mime::MULTIPART || m.subtype() != mime::FORM_DATA {
        return Ok(None);
    }

    let boundary = m
        .get_param(mime::BOUNDARY)
        .map(|b| b.as_str().trim_matches('"'))
        .ok_or(Error::MissingBoundary)?;

    if boundary.is_empty() || boundary.contains(|c| c == '\r' || c == '\n') {
        return Err(Error::MissingBoundary);
    }

    Ok(Some(boundary.to_owned()))
}

pub(crate) fn parse_content_length(header: Option<&HeaderValue>) -> Option<u64> {
    let header = header?;
    let length = header
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok());
    if length.is_none() {
        warn!("ignoring malformed content-length {:?}", header);
    }
    length
}

pub(crate) fn parse_content_type(header: Option<&HeaderValue>) -> Option<String> {
    header
        .map(HeaderValue::as_bytes)
        .map(String::from_utf8_lossy)
        .map(|v| v.trim().to_owned())
}

pub(crate) fn parse_part_headers(bytes: &[u8]) -> Result<HeaderMap> {
    let mut headers = [EMPTY_HEADER; MAX_HEADERS];
    match parse_headers(bytes, &mut headers) {
        Ok(Status::Complete((_, hs))) => {
            let len = hs.len();
            let mut header_map = HeaderMap::with_capacity(len);
            for h in hs.iter().take(len) {
                header_map.append(
                    HeaderName::from_bytes(h.name.as_bytes()).map_err(|_| Error::InvalidHeader)?,
                    HeaderValue::from_bytes(h.value).map_err(|_| Error::InvalidHeader)?,
                );
            }
            Ok(header_map)
        }
        Ok(Status::Partial) | Err(_) => Err(Error::InvalidHeader),
    }
}

/// Parses `form-data; name="..."; filename="..."` into `(name, filename)`.
///
/// A backslash is an ordinary byte here, old browsers send unescaped Windows
/// paths. A quoted value ends at the first `"` that is followed by `;` or by
/// the end of the header, so a stray quote inside a filename survives.
pub(crate) fn parse_content_disposition(hv: &[u8]) -> Result<(String, Option<String>)> {
    let form_data = hv.get(..FORM_DATA.len());
    if !form_data.is_some_and(|v| v.eq_ignore_ascii_case(FORM_DATA)) {
        return Err(Error::MissingDisposition);
    }

    let mut name = None;
    let mut filename = None;
    let mut i = FORM_DATA.len();

    while i < hv.len() {
        if matches!(hv[i], b';' | b' ' | b'\t') {
            i += 1;
            continue;
        }

        let k = i;
        while i < hv.len() && hv[i] != b'=' && hv[i] != b';' {
            i += 1;
        }
        let key = trim(&hv[k..i]);

        // bare token, no value
        if i == hv.len() || hv[i] == b';' {
            continue;
        }
        i += 1;

        while i < hv.len() && matches!(hv[i], b' ' | b'\t') {
            i += 1;
        }

        let value = if hv.get(i) == Some(&b'"') {
            let start = i + 1;
            let end = quoted_end(hv, start);
            i = end + 1;
            &hv[start..end]
        } else {
            let start = i;
            while i < hv.len() && hv[i] != b';' {
                i += 1;
            }
            trim(&hv[start..i])
        };

        if key.eq_ignore_ascii_case(NAME) {
            name.get_or_insert(value);
        } else if key.eq_ignore_ascii_case(FILE_NAME) {
            filename.get_or_insert(value);
        }
    }

    match name {
        Some(name) if !name.is_empty() => Ok((
            String::from_utf8_lossy(name).into_owned(),
            filename.map(|v| String::from_utf8_lossy(v).into_owned()),
        )),
        _ => Err(Error::MissingDisposition),
    }
}

fn quoted_end(hv: &[u8], start: usize) -> usize {
    let mut from = start;
    while let Some(n) = memchr(b'"', &hv[from..]) {
        let at = from + n;
        let rest = trim(&hv[at + 1..]);
        if rest.is_empty() || rest[0] == b';' {
            return at;
        }
        from = at + 1;
    }
    // unterminated, take the rest
    hv.len()
}

fn trim(mut v: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = v {
        v = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = v {
        v = rest;
    }
    v
}
