//!
//! ```
//! RUST_LOG=trace cargo test --test truncated -- --nocapture
//! ```

use std::{
    fs,
    io::{self, Cursor, Read},
};

use anyhow::Result;
use http::{header, Request};

use form_params::*;

mod lib;

use lib::{fixture_path, is_empty_dir, request, tracing_init, Limited, BOUNDARY};

/// Serves `data`, then fails with `ConnectionReset` instead of ending.
struct Reset {
    data: Cursor<Vec<u8>>,
}

impl Read for Reset {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.data.read(buf)? {
            0 => Err(io::ErrorKind::ConnectionReset.into()),
            n => Ok(n),
        }
    }
}

fn multipart<B>(body: B, content_length: Option<usize>) -> Result<Request<B>> {
    let mut req = Request::post("/").header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    );
    if let Some(length) = content_length {
        req = req.header(header::CONTENT_LENGTH, length);
    }
    Ok(req.body(body)?)
}

fn upload(contents: &[u8], closed: bool) -> Vec<u8> {
    let mut body = b"--AaB03x\r\n\
                     Content-Disposition: form-data; name=\"submit-name\"\r\n\
                     \r\n\
                     Larry\r\n\
                     --AaB03x\r\n\
                     Content-Disposition: form-data; name=\"files\"; filename=\"file1.txt\"\r\n\
                     Content-Type: text/plain\r\n\
                     \r\n"
        .to_vec();
    body.extend_from_slice(contents);
    if closed {
        body.extend_from_slice(b"\r\n--AaB03x--\r\n");
    }
    body
}

#[test]
fn declared_length_longer_than_body() -> Result<()> {
    tracing_init();

    let body = fs::read(fixture_path("text"))?;
    let mut req = multipart(Limited::random_with(Cursor::new(body), 64), Some(250))?;

    assert!(matches!(
        parse_multipart(&mut req),
        Err(Error::IncompleteBody { read: 199 })
    ));

    Ok(())
}

#[test]
fn declared_length_shorter_than_body() -> Result<()> {
    tracing_init();

    // cut inside the file body, the closing delimiter is never seen
    let body = fs::read(fixture_path("text"))?;
    let mut req = multipart(Limited::random_with(Cursor::new(body), 64), Some(180))?;

    assert!(matches!(
        parse_multipart(&mut req),
        Err(Error::IncompleteBody { read: 180 })
    ));

    Ok(())
}

#[test]
fn body_without_closing_delimiter() -> Result<()> {
    tracing_init();

    let dir = tempfile::tempdir()?;
    let parser = Parser::new(Options::default().temp_dir(dir.path()));

    let body = upload(&[b'x'; 20_000], false);
    let length = body.len() as u64;
    let mut req = multipart(Limited::random(Cursor::new(body)), None)?;

    match parser.parse_request(&mut req) {
        Err(Error::IncompleteBody { read }) => assert_eq!(read, length),
        other => panic!("unexpected {other:?}"),
    }
    assert!(is_empty_dir(dir.path())?);

    Ok(())
}

#[test]
fn empty_body() -> Result<()> {
    tracing_init();

    let mut req = multipart(Cursor::new(Vec::new()), Some(0))?;
    assert!(matches!(
        parse_multipart(&mut req),
        Err(Error::IncompleteBody { read: 0 })
    ));

    let mut req = request(b"--AaB03x\r\n".to_vec())?;
    assert!(matches!(
        parse_multipart(&mut req),
        Err(Error::IncompleteBody { .. })
    ));

    Ok(())
}

#[test]
fn stream_failure_removes_temp_files() -> Result<()> {
    tracing_init();

    let dir = tempfile::tempdir()?;
    let parser = Parser::new(Options::default().temp_dir(dir.path()));

    let reader = Reset {
        data: Cursor::new(upload(&[b'y'; 10_000], false)),
    };
    let mut req = multipart(Limited::random(reader), None)?;

    match parser.parse_request(&mut req) {
        Err(Error::Stream(e)) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
        other => panic!("unexpected {other:?}"),
    }
    assert!(is_empty_dir(dir.path())?);

    Ok(())
}

#[test]
fn completed_files_are_removed_on_failure() -> Result<()> {
    tracing_init();

    let dir = tempfile::tempdir()?;
    let parser = Parser::new(Options::default().temp_dir(dir.path()));

    // one complete upload, then the stream breaks in the second
    let mut body = upload(b"contents", false);
    body.extend_from_slice(
        b"\r\n--AaB03x\r\n\
          Content-Disposition: form-data; name=\"more\"; filename=\"file2.txt\"\r\n\
          \r\n\
          partial",
    );
    let mut req = multipart(Limited::random_with(Cursor::new(body), 32), None)?;

    assert!(matches!(
        parser.parse_request(&mut req),
        Err(Error::IncompleteBody { .. })
    ));
    assert!(is_empty_dir(dir.path())?);

    Ok(())
}

#[test]
fn malformed_part() -> Result<()> {
    tracing_init();

    let body = b"--AaB03x\r\n\
                 Content-Disposition: form-data; name=\"a\"\r\n\
                 --AaB03x--\r\n"
        .to_vec();

    assert!(matches!(
        parse_multipart(&mut request(body)?),
        Err(Error::MalformedPart)
    ));

    Ok(())
}

#[test]
fn invalid_part_header() -> Result<()> {
    tracing_init();

    let body = b"--AaB03x\r\n\
                 Not a header\r\n\
                 \r\n\
                 x\r\n\
                 --AaB03x--\r\n"
        .to_vec();

    assert!(matches!(
        parse_multipart(&mut request(body)?),
        Err(Error::InvalidHeader)
    ));

    Ok(())
}

#[test]
fn missing_boundary() -> Result<()> {
    tracing_init();

    let dir = tempfile::tempdir()?;
    let parser = Parser::new(Options::default().temp_dir(dir.path()));

    for content_type in [
        "multipart/form-data",
        "multipart/form-data; charset=utf-8",
        "multipart/form-data; boundary=\"\"",
    ] {
        let mut req = Request::post("/")
            .header(header::CONTENT_TYPE, content_type)
            .body(Cursor::new(upload(b"contents", true)))?;

        assert!(
            matches!(parser.parse_request(&mut req), Err(Error::MissingBoundary)),
            "{content_type}"
        );
        // nothing was read
        assert_eq!(req.body().position(), 0);
    }
    assert!(is_empty_dir(dir.path())?);

    Ok(())
}

#[test]
fn missing_temp_dir() -> Result<()> {
    tracing_init();

    let dir = tempfile::tempdir()?;
    let parser = Parser::new(Options::default().temp_dir(dir.path().join("missing")));

    let mut req = multipart(Cursor::new(upload(b"contents", true)), None)?;

    match parser.parse_request(&mut req) {
        Err(Error::TempFile(e)) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
        other => panic!("unexpected {other:?}"),
    }
    assert!(is_empty_dir(dir.path())?);

    Ok(())
}

/// Removes `dir` once `at` bytes were served.
struct RemoveDir {
    data: Cursor<Vec<u8>>,
    dir: std::path::PathBuf,
    at: u64,
}

impl Read for RemoveDir {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.data.position() >= self.at && self.dir.exists() {
            fs::remove_dir_all(&self.dir)?;
        }
        self.data.read(buf)
    }
}

#[test]
fn temp_dir_removed_between_files() -> Result<()> {
    tracing_init();

    let root = tempfile::tempdir()?;
    let dir = root.path().join("uploads");
    fs::create_dir(&dir)?;
    let parser = Parser::new(Options::default().buffer_size(16).temp_dir(&dir));

    let mut body = upload(b"contents", false);
    let at = body.len() as u64;
    body.extend_from_slice(
        b"\r\n--AaB03x\r\n\
          Content-Disposition: form-data; name=\"more\"; filename=\"file2.txt\"\r\n\
          \r\n\
          more contents\r\n\
          --AaB03x--\r\n",
    );

    let reader = RemoveDir {
        data: Cursor::new(body),
        dir: dir.clone(),
        at,
    };
    let mut req = multipart(reader, None)?;

    match parser.parse_request(&mut req) {
        Err(Error::TempFile(e)) => assert_eq!(e.kind(), io::ErrorKind::NotFound),
        other => panic!("unexpected {other:?}"),
    }
    assert!(!dir.exists());
    assert!(is_empty_dir(root.path())?);

    Ok(())
}

#[test]
fn padded_delimiter_is_preamble() -> Result<()> {
    tracing_init();

    // transport padding after the boundary is not accepted
    let body = b"--AaB03x \r\n\
                 Content-Disposition: form-data; name=\"submit-name\"\r\n\
                 \r\n\
                 Larry\r\n\
                 --AaB03x--\r\n"
        .to_vec();

    let params = parse_multipart(&mut request(body)?)?.expect("multipart");
    assert!(params.is_empty());

    Ok(())
}
