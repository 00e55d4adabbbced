#![allow(dead_code)]
#![allow(unused_imports)]

use std::{fs::File, path::Path};

use anyhow::Result;
use http::Request;

mod limited;
pub use limited::Limited;

pub const BOUNDARY: &str = "AaB03x";

pub fn tracing_init() {
    // several tests share one process, only the first install wins
    let _ = tracing_subscriber::fmt()
        // From env var: `RUST_LOG`
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn fixture_path(name: &str) -> String {
    format!("tests/fixtures/multipart/{name}")
}

/// A request for a fixture, read in random small pieces.
pub fn fixture(name: &str) -> Result<Request<Limited<File>>> {
    let path = fixture_path(name);
    let length = std::fs::metadata(&path)?.len();
    let body = Limited::random_with(File::open(&path)?, 64);

    Ok(Request::post("/")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header("content-length", length)
        .body(body)?)
}

/// A request for an in-memory body, read in random pieces.
pub fn request(body: Vec<u8>) -> Result<Request<Limited<std::io::Cursor<Vec<u8>>>>> {
    let length = body.len();
    Ok(Request::post("/")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header("content-length", length)
        .body(Limited::random(std::io::Cursor::new(body)))?)
}

pub fn is_empty_dir(dir: &Path) -> Result<bool> {
    Ok(std::fs::read_dir(dir)?.next().is_none())
}
