#![no_main]
use libfuzzer_sys::fuzz_target;

use form_params::{Options, Parser};

fuzz_target!(|data: &[u8]| {
    let Ok(dir) = tempfile::tempdir() else {
        return;
    };
    let parser = Parser::new(Options::default().buffer_size(64).temp_dir(dir.path()));

    let declared = data.len() as u64;
    let _ = parser.parse_body("BOUNDARY", Some(declared), data);
    let _ = parser.parse_body("BOUNDARY", None, data);

    // every temporary file goes away with the parse result
    assert!(std::fs::read_dir(dir.path()).map_or(true, |mut d| d.next().is_none()));
});
