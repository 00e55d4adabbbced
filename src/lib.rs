//! Reads `multipart/form-data` request bodies ([rfc7578]) into nested
//! parameters.
//!
//! Text fields become strings, file parts are spooled to temporary files, and
//! bracketed names like `user[avatar]` nest.
//!
//! # Example
//!
//! ```rust
//! use std::io::{Cursor, Read};
//!
//! use form_params::{parse_multipart, Value};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let body = concat!(
//!     "--AaB03x\r\n",
//!     "Content-Disposition: form-data; name=\"user[name]\"\r\n",
//!     "\r\n",
//!     "Larry\r\n",
//!     "--AaB03x\r\n",
//!     "Content-Disposition: form-data; name=\"user[avatar]\"; filename=\"a.txt\"\r\n",
//!     "Content-Type: text/plain\r\n",
//!     "\r\n",
//!     "contents\r\n",
//!     "--AaB03x--\r\n",
//! );
//!
//! let mut req = http::Request::post("/")
//!     .header("content-type", "multipart/form-data; boundary=AaB03x")
//!     .header("content-length", body.len())
//!     .body(Cursor::new(body))?;
//!
//! let params = parse_multipart(&mut req)?.expect("multipart");
//!
//! assert_eq!(params["user"]["name"], "Larry");
//!
//! let avatar = params["user"]["avatar"].as_file().expect("file");
//! assert_eq!(avatar.filename, "a.txt");
//! assert_eq!(avatar.content_type, "text/plain");
//!
//! let mut contents = String::new();
//! avatar.open()?.read_to_string(&mut contents)?;
//! assert_eq!(contents, "contents");
//! # Ok(())
//! # }
//! ```
//!
//! [rfc7578]: <https://tools.ietf.org/html/rfc7578>

#![forbid(unsafe_code)]
#![deny(nonstandard_style)]
#![warn(missing_docs, unreachable_pub)]

mod error;
mod field;
mod form;
mod options;
mod params;
mod parser;
mod sink;
mod state;
mod sync;
mod utils;

pub use form::FormData;

pub use field::Field;

pub use state::State;

pub use options::{Charset, EmptyFile, Filename, Options};

pub use params::{FileUpload, Params, Value};

pub use parser::{parse_multipart, Parser};

pub use utils::{parse_boundary, DEFAULT_FILE_CONTENT_TYPE};

pub use error::Error;

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;
