use std::fmt;

use bytes::{Buf, Bytes, BytesMut};
use memchr::memmem;
use tracing::{trace, warn};

use crate::{
    utils::{CRLF, CRLFS, DASHES},
    Error, Options, Result,
};

#[derive(Debug, PartialEq)]
pub(crate) enum Flag {
    /// Skipping the preamble, looking for the first delimiter.
    Delimiting,
    /// Reading the header block of a part.
    Heading,
    /// Reading the body of a part.
    Bodying,
    /// The body of a part is done, the next part follows.
    Next,
    /// The closing delimiter was read.
    Eof,
}

enum Found {
    /// `\r\n--boundary` at the index, `true` when followed by `--`.
    Delimiter(usize, bool),
    /// `\r\n--boundary` at the index, not enough bytes to classify it yet.
    Partial(usize),
    None,
}

/// IO State
pub struct State<T> {
    io: T,
    pub(crate) eof: bool,
    pub(crate) finished: bool,
    pub(crate) flag: Flag,
    pub(crate) length: u64,
    pub(crate) content_length: Option<u64>,
    pub(crate) total: usize,
    pub(crate) buffer: BytesMut,
    delimiter: Bytes,
    pub(crate) is_readable: bool,
    pub(crate) buffer_size: usize,
}

impl<T> State<T> {
    /// Creates new State.
    pub fn new(boundary: &[u8], io: T, options: &Options) -> Self {
        // `\r\n--boundary`
        let mut delimiter = BytesMut::with_capacity(4 + boundary.len());
        delimiter.extend_from_slice(&CRLF);
        delimiter.extend_from_slice(&DASHES);
        delimiter.extend_from_slice(boundary);

        // a zero set on the public field would read nothing
        let buffer_size = match options.buffer_size {
            0 => Options::DEFAULT_BUFFER_SIZE,
            size => size,
        };

        // `\r\n`, so the first delimiter matches like the others
        let mut buffer = BytesMut::with_capacity(buffer_size);
        buffer.extend_from_slice(&CRLF);

        Self {
            io,
            total: 0,
            length: 0,
            content_length: None,

            eof: false,
            finished: false,
            is_readable: false,

            buffer,
            flag: Flag::Delimiting,
            delimiter: delimiter.freeze(),

            buffer_size,
        }
    }

    /// Gets io.
    pub fn io_mut(&mut self) -> &mut T {
        &mut self.io
    }

    /// Gets the index of the next part.
    pub(crate) fn index(&mut self) -> usize {
        let index = self.total;
        self.total += 1;
        index
    }

    /// Gets the number of bytes read from the body.
    pub fn len(&self) -> u64 {
        self.length
    }

    /// Whether nothing was read yet.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Gets EOF.
    pub fn eof(&self) -> bool {
        self.eof
    }

    /// Whether the closing delimiter was read.
    pub fn is_done(&self) -> bool {
        self.flag == Flag::Eof
    }

    /// Counts the parts.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Gets the boundary.
    pub fn boundary(&self) -> &[u8] {
        &self.delimiter[4..]
    }

    /// Gets the declared body length.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Stops decoding, nothing more is yielded.
    pub(crate) fn abort(&mut self) {
        self.flag = Flag::Eof;
        self.eof = true;
        self.finished = true;
        self.buffer.clear();
    }

    fn incomplete(&self) -> Error {
        Error::IncompleteBody { read: self.length }
    }

    fn find_delimiter(&self) -> Found {
        let mut from = 0;
        while let Some(n) = memmem::find(&self.buffer[from..], &self.delimiter) {
            let at = from + n;
            let end = at + self.delimiter.len();
            match self.buffer.get(end..end + 2) {
                None => return Found::Partial(at),
                Some(b) if b == CRLF => return Found::Delimiter(at, false),
                Some(b) if b == DASHES => return Found::Delimiter(at, true),
                // `\r\n--boundaryX` is payload
                Some(b) => {
                    if self.flag == Flag::Delimiting {
                        warn!(
                            "preamble line starts like a delimiter, followed by {:?}",
                            String::from_utf8_lossy(b)
                        );
                    }
                    from = at + 1;
                }
            }
        }
        Found::None
    }

    /// Bytes at the front of the buffer that cannot belong to a delimiter.
    fn safe_len(&self) -> usize {
        self.buffer
            .len()
            .saturating_sub(self.delimiter.len() - 1)
    }

    /// Decodes the buffer.
    ///
    /// In `Heading` it yields the header block, including the blank line. In
    /// `Bodying` it yields body chunks; `Ok(None)` with the flag moved to
    /// `Next` or `Eof` ends the part. Otherwise `Ok(None)` asks for more data.
    pub(crate) fn decode(&mut self) -> Result<Option<Bytes>> {
        loop {
            match self.flag {
                Flag::Delimiting => match self.find_delimiter() {
                    Found::Delimiter(n, last) => {
                        // preamble is dropped
                        self.buffer.advance(n + self.delimiter.len() + 2);
                        self.flag = if last { Flag::Eof } else { Flag::Heading };
                    }
                    Found::Partial(n) => {
                        if self.eof {
                            return Err(self.incomplete());
                        }
                        self.buffer.advance(n);
                        return Ok(None);
                    }
                    Found::None => {
                        if self.eof {
                            return Err(self.incomplete());
                        }
                        let n = self.safe_len();
                        self.buffer.advance(n);
                        return Ok(None);
                    }
                },
                Flag::Next => self.flag = Flag::Heading,
                Flag::Heading => {
                    // part without headers
                    if self.buffer.starts_with(&CRLF) {
                        self.flag = Flag::Bodying;
                        return Ok(Some(self.buffer.split_to(CRLF.len()).freeze()));
                    }

                    let head = memmem::find(&self.buffer, &CRLFS);
                    let delimiter = memmem::find(&self.buffer, &self.delimiter);

                    return match (head, delimiter) {
                        (Some(h), d) if d.map_or(true, |d| h < d) => {
                            trace!("part header block of {} bytes", h + CRLFS.len());
                            self.flag = Flag::Bodying;
                            Ok(Some(self.buffer.split_to(h + CRLFS.len()).freeze()))
                        }
                        (_, Some(_)) => Err(Error::MalformedPart),
                        _ if self.eof => Err(self.incomplete()),
                        _ => Ok(None),
                    };
                }
                Flag::Bodying => {
                    let n = match self.find_delimiter() {
                        Found::Delimiter(0, last) => {
                            self.buffer.advance(self.delimiter.len() + 2);
                            self.flag = if last { Flag::Eof } else { Flag::Next };
                            return Ok(None);
                        }
                        Found::Delimiter(n, _) | Found::Partial(n) => n,
                        Found::None => self.safe_len(),
                    };

                    if n > 0 {
                        return Ok(Some(self.buffer.split_to(n).freeze()));
                    }
                    if self.eof {
                        return Err(self.incomplete());
                    }
                    return Ok(None);
                }
                Flag::Eof => return Ok(None),
            }
        }
    }
}

impl<T> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("eof", &self.eof)
            .field("finished", &self.finished)
            .field("flag", &self.flag)
            .field("total", &self.total)
            .field("length", &self.length)
            .field("content_length", &self.content_length)
            .field("is_readable", &self.is_readable)
            .field("boundary", &String::from_utf8_lossy(self.boundary()))
            .finish()
    }
}
