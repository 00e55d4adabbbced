use std::io::{Error as IoError, ErrorKind, Read, Write};

use bytes::{Buf, Bytes, BytesMut};
use http::{
    header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    HeaderValue,
};
use tracing::{debug, trace};

use crate::{
    state::Flag,
    utils::{parse_content_disposition, parse_content_type, parse_part_headers, CRLF},
    Error, Field, FormData, Result, State,
};

impl<T> State<T>
where
    T: Read,
{
    /// Pulls at most `buffer_size` bytes, never past the declared length.
    fn fill(&mut self) -> Result<usize> {
        let want = match self.content_length {
            Some(max) => {
                let left = max.saturating_sub(self.length);
                usize::try_from(left).map_or(self.buffer_size, |l| l.min(self.buffer_size))
            }
            None => self.buffer_size,
        };

        if want == 0 {
            self.eof = true;
            return Ok(0);
        }

        let mut b = BytesMut::new();
        b.resize(want, 0);
        let n = loop {
            match self.io_mut().read(&mut b) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        };

        self.buffer.extend_from_slice(&b[..n]);
        self.length += n as u64;
        if n == 0 {
            self.eof = true;
        }
        Ok(n)
    }

    /// Reads the epilogue up to the declared length.
    fn drain(&mut self) -> Result<()> {
        self.buffer.clear();

        let Some(max) = self.content_length else {
            return Ok(());
        };

        while !self.eof {
            self.fill()?;
            self.buffer.clear();
        }

        if self.length < max {
            return Err(Error::IncompleteBody { read: self.length });
        }
        Ok(())
    }
}

impl<T> Iterator for State<T>
where
    T: Read,
{
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.is_readable {
                // part
                trace!("attempting to decode a part");

                match self.decode() {
                    Ok(Some(data)) => {
                        trace!("part decoded from buffer");
                        return Some(Ok(data));
                    }
                    Ok(None) => {}
                    Err(e) => {
                        self.abort();
                        return Some(Err(e));
                    }
                }

                // field stream is ended
                if Flag::Next == self.flag {
                    return None;
                }

                // whole stream is ended
                if Flag::Eof == self.flag {
                    if !self.finished {
                        self.finished = true;
                        if let Err(e) = self.drain() {
                            return Some(Err(e));
                        }
                    }
                    return None;
                }

                self.is_readable = false;
            }

            trace!("polling data from stream");

            if self.eof {
                self.is_readable = true;
                continue;
            }

            if let Err(e) = self.fill() {
                self.abort();
                return Some(Err(e));
            }

            self.is_readable = true;
        }
    }
}

impl<T> Read for Field<T>
where
    T: Read,
{
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        if buf.is_empty() {
            return Ok(0);
        }

        if self.pending.is_empty() {
            match self.next() {
                None => return Ok(0),
                Some(Ok(b)) => self.pending = b,
                Some(Err(Error::Stream(e))) => return Err(e),
                Some(Err(e)) => return Err(IoError::new(ErrorKind::Other, e)),
            }
        }

        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        Ok(n)
    }
}

impl<T> Field<T>
where
    T: Read,
{
    /// Reads the rest of the field data into memory.
    ///
    /// Named apart from [`Read::bytes`], which `Field` also has.
    pub fn read_bytes(&mut self) -> Result<Bytes> {
        let mut bytes = BytesMut::new();
        while let Some(buf) = self.next() {
            bytes.extend_from_slice(&buf?);
        }
        Ok(bytes.freeze())
    }

    /// Copys bytes to a writer.
    pub fn copy_to<W>(&mut self, writer: &mut W) -> Result<u64>
    where
        W: Write,
    {
        let mut n = 0;
        while let Some(buf) = self.next() {
            let b = buf?;
            writer.write_all(&b)?;
            n += b.len();
        }
        writer.flush()?;
        Ok(n as u64)
    }

    /// Ignores current field data, pass it.
    pub fn ignore(&mut self) -> Result<()> {
        while let Some(buf) = self.next() {
            drop(buf?);
        }
        Ok(())
    }
}

impl<T> Iterator for Field<T>
where
    T: Read,
{
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.pending.is_empty() {
            return Some(Ok(std::mem::take(&mut self.pending)));
        }

        let shared = self.state_mut().clone()?;
        trace!("polling {}", self.index);

        let mut state = match shared.try_lock() {
            Ok(state) => state,
            Err(e) => return Some(Err(Error::TryLockError(e.to_string()))),
        };

        // the body was finished, or skipped by `FormData`
        if state.total != self.index + 1 || state.flag != Flag::Bodying {
            drop(self.state_mut().take());
            return None;
        }

        match state.next() {
            None => {
                trace!("polled {}", self.index);
                drop(self.state_mut().take());
                None
            }
            Some(Err(e)) => Some(Err(e)),
            Some(Ok(buf)) => {
                self.length += buf.len();
                trace!("polled bytes {}/{}", buf.len(), self.length);
                Some(Ok(buf))
            }
        }
    }
}

/// Reads form-data from request payload body, then yields `Field`
impl<T> Iterator for FormData<T>
where
    T: Read,
{
    type Item = Result<Field<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        let shared = self.state();
        let mut state = match shared.try_lock() {
            Ok(state) => state,
            Err(e) => return Some(Err(Error::TryLockError(e.to_string()))),
        };

        // body of the previous part was not read
        if state.flag == Flag::Bodying {
            trace!("skipping rest of part {}", state.total);
            while let Some(buf) = state.next() {
                if let Err(e) = buf {
                    return Some(Err(e));
                }
            }
        }

        let buf = match state.next()? {
            Err(e) => return Some(Err(e)),
            Ok(buf) => buf,
        };

        trace!("parse part");
        let index = state.index();

        // invalid part header
        let mut headers = match parse_part_headers(&buf) {
            Ok(headers) => headers,
            Err(e) => {
                state.abort();
                return Some(Err(e));
            }
        };

        // the block ends with the blank line
        let head = String::from_utf8_lossy(&buf[..buf.len() - CRLF.len()]).into_owned();

        // missing content disposition, the body is skipped on the next call
        let (name, filename) = match headers
            .remove(CONTENT_DISPOSITION)
            .as_ref()
            .map(HeaderValue::as_bytes)
            .map(parse_content_disposition)
        {
            Some(Ok(names)) => names,
            Some(Err(e)) => return Some(Err(e)),
            None => return Some(Err(Error::MissingDisposition)),
        };

        debug!(index, name = %name, filename = ?filename, "part");

        // yields `Field`
        let mut field = Field::empty();

        field.name = name;
        field.filename = filename;
        field.index = index;
        field.head = head;
        field.content_type = parse_content_type(headers.remove(CONTENT_TYPE).as_ref());
        field.state_mut().replace(self.state());

        if !headers.is_empty() {
            field.headers_mut().replace(headers);
        }

        Some(Ok(field))
    }
}
