use std::{
    fmt,
    sync::{Arc, Mutex},
};

use bytes::Bytes;

use crate::State;

/// Field
pub struct Field<T> {
    /// The payload size of Field read so far.
    pub length: usize,
    /// The index of Field.
    pub index: usize,
    /// The name of Field, as sent.
    pub name: String,
    /// The filename of Field as sent, optional.
    pub filename: Option<String>,
    /// The content type of Field as sent, optional.
    pub content_type: Option<String>,
    /// The raw header block, each line with its `\r\n`.
    pub head: String,
    /// The extra headers of Field, optional.
    pub headers: Option<http::HeaderMap>,
    pub(crate) pending: Bytes,
    state: Option<Arc<Mutex<State<T>>>>,
}

impl<T> Field<T> {
    /// Creates an empty field.
    pub fn empty() -> Self {
        Self {
            index: 0,
            length: 0,
            name: String::new(),
            filename: None,
            content_type: None,
            head: String::new(),
            headers: None,
            pending: Bytes::new(),
            state: None,
        }
    }

    /// Gets mutable headers.
    pub fn headers_mut(&mut self) -> &mut Option<http::HeaderMap> {
        &mut self.headers
    }

    /// Gets mutable state.
    pub fn state_mut(&mut self) -> &mut Option<Arc<Mutex<State<T>>>> {
        &mut self.state
    }

    /// Gets the status of state.
    pub fn consumed(&self) -> bool {
        self.state.is_none() && self.pending.is_empty()
    }

    /// Whether the part carries a `filename` attribute.
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }
}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("index", &self.index)
            .field("length", &self.length)
            .field("headers", &self.headers)
            .field("consumed", &self.consumed())
            .finish()
    }
}
