use std::sync::{Arc, Mutex};

use crate::{Options, State};

/// Reads parts of a `multipart/form-data` body one by one.
///
/// Yields a [`Field`](crate::Field) per part. A field left unread is skipped
/// when the next one is requested.
pub struct FormData<T> {
    state: Arc<Mutex<State<T>>>,
}

impl<T> FormData<T> {
    /// Creates new FormData with default options.
    pub fn new<B: AsRef<[u8]>>(t: T, b: B) -> Self {
        Self::with_options(t, b, &Options::default())
    }

    /// Creates new FormData.
    pub fn with_options<B: AsRef<[u8]>>(t: T, b: B, options: &Options) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::new(b.as_ref(), t, options))),
        }
    }

    /// Never reads past `length` bytes, and fails if the body is shorter.
    #[must_use]
    pub fn with_content_length(self, length: u64) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.content_length.replace(length);
        }
        self
    }

    /// Gets the shared state.
    pub fn state(&self) -> Arc<Mutex<State<T>>> {
        self.state.clone()
    }
}
