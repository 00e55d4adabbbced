use thiserror::Error;

/// Form-params Error
#[derive(Debug, Error)]
pub enum Error {
    /// IO Error while reading the request body
    #[error(transparent)]
    Stream(#[from] std::io::Error),

    /// Temporary file could not be created or written
    #[error("temporary file failure: {0}")]
    TempFile(#[source] std::io::Error),

    /// `Content-Type` is `multipart/form-data` but carries no usable boundary
    #[error("missing boundary in multipart/form-data content type")]
    MissingBoundary,

    /// A part has no blank line between its headers and its body
    #[error("malformed part, no header/body separator")]
    MalformedPart,

    /// A part has no usable `Content-Disposition` header
    #[error("missing content disposition")]
    MissingDisposition,

    /// Stream ended before the closing boundary or the declared length
    #[error("incomplete body, read `{read}` bytes")]
    IncompleteBody {
        /// Bytes read before the stream ended.
        read: u64,
    },

    /// Invalid part header
    #[error("invalid part header")]
    InvalidHeader,

    /// Try Lock Error
    #[error("`{0}`")]
    TryLockError(String),
}

impl Error {
    /// Whether the parser drops the offending part and keeps going.
    #[must_use]
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::MissingDisposition)
    }
}
