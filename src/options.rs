use std::path::{Path, PathBuf};

use serde::{de, Deserialize, Deserializer, Serialize};

/// What to do with a file part whose `filename` is empty (no file selected).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyFile {
    /// Leave the key out of the result.
    #[default]
    Omit,
    /// Store an empty text value under the key.
    EmptyText,
}

/// How the `filename` attribute is turned into `FileUpload::filename`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Filename {
    /// Keep the last path segment, splitting on `\` and `/`.
    #[default]
    Basename,
    /// Keep the value as sent.
    Verbatim,
}

/// Decoding applied to text field values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Charset {
    /// UTF-8, invalid sequences replaced with `U+FFFD`.
    #[default]
    Utf8,
    /// ISO-8859-1, every byte maps to the code point of the same value.
    Latin1,
}

impl Charset {
    pub(crate) fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
        }
    }
}

/// Parser options
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Options {
    /// Read size for each pull from the body, never zero
    #[serde(deserialize_with = "non_zero")]
    pub buffer_size: usize,
    /// Policy for file inputs left empty
    pub empty_file: EmptyFile,
    /// Policy for uploaded file names
    pub filename: Filename,
    /// Decoding of text fields
    pub charset: Charset,
    /// Directory for upload temp files, the system temp dir if unset
    pub temp_dir: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            buffer_size: Self::DEFAULT_BUFFER_SIZE,
            empty_file: EmptyFile::default(),
            filename: Filename::default(),
            charset: Charset::default(),
            temp_dir: None,
        }
    }
}

impl Options {
    /// Read size, defaults to 8KB
    pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

    /// Read size
    ///
    /// # Panics
    ///
    /// If `size` is zero.
    #[must_use]
    pub fn buffer_size(mut self, size: usize) -> Self {
        assert!(size > 0, "The buffer_size cannot be zero.");
        self.buffer_size = size;
        self
    }

    /// Policy for file inputs left empty
    #[must_use]
    pub fn empty_file(mut self, policy: EmptyFile) -> Self {
        self.empty_file = policy;
        self
    }

    /// Policy for uploaded file names
    #[must_use]
    pub fn filename(mut self, policy: Filename) -> Self {
        self.filename = policy;
        self
    }

    /// Decoding of text fields
    #[must_use]
    pub fn charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Directory for upload temp files
    #[must_use]
    pub fn temp_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.temp_dir.replace(dir.as_ref().to_owned());
        self
    }

    /// Applies the filename policy.
    #[must_use]
    pub fn normalize_filename<'a>(&self, filename: &'a str) -> &'a str {
        match self.filename {
            Filename::Verbatim => filename,
            Filename::Basename => filename
                .rsplit(|c| c == '\\' || c == '/')
                .next()
                .unwrap_or(filename),
        }
    }
}

fn non_zero<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    match usize::deserialize(deserializer)? {
        0 => Err(de::Error::invalid_value(
            de::Unexpected::Unsigned(0),
            &"a buffer size above zero",
        )),
        size => Ok(size),
    }
}
