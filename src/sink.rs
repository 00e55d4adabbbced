use std::io::{Read, Write};

use bytes::BytesMut;
use tempfile::{Builder, NamedTempFile};
use tracing::{debug, trace};

use crate::{
    utils::DEFAULT_FILE_CONTENT_TYPE, EmptyFile, Error, Field, FileUpload, Options, Result, Value,
};

const TEMP_PREFIX: &str = "form-params-";

/// Where the body of one part goes.
///
/// A temporary file is deleted if the sink is dropped before
/// [`BodySink::finish`], so a failed parse leaves nothing behind.
pub(crate) enum BodySink {
    Text(BytesMut),
    File { file: NamedTempFile, size: u64 },
    /// File input with nothing selected.
    Empty,
}

impl BodySink {
    pub(crate) fn open(filename: Option<&str>, options: &Options) -> Result<Self> {
        match filename {
            None => Ok(Self::Text(BytesMut::new())),
            Some("") => Ok(Self::Empty),
            Some(_) => {
                let mut builder = Builder::new();
                builder.prefix(TEMP_PREFIX);
                let file = match &options.temp_dir {
                    Some(dir) => builder.tempfile_in(dir),
                    None => builder.tempfile(),
                }
                .map_err(Error::TempFile)?;
                trace!("spooling to {}", file.path().display());
                Ok(Self::File { file, size: 0 })
            }
        }
    }

    pub(crate) fn write(&mut self, chunk: &[u8]) -> Result<()> {
        match self {
            Self::Text(buf) => buf.extend_from_slice(chunk),
            Self::File { file, size } => {
                file.write_all(chunk).map_err(Error::TempFile)?;
                *size += chunk.len() as u64;
            }
            Self::Empty => {}
        }
        Ok(())
    }

    /// Turns the sink into the value stored for `field`.
    ///
    /// `None` when the field is left out of the result.
    pub(crate) fn finish<T>(self, field: &Field<T>, options: &Options) -> Result<Option<Value>> {
        match self {
            Self::Text(buf) => Ok(Some(Value::Text(options.charset.decode(&buf)))),
            Self::Empty => match options.empty_file {
                EmptyFile::Omit => Ok(None),
                EmptyFile::EmptyText => Ok(Some(Value::Text(String::new()))),
            },
            Self::File { mut file, size } => {
                file.flush().map_err(Error::TempFile)?;
                // closes the handle, the path still deletes on drop
                let tempfile = file.into_temp_path();

                let filename = field.filename.as_deref().unwrap_or_default();

                Ok(Some(Value::File(FileUpload {
                    content_type: field
                        .content_type
                        .clone()
                        .unwrap_or_else(|| DEFAULT_FILE_CONTENT_TYPE.to_owned()),
                    filename: options.normalize_filename(filename).to_owned(),
                    name: field.name.clone(),
                    head: field.head.clone(),
                    size,
                    tempfile,
                })))
            }
        }
    }
}

/// Reads the whole body of `field` into its value.
pub(crate) fn read_field<T>(field: &mut Field<T>, options: &Options) -> Result<Option<Value>>
where
    T: Read,
{
    let mut sink = BodySink::open(field.filename.as_deref(), options)?;

    while let Some(buf) = field.next() {
        sink.write(&buf?)?;
    }

    debug!(name = %field.name, length = field.length, "part body read");

    sink.finish(field, options)
}
