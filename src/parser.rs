use std::io::Read;

use http::{
    header::{CONTENT_LENGTH, CONTENT_TYPE},
    HeaderMap, Request,
};
use tracing::{debug, warn};

use crate::{
    sink::read_field,
    utils::{parse_boundary, parse_content_length},
    FormData, Options, Params, Result,
};

/// Parses `multipart/form-data` bodies into [`Params`].
///
/// Holds no state between calls, one parser can serve any number of
/// requests at once.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    options: Options,
}

impl Parser {
    /// Creates a parser with the given options.
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    /// Gets the options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Parses the body of a request.
    ///
    /// Returns `Ok(None)` when the request is not `multipart/form-data`, the
    /// body is not touched then.
    ///
    /// # Errors
    ///
    /// See [`Parser::parse`].
    pub fn parse_request<R>(&self, req: &mut Request<R>) -> Result<Option<Params>>
    where
        R: Read,
    {
        let Some((boundary, content_length)) = Self::framing(req.headers())? else {
            return Ok(None);
        };
        self.parse_body(&boundary, content_length, req.body_mut())
            .map(Some)
    }

    /// Parses `body` as described by `headers`.
    ///
    /// Returns `Ok(None)` when `Content-Type` is not `multipart/form-data`.
    ///
    /// # Errors
    ///
    /// Any [`Error`](crate::Error) but `MissingDisposition`, parts without a
    /// disposition are skipped. Temporary files created before the error are
    /// deleted.
    pub fn parse<R>(&self, headers: &HeaderMap, body: R) -> Result<Option<Params>>
    where
        R: Read,
    {
        let Some((boundary, content_length)) = Self::framing(headers)? else {
            return Ok(None);
        };
        self.parse_body(&boundary, content_length, body).map(Some)
    }

    /// Parses a body with a known boundary.
    ///
    /// # Errors
    ///
    /// See [`Parser::parse`].
    pub fn parse_body<R>(
        &self,
        boundary: &str,
        content_length: Option<u64>,
        body: R,
    ) -> Result<Params>
    where
        R: Read,
    {
        let mut form = FormData::with_options(body, boundary, &self.options);
        if let Some(length) = content_length {
            form = form.with_content_length(length);
        }

        let mut params = Params::new();

        while let Some(item) = form.next() {
            let mut field = match item {
                Ok(field) => field,
                Err(e) if e.is_skippable() => {
                    warn!("skipping part: {}", e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            match read_field(&mut field, &self.options)? {
                Some(value) => params.insert_nested(&field.name, value),
                None => debug!(name = %field.name, "no file selected"),
            }
        }

        Ok(params)
    }

    fn framing(headers: &HeaderMap) -> Result<Option<(String, Option<u64>)>> {
        let Some(content_type) = headers.get(CONTENT_TYPE) else {
            debug!("no content type");
            return Ok(None);
        };

        let Some(boundary) = parse_boundary(&String::from_utf8_lossy(content_type.as_bytes()))?
        else {
            debug!("not multipart: {:?}", content_type);
            return Ok(None);
        };

        Ok(Some((boundary, parse_content_length(headers.get(CONTENT_LENGTH)))))
    }
}

/// Parses a request with default [`Options`].
///
/// # Errors
///
/// See [`Parser::parse`].
pub fn parse_multipart<R>(req: &mut Request<R>) -> Result<Option<Params>>
where
    R: Read,
{
    Parser::default().parse_request(req)
}
