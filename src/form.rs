use crate::constants;
use crate::content_disposition::{self, ContentDisposition};
use crate::helpers;
use crate::named::Named;
use crate::sniff;
use crate::state::FormStage;
use futures_util::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use futures_util::stream::{Stream, TryStreamExt};
use mime::Mime;
use rand::RngCore;
use std::io;

/// A `multipart/form-data` body being written into a sink.
///
/// Parts are written in the order they are added, each one completely
/// (headers, then the whole body) before the call returns. Nothing is
/// buffered beyond the current part's headers, a copy buffer, and the 512
/// byte sniffing prefix of file parts added without a content type.
///
/// Any failure poisons the form: the bytes already written are unusable and
/// every later call fails with [`Error::FormAborted`](crate::Error::FormAborted).
///
/// # Examples
///
/// ```
/// use formpart::Form;
///
/// # async fn run() {
/// let mut form = Form::new(Vec::new());
/// let content_type = form.content_type();
///
/// form.add_field("prompt", "a cat").await.unwrap();
/// form.add_file("image", &b"\x89PNG\r\n\x1a\n..."[..], None, None).await.unwrap();
/// form.finish().await.unwrap();
///
/// let body: Vec<u8> = form.into_inner();
/// assert!(content_type.starts_with("multipart/form-data; boundary="));
/// assert!(body.ends_with(b"--\r\n"));
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(run());
/// ```
#[derive(Debug)]
pub struct Form<W> {
    sink: W,
    boundary: String,
    stage: FormStage,
    parts_written: usize,
}

impl<W> Form<W> {
    /// Creates a form writing into `sink` with a random 60 character boundary.
    pub fn new(sink: W) -> Form<W> {
        let boundary = random_boundary();
        trace!("multipart form created with boundary {}", boundary);

        Form {
            sink,
            boundary,
            stage: FormStage::Empty,
            parts_written: 0,
        }
    }

    /// Creates a form with a caller-chosen boundary.
    ///
    /// The boundary must be 1 to 70 characters from `A-Z a-z 0-9 '()+_,-./:=?`
    /// and space, and must not end with a space.
    pub fn with_boundary<B: Into<String>>(sink: W, boundary: B) -> crate::Result<Form<W>> {
        let boundary = boundary.into();

        let valid = !boundary.is_empty()
            && boundary.len() <= constants::MAX_BOUNDARY_LEN
            && boundary.bytes().all(constants::is_boundary_char)
            && !boundary.ends_with(' ');
        if !valid {
            return Err(crate::Error::InvalidBoundary(boundary));
        }

        Ok(Form {
            sink,
            boundary,
            stage: FormStage::Empty,
            parts_written: 0,
        })
    }

    /// The boundary delimiting every part of this form.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// The `Content-Type` header value to send along with the body.
    pub fn content_type(&self) -> String {
        if constants::needs_boundary_quotes(&self.boundary) {
            format!("multipart/form-data; boundary=\"{}\"", self.boundary)
        } else {
            format!("multipart/form-data; boundary={}", self.boundary)
        }
    }

    /// Number of parts written so far.
    pub fn parts_written(&self) -> usize {
        self.parts_written
    }

    /// Whether [`finish`](Form::finish) has written the closing boundary.
    pub fn is_finished(&self) -> bool {
        self.stage == FormStage::Finished
    }

    /// Returns the sink. A body is only valid once [`finish`](Form::finish)
    /// has succeeded.
    pub fn into_inner(self) -> W {
        self.sink
    }

    fn check_writable(&self) -> crate::Result<()> {
        match self.stage {
            FormStage::Finished => Err(crate::Error::FormFinished),
            FormStage::Aborted => Err(crate::Error::FormAborted),
            FormStage::Empty | FormStage::WritingParts => Ok(()),
        }
    }

    fn settle<T>(&mut self, result: crate::Result<T>) -> crate::Result<T> {
        if result.is_err() {
            self.stage = FormStage::Aborted;
        }
        result
    }
}

impl<W: AsyncWrite + Unpin> Form<W> {
    /// Appends a plain field part. Field parts carry no `Content-Type`.
    pub async fn add_field<N, V>(&mut self, name: N, value: V) -> crate::Result<()>
    where
        N: AsRef<str>,
        V: AsRef<str>,
    {
        self.check_writable()?;

        let result = self.write_field(name.as_ref(), value.as_ref()).await;
        self.settle(result)
    }

    /// Appends a file part streamed from `content`.
    ///
    /// Without `content_type` the content is sniffed first and the detected
    /// type is used; with it, sniffing is skipped and the type is sent as-is.
    /// An empty or missing `file_name` is replaced by a name derived from the
    /// content type (e.g. `image.png`). Directory components are stripped from
    /// the filename before it is written.
    ///
    /// `content` is treated as anonymous: the name of a [`Named`] reader is
    /// only consulted by [`add_named_file`](Form::add_named_file).
    pub async fn add_file<R>(
        &mut self,
        name: &str,
        content: R,
        file_name: Option<&str>,
        content_type: Option<Mime>,
    ) -> crate::Result<()>
    where
        R: AsyncRead + Unpin,
    {
        self.check_writable()?;

        let result = self.write_file(name, content, file_name, None, content_type).await;
        self.settle(result)
    }

    /// Appends a file part whose filename comes from the reader's name.
    pub async fn add_named_file<R>(&mut self, name: &str, content: Named<R>, content_type: Option<Mime>) -> crate::Result<()>
    where
        R: AsyncRead + Unpin,
    {
        self.check_writable()?;

        let fallback = content.name().to_owned();
        let result = self
            .write_file(name, content, None, Some(fallback.as_str()), content_type)
            .await;
        self.settle(result)
    }

    /// Appends a file part streamed from a [`Stream`] of byte chunks.
    pub async fn add_stream<S, O, E>(
        &mut self,
        name: &str,
        stream: S,
        file_name: Option<&str>,
        content_type: Option<Mime>,
    ) -> crate::Result<()>
    where
        S: Stream<Item = Result<O, E>> + Unpin,
        O: AsRef<[u8]> + Unpin,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let reader = stream
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))
            .into_async_read();

        self.add_file(name, reader, file_name, content_type).await
    }

    /// Appends a file part read from a tokio [`AsyncRead`](tokio::io::AsyncRead).
    ///
    /// # Optional
    ///
    /// This requires the optional `tokio-io` feature to be enabled.
    #[cfg(feature = "tokio-io")]
    pub async fn add_tokio_file<R>(
        &mut self,
        name: &str,
        content: R,
        file_name: Option<&str>,
        content_type: Option<Mime>,
    ) -> crate::Result<()>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        use tokio_util::compat::TokioAsyncReadCompatExt;

        self.add_file(name, content.compat(), file_name, content_type).await
    }

    /// Appends a field part holding `value` encoded as JSON.
    ///
    /// # Optional
    ///
    /// This requires the optional `json` feature to be enabled.
    #[cfg(feature = "json")]
    pub async fn add_json_field<T>(&mut self, name: &str, value: &T) -> crate::Result<()>
    where
        T: serde::Serialize + ?Sized,
    {
        self.check_writable()?;

        let encoded = serde_json::to_string(value).map_err(crate::Error::EncodeJson);
        let encoded = self.settle(encoded)?;
        self.add_field(name, encoded).await
    }

    /// Writes the closing boundary and flushes the sink. No part can be added
    /// afterwards.
    pub async fn finish(&mut self) -> crate::Result<()> {
        self.check_writable()?;

        let result = self.write_closing_boundary().await;
        let result = self.settle(result);
        if result.is_ok() {
            self.stage = FormStage::Finished;
            trace!("multipart form finished after {} parts", self.parts_written);
        }
        result
    }

    async fn write_field(&mut self, name: &str, value: &str) -> crate::Result<()> {
        if name.is_empty() {
            return Err(crate::Error::EmptyFieldName);
        }

        let headers = helpers::part_headers(&ContentDisposition::field(name), None)?;
        self.open_part(&headers).await?;

        self.sink
            .write_all(value.as_bytes())
            .await
            .map_err(crate::Error::StreamWriteFailed)
    }

    async fn write_file<R>(
        &mut self,
        name: &str,
        content: R,
        file_name: Option<&str>,
        fallback_name: Option<&str>,
        content_type: Option<Mime>,
    ) -> crate::Result<()>
    where
        R: AsyncRead + Unpin,
    {
        if name.is_empty() {
            return Err(crate::Error::EmptyFieldName);
        }

        match content_type {
            Some(content_type) => {
                self.write_file_part(name, content, file_name, fallback_name, &content_type)
                    .await
            }
            None => {
                let (content_type, reader) = sniff::sniff(content).await?.into_parts();
                self.write_file_part(name, reader, file_name, fallback_name, &content_type)
                    .await
            }
        }
    }

    async fn write_file_part<R>(
        &mut self,
        name: &str,
        mut content: R,
        file_name: Option<&str>,
        fallback_name: Option<&str>,
        content_type: &Mime,
    ) -> crate::Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let file_name = resolve_file_name(file_name, fallback_name, content_type);

        let disposition = ContentDisposition::file(name, file_name);
        let headers = helpers::part_headers(&disposition, Some(content_type))?;
        self.open_part(&headers).await?;

        let copied = helpers::copy_content(&mut content, &mut self.sink).await?;
        trace!("file part '{}' ({}) streamed {} bytes", name, content_type, copied);

        Ok(())
    }

    async fn open_part(&mut self, headers: &[(http::HeaderName, http::HeaderValue)]) -> crate::Result<()> {
        let mut buf = Vec::new();

        if self.stage == FormStage::WritingParts {
            buf.extend_from_slice(constants::CRLF.as_bytes());
        }
        buf.extend_from_slice(constants::BOUNDARY_EXT.as_bytes());
        buf.extend_from_slice(self.boundary.as_bytes());
        buf.extend_from_slice(constants::CRLF.as_bytes());
        buf.extend_from_slice(&helpers::encode_headers(headers));

        self.sink.write_all(&buf).await.map_err(crate::Error::StreamWriteFailed)?;

        self.stage = FormStage::WritingParts;
        self.parts_written += 1;

        Ok(())
    }

    async fn write_closing_boundary(&mut self) -> crate::Result<()> {
        let mut buf = Vec::new();

        if self.stage == FormStage::WritingParts {
            buf.extend_from_slice(constants::CRLF.as_bytes());
        }
        buf.extend_from_slice(constants::BOUNDARY_EXT.as_bytes());
        buf.extend_from_slice(self.boundary.as_bytes());
        buf.extend_from_slice(constants::BOUNDARY_EXT.as_bytes());
        buf.extend_from_slice(constants::CRLF.as_bytes());

        self.sink.write_all(&buf).await.map_err(crate::Error::StreamWriteFailed)?;
        self.sink.flush().await.map_err(crate::Error::StreamWriteFailed)
    }
}

fn random_boundary() -> String {
    let mut bytes = [0u8; constants::BOUNDARY_RANDOM_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);

    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// Explicit name, then the reader's own name, then the content type default.
fn resolve_file_name<'a>(file_name: Option<&'a str>, fallback_name: Option<&'a str>, content_type: &Mime) -> &'a str {
    file_name
        .filter(|name| !name.is_empty())
        .or_else(|| fallback_name.filter(|name| !name.is_empty()))
        .map(content_disposition::base_name)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| sniff::default_file_name(content_type))
}
