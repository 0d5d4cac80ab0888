use crate::constants;
use crate::content_disposition::ContentDisposition;
use futures_util::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use http::header::{self, HeaderName, HeaderValue};
use mime::Mime;

/// Builds the ordered header list of one part: `Content-Disposition`, then
/// `Content-Type` when known.
pub(crate) fn part_headers(
    disposition: &ContentDisposition<'_>,
    content_type: Option<&Mime>,
) -> crate::Result<Vec<(HeaderName, HeaderValue)>> {
    let invalid = |err: http::header::InvalidHeaderValue| crate::Error::InvalidHeaderValue {
        field_name: disposition.field_name.to_owned(),
        cause: err.into(),
    };

    let mut headers = Vec::with_capacity(2);

    let value = HeaderValue::from_bytes(disposition.to_header_value().as_bytes()).map_err(invalid)?;
    headers.push((header::CONTENT_DISPOSITION, value));

    if let Some(content_type) = content_type {
        let value = HeaderValue::from_bytes(content_type.as_ref().as_bytes()).map_err(invalid)?;
        headers.push((header::CONTENT_TYPE, value));
    }

    Ok(headers)
}

/// Serializes headers as `Name: value\r\n` lines plus the blank line that
/// ends the header block.
pub(crate) fn encode_headers(headers: &[(HeaderName, HeaderValue)]) -> Vec<u8> {
    let mut buf = Vec::new();

    for (name, value) in headers {
        buf.extend_from_slice(canonical_name(name).as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(constants::CRLF.as_bytes());
    }
    buf.extend_from_slice(constants::CRLF.as_bytes());

    buf
}

// `content-disposition` -> `Content-Disposition`
fn canonical_name(name: &HeaderName) -> String {
    let mut upper = true;

    name.as_str()
        .chars()
        .map(|c| {
            let c = if upper { c.to_ascii_uppercase() } else { c };
            upper = c == '-';
            c
        })
        .collect()
}

/// Copies `reader` into `sink` until end-of-stream, keeping read and write
/// failures apart. Returns the number of bytes copied.
pub(crate) async fn copy_content<R, W>(reader: &mut R, sink: &mut W) -> crate::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; constants::COPY_BUF_LEN];
    let mut copied = 0u64;

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => return Ok(copied),
            Ok(n) => n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(crate::Error::StreamReadFailed(err)),
        };

        sink.write_all(&buf[..n])
            .await
            .map_err(crate::Error::StreamWriteFailed)?;
        copied += n as u64;
    }
}
