use std::fmt::{self, Debug, Display, Formatter};

use derive_more::Display;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A set of errors that can occur while sniffing part content and encoding a
/// `multipart/form-data` stream.
#[derive(Display)]
#[non_exhaustive]
pub enum Error {
    /// Reading a file part's content, or its sniffing prefix, failed.
    #[display(fmt = "stream read failed: {}", _0)]
    StreamReadFailed(std::io::Error),

    /// The output sink rejected a write or a flush.
    #[display(fmt = "stream write failed: {}", _0)]
    StreamWriteFailed(std::io::Error),

    /// A part was added, or the form finished, after
    /// [`finish`](crate::Form::finish) already wrote the closing boundary.
    #[display(fmt = "multipart form is already finished")]
    FormFinished,

    /// An earlier operation on the form failed; its output is unusable.
    #[display(fmt = "multipart form was aborted by an earlier error")]
    FormAborted,

    /// A part was added with an empty name.
    #[display(fmt = "part name must not be empty")]
    EmptyFieldName,

    /// A part name or file name can't be carried in a header value.
    #[display(fmt = "invalid header value for part '{}': {}", field_name, cause)]
    InvalidHeaderValue { field_name: String, cause: BoxError },

    /// The boundary given to [`Form::with_boundary`](crate::Form::with_boundary)
    /// is not a valid multipart boundary.
    #[display(fmt = "invalid multipart boundary: {:?}", _0)]
    InvalidBoundary(String),

    /// The content type given to [`parse_boundary`](crate::parse_boundary)
    /// is not `multipart/form-data`.
    #[display(fmt = "Content-Type is not multipart/form-data")]
    NoMultipart,

    /// Failed to convert the content type to [`mime::Mime`] type.
    #[display(fmt = "Failed to convert Content-Type to `mime::Mime` type: {}", _0)]
    DecodeContentType(mime::FromStrError),

    /// No boundary found in the content type.
    #[display(fmt = "multipart boundary not found in Content-Type")]
    NoBoundary,

    /// Failed to encode a value as `JSON` in
    /// [`Form::add_json_field`](crate::Form::add_json_field).
    #[cfg(feature = "json")]
    #[display(fmt = "failed to encode field value as JSON: {}", _0)]
    EncodeJson(serde_json::Error),
}

impl Error {
    /// Whether the failure came from reading part content rather than from
    /// encoding or writing the form.
    pub fn is_read_error(&self) -> bool {
        matches!(self, Error::StreamReadFailed(_))
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::StreamReadFailed(err) | Error::StreamWriteFailed(err) => Some(err),
            Error::InvalidHeaderValue { cause, .. } => Some(cause.as_ref()),
            Error::DecodeContentType(err) => Some(err),
            #[cfg(feature = "json")]
            Error::EncodeJson(err) => Some(err),
            _ => None,
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string().eq(&other.to_string())
    }
}

impl Eq for Error {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    #[test]
    fn test_read_error_kind() {
        let err = Error::StreamReadFailed(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        assert!(err.is_read_error());
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "stream read failed: gone");

        let err = Error::StreamWriteFailed(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        assert!(!err.is_read_error());
        assert!(!Error::FormFinished.is_read_error());
    }

    #[test]
    fn test_error_eq_by_message() {
        assert_eq!(Error::FormFinished, Error::FormFinished);
        assert_ne!(Error::FormFinished, Error::FormAborted);
        assert_eq!(
            Error::InvalidBoundary("a b ".to_owned()).to_string(),
            "invalid multipart boundary: \"a b \""
        );
    }
}
