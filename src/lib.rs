//! A streaming `multipart/form-data` encoder for uploading assets whose size
//! and content type are not known up front.
//!
//! File parts added without a content type are sniffed from their first 512
//! bytes; the sniffed prefix is replayed ahead of the rest of the source, so
//! forward-only readers work. The [`policy`] module decides which optional
//! fields a target model accepts for an operation, and [`assemble`] builds
//! complete request bodies on top of both.
//!
//! # Examples
//!
//! ```
//! use formpart::Form;
//!
//! # async fn run() {
//! let image = b"\x89PNG\r\n\x1a\n...png data...";
//!
//! let mut form = Form::new(Vec::new());
//! form.add_field("prompt", "a cat").await.unwrap();
//! form.add_file("image", &image[..], None, None).await.unwrap();
//! form.finish().await.unwrap();
//!
//! let content_type = form.content_type();
//! let body = form.into_inner();
//! # let _ = (content_type, body);
//! # }
//! # tokio::runtime::Runtime::new().unwrap().block_on(run());
//! ```

#[cfg(feature = "log")]
macro_rules! trace {
    ($($t:tt)*) => (::log::trace!($($t)*));
}

#[cfg(not(feature = "log"))]
macro_rules! trace {
    ($($t:tt)*) => {{
        if false {
            let _ = format_args!($($t)*);
        }
    }};
}

pub use error::Error;
pub use form::Form;
pub use named::Named;
pub use sniff::{default_file_name, detect_content_type, sniff, Sniffed};

pub mod assemble;
mod constants;
mod content_disposition;
mod error;
mod form;
mod helpers;
mod named;
pub mod policy;
mod sniff;
mod state;

/// A Result type often returned from methods that can have `formpart` errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Extracts the boundary from a `multipart/form-data` content type, e.g. one
/// produced by [`Form::content_type`].
pub fn parse_boundary<T: AsRef<str>>(content_type: T) -> Result<String> {
    let m = content_type
        .as_ref()
        .parse::<mime::Mime>()
        .map_err(Error::DecodeContentType)?;

    if !(m.type_() == mime::MULTIPART && m.subtype() == mime::FORM_DATA) {
        return Err(Error::NoMultipart);
    }

    m.get_param(mime::BOUNDARY)
        .map(|name| name.as_str().to_owned())
        .ok_or(Error::NoBoundary)
}
