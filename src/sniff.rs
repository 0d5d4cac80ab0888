//! Content-type detection over forward-only byte sources.
//!
//! [`sniff`] captures a bounded prefix of a reader, classifies it, and hands
//! back a reader that replays the prefix before continuing with the rest of
//! the source. The source is never rewound, so any `AsyncRead` works.

use crate::constants;
use bytes::Bytes;
use futures_util::io::{AsyncRead, AsyncReadExt, Chain, Cursor};
use mime::Mime;

/// The outcome of [`sniff`]: the detected content type and a reader equal in
/// content to the original input.
#[derive(Debug)]
pub struct Sniffed<R> {
    content_type: Mime,
    reader: Chain<Cursor<Bytes>, R>,
}

impl<R> Sniffed<R> {
    /// The detected content type.
    pub fn content_type(&self) -> &Mime {
        &self.content_type
    }

    /// Returns the reconstructed reader. It first yields the sniffed prefix,
    /// then the unread remainder of the original input.
    pub fn into_reader(self) -> Chain<Cursor<Bytes>, R> {
        self.reader
    }

    /// Splits into the content type and the reconstructed reader.
    pub fn into_parts(self) -> (Mime, Chain<Cursor<Bytes>, R>) {
        (self.content_type, self.reader)
    }
}

/// Detects the content type of `input` from at most its first 512 bytes.
///
/// Short reads don't end the capture early; only end-of-stream does. The
/// original reader must not be used again directly: read the content back
/// through [`Sniffed::into_reader`].
///
/// # Examples
///
/// ```
/// use futures_util::io::AsyncReadExt;
///
/// # async fn run() {
/// let png = b"\x89PNG\r\n\x1a\n-rest-of-the-image-";
/// let sniffed = formpart::sniff(&png[..]).await.unwrap();
/// assert_eq!(sniffed.content_type(), &mime::IMAGE_PNG);
///
/// let mut body = Vec::new();
/// sniffed.into_reader().read_to_end(&mut body).await.unwrap();
/// assert_eq!(body, png);
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(run());
/// ```
pub async fn sniff<R>(mut input: R) -> crate::Result<Sniffed<R>>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = vec![0u8; constants::SNIFF_LEN];
    let mut filled = 0;

    while filled < prefix.len() {
        match input.read(&mut prefix[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(crate::Error::StreamReadFailed(err)),
        }
    }
    prefix.truncate(filled);

    let content_type = detect_content_type(&prefix);
    trace!("sniffed {} from a {} byte prefix", content_type, filled);

    Ok(Sniffed {
        content_type,
        reader: Cursor::new(Bytes::from(prefix)).chain(input),
    })
}

/// Classifies `data` by its leading bytes, looking at no more than 512 of
/// them. Unrecognized binary data is `application/octet-stream`, and so is
/// an empty slice.
pub fn detect_content_type(data: &[u8]) -> Mime {
    let data = &data[..data.len().min(constants::SNIFF_LEN)];

    if data.is_empty() {
        return mime::APPLICATION_OCTET_STREAM;
    }

    let essence = SIGNATURES
        .iter()
        .find_map(|sig| sig.matches(data))
        .unwrap_or(OCTET_STREAM);

    essence.parse().unwrap_or(mime::APPLICATION_OCTET_STREAM)
}

/// Returns the file name used for an unnamed file part of the given type.
pub fn default_file_name(content_type: &Mime) -> &'static str {
    let essence = content_type.essence_str();

    constants::DEFAULT_FILE_NAMES
        .iter()
        .find(|(ct, _)| essence.eq_ignore_ascii_case(ct))
        .map(|(_, name)| *name)
        .unwrap_or(constants::DEFAULT_FILE_NAME)
}

const OCTET_STREAM: &str = "application/octet-stream";
const TEXT_UTF8: &str = "text/plain; charset=utf-8";
const HTML_UTF8: &str = "text/html; charset=utf-8";

enum Signature {
    /// Data starts with the pattern.
    Exact(&'static [u8], &'static str),
    /// `data[i] & mask[i] == pat[i]` for every pattern byte.
    Masked {
        mask: &'static [u8],
        pat: &'static [u8],
        skip_ws: bool,
        ct: &'static str,
    },
    /// A case-insensitive HTML tag followed by a space or `>`.
    Html(&'static [u8]),
    Mp4,
    Text,
}

impl Signature {
    fn matches(&self, data: &[u8]) -> Option<&'static str> {
        match *self {
            Signature::Exact(pat, ct) => data.starts_with(pat).then(|| ct),
            Signature::Masked {
                mask,
                pat,
                skip_ws,
                ct,
            } => {
                let data = if skip_ws { skip_whitespace(data) } else { data };
                if data.len() < pat.len() {
                    return None;
                }

                pat.iter()
                    .zip(mask)
                    .zip(data)
                    .all(|((p, m), d)| d & m == *p)
                    .then(|| ct)
            }
            Signature::Html(tag) => {
                let data = skip_whitespace(data);
                if data.len() < tag.len() + 1 {
                    return None;
                }

                let tag_matches = tag.iter().zip(data).all(|(t, d)| {
                    let d = if t.is_ascii_uppercase() { d & 0xDF } else { *d };
                    *t == d
                });

                (tag_matches && matches!(data[tag.len()], b' ' | b'>')).then(|| HTML_UTF8)
            }
            Signature::Mp4 => is_mp4(data).then(|| "video/mp4"),
            Signature::Text => skip_whitespace(data)
                .iter()
                .all(|b| !is_binary_byte(*b))
                .then(|| TEXT_UTF8),
        }
    }
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\x0c' | b'\r' | b' ')
}

fn skip_whitespace(data: &[u8]) -> &[u8] {
    let start = data.iter().position(|b| !is_whitespace(*b)).unwrap_or(data.len());
    &data[start..]
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

// An ISO base media file whose `ftyp` box lists an `mp4` brand.
fn is_mp4(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }

    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if data.len() < box_size || box_size % 4 != 0 || &data[4..8] != b"ftyp" {
        return false;
    }

    // Brands live at 8 (major) and 16.. (compatible); 12 is the minor version.
    (8..box_size)
        .step_by(4)
        .filter(|&st| st != 12)
        .any(|st| &data[st..st + 3] == b"mp4")
}

static SIGNATURES: &[Signature] = &[
    Signature::Html(b"<!DOCTYPE HTML"),
    Signature::Html(b"<HTML"),
    Signature::Html(b"<HEAD"),
    Signature::Html(b"<SCRIPT"),
    Signature::Html(b"<IFRAME"),
    Signature::Html(b"<H1"),
    Signature::Html(b"<DIV"),
    Signature::Html(b"<FONT"),
    Signature::Html(b"<TABLE"),
    Signature::Html(b"<A"),
    Signature::Html(b"<STYLE"),
    Signature::Html(b"<TITLE"),
    Signature::Html(b"<B"),
    Signature::Html(b"<BODY"),
    Signature::Html(b"<BR"),
    Signature::Html(b"<P"),
    Signature::Html(b"<!--"),
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\xFF",
        pat: b"<?xml",
        skip_ws: true,
        ct: "text/xml; charset=utf-8",
    },
    Signature::Exact(b"%PDF-", "application/pdf"),
    Signature::Exact(b"%!PS-Adobe-", "application/postscript"),
    // Byte order marks.
    Signature::Masked {
        mask: b"\xFF\xFF\x00\x00",
        pat: b"\xFE\xFF\x00\x00",
        skip_ws: false,
        ct: "text/plain; charset=utf-16be",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\x00\x00",
        pat: b"\xFF\xFE\x00\x00",
        skip_ws: false,
        ct: "text/plain; charset=utf-16le",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\x00",
        pat: b"\xEF\xBB\xBF\x00",
        skip_ws: false,
        ct: TEXT_UTF8,
    },
    // Images.
    Signature::Exact(b"\x00\x00\x01\x00", "image/x-icon"),
    Signature::Exact(b"\x00\x00\x02\x00", "image/x-icon"),
    Signature::Exact(b"BM", "image/bmp"),
    Signature::Exact(b"GIF87a", "image/gif"),
    Signature::Exact(b"GIF89a", "image/gif"),
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF\xFF\xFF",
        pat: b"RIFF\x00\x00\x00\x00WEBPVP",
        skip_ws: false,
        ct: "image/webp",
    },
    Signature::Exact(b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    Signature::Exact(b"\xFF\xD8\xFF", "image/jpeg"),
    Signature::Exact(b"II*\x00", "image/tiff"),
    Signature::Exact(b"MM\x00*", "image/tiff"),
    // Audio and video.
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pat: b"FORM\x00\x00\x00\x00AIFF",
        skip_ws: false,
        ct: "audio/aiff",
    },
    Signature::Exact(b"ID3", "audio/mpeg"),
    Signature::Exact(b"OggS\x00", "application/ogg"),
    Signature::Exact(b"MThd\x00\x00\x00\x06", "audio/midi"),
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pat: b"RIFF\x00\x00\x00\x00AVI ",
        skip_ws: false,
        ct: "video/avi",
    },
    Signature::Masked {
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF",
        pat: b"RIFF\x00\x00\x00\x00WAVE",
        skip_ws: false,
        ct: "audio/wave",
    },
    Signature::Mp4,
    Signature::Exact(b"\x1A\x45\xDF\xA3", "video/webm"),
    // Fonts.
    Signature::Exact(b"wOFF", "font/woff"),
    Signature::Exact(b"wOF2", "font/woff2"),
    Signature::Exact(b"OTTO", "font/otf"),
    Signature::Exact(b"\x00\x01\x00\x00", "font/ttf"),
    Signature::Exact(b"ttcf", "font/collection"),
    // Archives.
    Signature::Exact(b"\x1F\x8B\x08", "application/x-gzip"),
    Signature::Exact(b"PK\x03\x04", "application/zip"),
    Signature::Exact(b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    Signature::Exact(b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed"),
    Signature::Exact(b"\x00asm", "application/wasm"),
    Signature::Text,
];
