pub(crate) const SNIFF_LEN: usize = 512;
pub(crate) const COPY_BUF_LEN: usize = 8 * 1024;

pub(crate) const BOUNDARY_RANDOM_BYTES: usize = 30;
pub(crate) const MAX_BOUNDARY_LEN: usize = 70;

pub(crate) const BOUNDARY_EXT: &str = "--";
pub(crate) const CRLF: &str = "\r\n";

pub(crate) const DEFAULT_FILE_NAME: &str = "file.bin";

// Content type essence -> file name used when a file part arrives unnamed.
pub(crate) const DEFAULT_FILE_NAMES: &[(&str, &str)] = &[
    ("image/png", "image.png"),
    ("image/jpeg", "image.jpg"),
    ("image/jpg", "image.jpg"),
    ("image/gif", "image.gif"),
    ("image/webp", "image.webp"),
    ("image/bmp", "image.bmp"),
    ("image/tiff", "image.tiff"),
];

pub(crate) fn is_boundary_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"'()+_,-./:=? ".contains(&b)
}

pub(crate) fn needs_boundary_quotes(boundary: &str) -> bool {
    boundary.bytes().any(|b| b"()<>@,;:\\\"/[]?= ".contains(&b))
}
