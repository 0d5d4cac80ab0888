use std::borrow::Cow;

pub(crate) struct ContentDisposition<'a> {
    pub(crate) field_name: &'a str,
    pub(crate) file_name: Option<&'a str>,
}

impl<'a> ContentDisposition<'a> {
    pub(crate) fn field(field_name: &'a str) -> Self {
        ContentDisposition {
            field_name,
            file_name: None,
        }
    }

    pub(crate) fn file(field_name: &'a str, file_name: &'a str) -> Self {
        ContentDisposition {
            field_name,
            file_name: Some(file_name),
        }
    }

    /// Renders the `form-data` header value with both parameters quoted.
    pub(crate) fn to_header_value(&self) -> String {
        match self.file_name {
            Some(file_name) => format!(
                r#"form-data; name="{}"; filename="{}""#,
                escape_quotes(self.field_name),
                escape_quotes(file_name)
            ),
            None => format!(r#"form-data; name="{}""#, escape_quotes(self.field_name)),
        }
    }
}

/// Escapes `\` and `"` so the value stays inside its quoted-string.
pub(crate) fn escape_quotes(value: &str) -> Cow<'_, str> {
    if !value.contains(|c| c == '\\' || c == '"') {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 4);
    for c in value.chars() {
        if c == '\\' || c == '"' {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    Cow::Owned(escaped)
}

/// Returns the last `/`-separated element of `path`, ignoring trailing slashes.
///
/// Backslashes are kept: they are ordinary file name bytes here and get
/// escaped rather than treated as separators.
pub(crate) fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');

    match memchr::memrchr(b'/', trimmed.as_bytes()) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}
