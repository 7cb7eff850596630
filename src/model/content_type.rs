//! Content-Type header value: media type, subtype, and parameters.

/// Parsed `Content-Type` value.
///
/// Media type and subtype are stored lowercase; parameter names match
/// case-insensitively but keep their original spelling and order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    pub media: String,
    pub subtype: String,
    params: Vec<(String, String)>,
}

impl Default for ContentType {
    /// RFC 2045 default for messages without a usable Content-Type.
    fn default() -> Self {
        Self {
            media: "text".into(),
            subtype: "plain".into(),
            params: vec![("charset".into(), "us-ascii".into())],
        }
    }
}

impl ContentType {
    pub fn new(media: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            media: media.into().to_ascii_lowercase(),
            subtype: subtype.into().to_ascii_lowercase(),
            params: Vec::new(),
        }
    }

    /// Parse a raw `Content-Type` header value.
    ///
    /// Returns `None` when no `type/subtype` shape can be found; parameter
    /// segments that do not parse are skipped rather than failing the whole
    /// value.
    pub fn parse(value: &str) -> Option<Self> {
        let mut segments = split_params(value);
        let type_part = segments.next()?.trim().to_string();

        let (media, subtype) = type_part.split_once('/')?;
        let media = media.trim();
        let subtype = subtype.trim();
        if media.is_empty() || subtype.is_empty() || !is_token(media) || !is_token(subtype) {
            return None;
        }

        let mut ctype = Self::new(media, subtype);
        for segment in segments {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            if let Some((name, raw)) = segment.split_once('=') {
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                ctype.params.push((name.to_string(), unquote(raw.trim())));
            }
        }
        Some(ctype)
    }

    /// `type/subtype` in lowercase.
    pub fn full_type(&self) -> String {
        format!("{}/{}", self.media, self.subtype)
    }

    /// Parameter lookup by case-insensitive name; first match wins.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Parameters in declaration order.
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// The `boundary` parameter, if declared.
    pub fn boundary(&self) -> Option<&str> {
        self.param("boundary").filter(|b| !b.is_empty())
    }

    pub fn is_multipart(&self) -> bool {
        self.media == "multipart"
    }

    /// `message/rfc822` and its nested-message equivalents.
    pub fn is_message(&self) -> bool {
        self.media == "message" && matches!(self.subtype.as_str(), "rfc822" | "news" | "global")
    }
}

/// Split a header value on `;`, honoring quoted strings.
fn split_params(value: &str) -> impl Iterator<Item = &str> {
    let mut segments = Vec::new();
    let bytes = value.as_bytes();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_quotes => escaped = true,
            b'"' => in_quotes = !in_quotes,
            b';' if !in_quotes => {
                segments.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&value[start..]);
    segments.into_iter()
}

/// Strip surrounding quotes and resolve backslash escapes.
fn unquote(raw: &str) -> String {
    let inner = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);
    if !inner.contains('\\') {
        return inner.to_string();
    }
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// RFC 2045 token check, relaxed to reject only whitespace and control bytes.
fn is_token(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_graphic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let ct = ContentType::parse("text/html").unwrap();
        assert_eq!(ct.media, "text");
        assert_eq!(ct.subtype, "html");
        assert_eq!(ct.full_type(), "text/html");
    }

    #[test]
    fn test_parse_with_params() {
        let ct = ContentType::parse("text/plain; charset=ISO-8859-1; format=flowed").unwrap();
        assert_eq!(ct.param("charset"), Some("ISO-8859-1"));
        assert_eq!(ct.param("CHARSET"), Some("ISO-8859-1"));
        assert_eq!(ct.param("format"), Some("flowed"));
    }

    #[test]
    fn test_parse_quoted_boundary() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"=-zx; 42\"").unwrap();
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary(), Some("=-zx; 42"));
    }

    #[test]
    fn test_parse_case_normalized() {
        let ct = ContentType::parse("Multipart/Alternative; Boundary=abc").unwrap();
        assert_eq!(ct.full_type(), "multipart/alternative");
        assert_eq!(ct.boundary(), Some("abc"));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(ContentType::parse("").is_none());
        assert!(ContentType::parse("garbage").is_none());
        assert!(ContentType::parse("/plain").is_none());
        assert!(ContentType::parse("text/").is_none());
        assert!(ContentType::parse("te xt/plain").is_none());
    }

    #[test]
    fn test_message_types() {
        assert!(ContentType::parse("message/rfc822").unwrap().is_message());
        assert!(ContentType::parse("message/global").unwrap().is_message());
        assert!(!ContentType::parse("message/delivery-status")
            .unwrap()
            .is_message());
    }

    #[test]
    fn test_default_is_text_plain() {
        let ct = ContentType::default();
        assert_eq!(ct.full_type(), "text/plain");
        assert_eq!(ct.param("charset"), Some("us-ascii"));
    }

    #[test]
    fn test_escaped_quoted_param() {
        let ct = ContentType::parse(r#"application/x-thing; name="a \"b\" c""#).unwrap();
        assert_eq!(ct.param("name"), Some(r#"a "b" c"#));
    }
}
