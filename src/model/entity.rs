//! The constructed entity tree: leaf parts, multiparts, embedded messages.
//!
//! Ownership is strictly tree-shaped: a parent exclusively owns its
//! children, and the whole subtree is released with the root. The tree is
//! structurally immutable once construction returns; reading it from
//! multiple threads needs no locking.

use chrono::{DateTime, Utc};

use super::content_type::ContentType;
use super::header::HeaderList;

/// Half-open `[start, end)` byte range into the source stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Recognized mbox envelope separator (`From ` line) metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Byte offset of the `From ` line.
    pub offset: u64,

    /// Sender token from the separator line.
    pub sender: String,

    /// The whole separator line, terminator stripped.
    pub raw: String,

    /// Best-effort parse of the separator's timestamp field.
    pub date: Option<DateTime<Utc>>,
}

/// A MIME entity: one node of the constructed tree.
#[derive(Debug, Clone)]
pub enum Entity {
    /// Opaque content; no further MIME structure.
    Part(Part),
    /// Container with boundary-delimited children.
    Multipart(Multipart),
    /// Embedded `message/rfc822` (or the top-level message body wrapper).
    Message(Box<Message>),
}

impl Entity {
    /// Header block parsed at this entity's own scope.
    ///
    /// Empty for a body entity built directly from its enclosing message's
    /// headers (the headers live on the [`Message`]).
    pub fn headers(&self) -> &HeaderList {
        match self {
            Entity::Part(p) => &p.headers,
            Entity::Multipart(m) => &m.headers,
            Entity::Message(m) => &m.headers,
        }
    }

    pub fn content_type(&self) -> &ContentType {
        match self {
            Entity::Part(p) => &p.content_type,
            Entity::Multipart(m) => &m.content_type,
            Entity::Message(m) => &m.content_type,
        }
    }

    /// Total number of leaf parts in this subtree.
    pub fn leaf_count(&self) -> usize {
        match self {
            Entity::Part(_) => 1,
            Entity::Multipart(m) => m.parts.iter().map(Entity::leaf_count).sum(),
            Entity::Message(m) => m.body.leaf_count(),
        }
    }
}

/// Leaf part: typed, undecoded content identified by byte range.
#[derive(Debug, Clone)]
pub struct Part {
    pub headers: HeaderList,
    pub content_type: ContentType,

    /// `[start, end)` range of the undecoded content bytes in the source.
    pub content: ByteRange,
}

impl Part {
    /// The `Content-Transfer-Encoding` value, lowercase, defaulting to `7bit`.
    pub fn transfer_encoding(&self) -> String {
        self.headers
            .get("Content-Transfer-Encoding")
            .map(|v| v.trim().to_ascii_lowercase())
            .unwrap_or_else(|| "7bit".to_string())
    }

    /// The `Content-Disposition` type token (e.g. `inline`, `attachment`).
    pub fn disposition(&self) -> Option<String> {
        self.headers
            .get("Content-Disposition")
            .map(|v| v.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
    }
}

/// Multipart container.
#[derive(Debug, Clone)]
pub struct Multipart {
    pub headers: HeaderList,
    pub content_type: ContentType,

    /// Declared boundary token (without the `--` prefix).
    pub boundary: String,

    /// Bytes before the first delimiter, if any.
    pub preamble: Option<ByteRange>,

    /// Child entities in source order.
    pub parts: Vec<Entity>,

    /// Bytes after the closing delimiter, if any.
    pub epilogue: Option<ByteRange>,
}

/// A complete message: header block plus exactly one body entity.
#[derive(Debug, Clone)]
pub struct Message {
    /// The message's own header block, in discovery order.
    pub headers: HeaderList,

    /// Content type derived from `headers` (default `text/plain`).
    pub content_type: ContentType,

    /// Envelope metadata when an mbox separator line preceded the headers.
    pub envelope: Option<Envelope>,

    /// The body. Built from `headers`' content model; its own header list
    /// is empty unless the body came from a nested header block.
    pub body: Box<Entity>,
}

impl Message {
    pub fn subject(&self) -> Option<&str> {
        self.headers.get("Subject")
    }

    pub fn message_id(&self) -> Option<&str> {
        self.headers.get("Message-ID")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_range() {
        let r = ByteRange::new(10, 25);
        assert_eq!(r.len(), 15);
        assert!(!r.is_empty());
        assert!(ByteRange::new(5, 5).is_empty());
    }

    #[test]
    fn test_part_transfer_encoding_default() {
        let part = Part {
            headers: HeaderList::new(),
            content_type: ContentType::default(),
            content: ByteRange::new(0, 0),
        };
        assert_eq!(part.transfer_encoding(), "7bit");
        assert_eq!(part.disposition(), None);
    }

    #[test]
    fn test_part_disposition() {
        let mut headers = HeaderList::new();
        headers.push("Content-Disposition", "Attachment; filename=a.txt", 0);
        let part = Part {
            headers,
            content_type: ContentType::default(),
            content: ByteRange::new(0, 0),
        };
        assert_eq!(part.disposition().as_deref(), Some("attachment"));
    }
}
