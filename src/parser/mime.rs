//! The streaming MIME parser.
//!
//! A depth-first, forward-scanning pass over the stream: header block,
//! content model resolution, then body construction, recursing into
//! multipart segments and embedded messages. Tolerant of malformed input:
//!
//! - Mixed `\n` and `\r\n` line endings
//! - Missing blank lines after header blocks
//! - `multipart/*` without a boundary parameter (kept opaque)
//! - Truncated multiparts and messages at end of input
//! - Boundary delimiters belonging to an enclosing multipart
//!
//! Structural defects never abort the parse; they are reported through the
//! configured [`Report`] sink and a best-effort partial tree is returned.

use tracing::debug;

use crate::error::Result;
use crate::model::content_type::ContentType;
use crate::model::entity::{ByteRange, Entity, Envelope, Message, Multipart, Part};
use crate::model::header::HeaderList;
use crate::parser::envelope;
use crate::parser::header::{self, HeaderHook};
use crate::parser::lines::LineReader;
use crate::report::{Condition, ConditionKind, LogReport, Report};
use crate::stream::Stream;

/// Maximum multipart/message nesting depth. Deeper structure is kept
/// opaque and reported, never recursed into.
const MAX_DEPTH: usize = 10;

/// Active boundary scopes, outermost first.
#[derive(Debug, Default)]
pub(crate) struct BoundaryStack {
    tokens: Vec<String>,
}

/// A delimiter line match against the stack. `level` indexes the stack;
/// the innermost scope is `depth() - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BoundaryHit {
    Part { level: usize },
    Close { level: usize },
}

impl BoundaryStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, token: String) {
        self.tokens.push(token);
    }

    fn pop(&mut self) {
        self.tokens.pop();
    }

    fn depth(&self) -> usize {
        self.tokens.len()
    }

    /// Classify a line (terminator already stripped) against every active
    /// boundary, innermost first. Trailing whitespace after the delimiter
    /// is ignored, as RFC 2046 requires.
    pub(crate) fn check(&self, line: &[u8]) -> Option<BoundaryHit> {
        let rest = line.strip_prefix(b"--")?;
        for (level, token) in self.tokens.iter().enumerate().rev() {
            if let Some(tail) = rest.strip_prefix(token.as_bytes()) {
                let tail = trim_trailing_ws(tail);
                if tail.is_empty() {
                    return Some(BoundaryHit::Part { level });
                }
                if tail == b"--" {
                    return Some(BoundaryHit::Close { level });
                }
            }
        }
        None
    }
}

fn trim_trailing_ws(bytes: &[u8]) -> &[u8] {
    let mut end = bytes.len();
    while end > 0 && (bytes[end - 1] == b' ' || bytes[end - 1] == b'\t') {
        end -= 1;
    }
    &bytes[..end]
}

/// Body construction strategy chosen by the content model resolver.
enum Strategy {
    Leaf,
    Multipart(String),
    Message,
}

/// Streaming MIME parser over a byte stream.
///
/// One instance owns one stream plus its buffering state and registered
/// hook; it must not be shared across threads mid-parse. Independent
/// parsers over independent streams are fully parallel.
pub struct Parser<S: Stream> {
    reader: LineReader<S>,
    scan_from: bool,
    hook: Option<HeaderHook>,
    reporter: Box<dyn Report>,
    envelope: Option<Envelope>,
}

impl<S: Stream> Parser<S> {
    /// Create a parser with envelope scanning disabled (part/EML parsing).
    pub fn new(stream: S) -> Self {
        Self {
            reader: LineReader::new(stream),
            scan_from: false,
            hook: None,
            reporter: Box::new(LogReport),
            envelope: None,
        }
    }

    /// Create a parser with envelope scanning enabled (mbox streams).
    pub fn for_mbox(stream: S) -> Self {
        let mut parser = Self::new(stream);
        parser.scan_from = true;
        parser
    }

    /// Enable or disable mbox `From ` line recognition for
    /// [`construct_message`](Self::construct_message).
    pub fn set_scan_from(&mut self, scan_from: bool) {
        self.scan_from = scan_from;
    }

    pub fn scan_from(&self) -> bool {
        self.scan_from
    }

    /// Register the header-pattern hook. Replaces any prior registration.
    ///
    /// `pattern` is a regular expression matched against header names; the
    /// callback receives `(name, unfolded value, offset)` for each match,
    /// in discovery order, while headers are being parsed.
    pub fn set_header_regex(
        &mut self,
        pattern: &str,
        callback: impl FnMut(&str, &str, u64) + 'static,
    ) -> Result<()> {
        self.hook = Some(HeaderHook::new(pattern, callback)?);
        Ok(())
    }

    /// Replace the recoverable-condition sink (default: `tracing` warnings).
    pub fn set_reporter(&mut self, reporter: impl Report + 'static) {
        self.reporter = Box::new(reporter);
    }

    /// Current byte offset in the stream.
    pub fn tell(&self) -> u64 {
        self.reader.tell()
    }

    /// Whether all input has been consumed.
    pub fn eos(&self) -> bool {
        self.reader.eos()
    }

    /// Envelope metadata from the most recently matched `From ` line.
    pub fn envelope(&self) -> Option<&Envelope> {
        self.envelope.as_ref()
    }

    /// Sender token from the most recently matched `From ` line.
    pub fn envelope_sender(&self) -> Option<&str> {
        self.envelope.as_ref().map(|e| e.sender.as_str())
    }

    /// Offset of the most recently matched `From ` line.
    pub fn envelope_offset(&self) -> Option<u64> {
        self.envelope.as_ref().map(|e| e.offset)
    }

    /// Reposition to an absolute offset for resumed parsing.
    ///
    /// Requires a seekable stream; fails with `SeekUnsupported` otherwise.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        debug!(offset, "repositioning parser");
        self.reader.seek(offset)
    }

    /// Consume the parser, returning the underlying stream.
    pub fn into_stream(self) -> S {
        self.reader.into_inner()
    }

    /// Construct a single MIME entity from the current position.
    ///
    /// No envelope scanning: the input is a bare part or message fragment
    /// (headers plus body). Always returns an entity; structural problems
    /// are reported, not raised.
    pub fn construct_part(&mut self) -> Result<Entity> {
        let mut bounds = BoundaryStack::new();
        self.construct_entity(&mut bounds, 0)
    }

    /// Construct a complete message from the current position.
    ///
    /// Runs the envelope scanner first when `scan_from` is set. Repeated
    /// calls continue where the previous message ended, so concatenated
    /// mbox messages parse with a simple loop.
    pub fn construct_message(&mut self) -> Result<Message> {
        let mut found = None;
        if self.scan_from {
            if let Some(env) = envelope::scan(&mut self.reader)? {
                debug!(offset = env.offset, sender = %env.sender, "matched envelope line");
                self.envelope = Some(env.clone());
                found = Some(env);
            }
        }
        let mut bounds = BoundaryStack::new();
        let mut message = self.build_message(&mut bounds, 0)?;
        message.envelope = found;
        Ok(message)
    }

    /// Parse a header block, then build the body it describes. Used for the
    /// top level of `construct_part` and for every multipart segment.
    fn construct_entity(&mut self, bounds: &mut BoundaryStack, depth: usize) -> Result<Entity> {
        let headers = self.parse_headers(bounds)?;
        let (ctype, strategy) = self.resolve(&headers);
        self.build_body(headers, ctype, strategy, bounds, depth)
    }

    /// Parse a message: its own header block plus one body entity.
    fn build_message(&mut self, bounds: &mut BoundaryStack, depth: usize) -> Result<Message> {
        let headers = self.parse_headers(bounds)?;
        let (ctype, strategy) = self.resolve(&headers);
        // The body is described by the message's own headers; it gets an
        // empty header list of its own.
        let body = self.build_body(HeaderList::new(), ctype.clone(), strategy, bounds, depth)?;
        Ok(Message {
            headers,
            content_type: ctype,
            envelope: None,
            body: Box::new(body),
        })
    }

    fn parse_headers(&mut self, bounds: &BoundaryStack) -> Result<HeaderList> {
        header::parse_block(
            &mut self.reader,
            bounds,
            self.hook.as_mut(),
            &mut *self.reporter,
        )
    }

    /// Content model resolution: derive the content type and pick the body
    /// construction strategy.
    fn resolve(&mut self, headers: &HeaderList) -> (ContentType, Strategy) {
        let ctype = match headers.get("Content-Type") {
            None => ContentType::default(),
            Some(value) => match ContentType::parse(value) {
                Some(ct) => ct,
                None => {
                    let offset = headers
                        .get_all("Content-Type")
                        .next()
                        .map(|e| e.offset)
                        .unwrap_or_else(|| self.reader.tell());
                    self.report(
                        ConditionKind::InvalidContentType,
                        offset,
                        format!("unparsable Content-Type '{}', assuming text/plain", value),
                    );
                    ContentType::default()
                }
            },
        };

        let strategy = if ctype.is_multipart() {
            match ctype.boundary() {
                Some(b) => Strategy::Multipart(b.to_string()),
                None => {
                    self.report(
                        ConditionKind::MissingBoundary,
                        self.reader.tell(),
                        format!(
                            "{} without boundary parameter cannot be decomposed",
                            ctype.full_type()
                        ),
                    );
                    Strategy::Leaf
                }
            }
        } else if ctype.is_message() {
            Strategy::Message
        } else {
            Strategy::Leaf
        };

        (ctype, strategy)
    }

    /// Build the body for an already-parsed header block.
    fn build_body(
        &mut self,
        headers: HeaderList,
        ctype: ContentType,
        strategy: Strategy,
        bounds: &mut BoundaryStack,
        depth: usize,
    ) -> Result<Entity> {
        match strategy {
            Strategy::Leaf => self.build_leaf(headers, ctype, bounds),
            Strategy::Multipart(_) | Strategy::Message if depth >= MAX_DEPTH => {
                self.report(
                    ConditionKind::DepthExceeded,
                    self.reader.tell(),
                    format!("nesting deeper than {} levels, keeping content opaque", MAX_DEPTH),
                );
                self.build_leaf(headers, ctype, bounds)
            }
            Strategy::Multipart(boundary) => {
                self.build_multipart(headers, ctype, boundary, bounds, depth)
            }
            Strategy::Message => {
                if self.reader.peek_line()?.is_none() {
                    self.report(
                        ConditionKind::TruncatedMessage,
                        self.reader.tell(),
                        "end of input at start of embedded message",
                    );
                }
                let inner = self.build_message(bounds, depth + 1)?;
                Ok(Entity::Message(Box::new(inner)))
            }
        }
    }

    /// Record the content range of an opaque part: from the current offset
    /// to the enclosing boundary (or end of input), without decoding.
    fn build_leaf(
        &mut self,
        headers: HeaderList,
        ctype: ContentType,
        bounds: &BoundaryStack,
    ) -> Result<Entity> {
        let start = self.reader.tell();
        let end = self.scan_to_boundary(bounds)?;
        Ok(Entity::Part(Part {
            headers,
            content_type: ctype,
            content: ByteRange::new(start, end),
        }))
    }

    /// Advance to the next line matching any active boundary (left
    /// unconsumed) or to end of input. Returns the end offset.
    ///
    /// With `scan_from` set, a line with the full mbox separator shape
    /// (marker, sender, timestamp) also ends the scan: in a
    /// concatenated-message stream the next separator delimits the current
    /// message, and leaving it unconsumed lets the next
    /// `construct_message` call pick it up without rewinding. Ordinary
    /// body lines that merely start with `From ` do not qualify.
    fn scan_to_boundary(&mut self, bounds: &BoundaryStack) -> Result<u64> {
        loop {
            match self.reader.peek_line()? {
                None => return Ok(self.reader.tell()),
                Some(line) if bounds.check(line.content()).is_some() => {
                    return Ok(line.offset());
                }
                Some(line) if self.scan_from && envelope::is_message_separator(line.content()) => {
                    return Ok(line.offset());
                }
                Some(_) => {
                    self.reader.next_line()?;
                }
            }
        }
    }

    fn build_multipart(
        &mut self,
        headers: HeaderList,
        ctype: ContentType,
        boundary: String,
        bounds: &mut BoundaryStack,
        depth: usize,
    ) -> Result<Entity> {
        bounds.push(boundary.clone());
        let scope = self.multipart_scope(bounds, depth);
        bounds.pop();
        let (preamble, parts, closed) = scope?;

        // Epilogue runs from the closing delimiter to the enclosing scope;
        // our own boundary is out of play by now.
        let mut epilogue = None;
        if closed {
            let start = self.reader.tell();
            let end = self.scan_to_boundary(bounds)?;
            if end > start {
                epilogue = Some(ByteRange::new(start, end));
            }
        }

        Ok(Entity::Multipart(Multipart {
            headers,
            content_type: ctype,
            boundary,
            preamble,
            parts,
            epilogue,
        }))
    }

    /// Decompose the interior of a multipart whose boundary is the
    /// innermost stack entry: preamble, then one entity per segment, until
    /// the closing delimiter. Ancestor delimiters and end of input
    /// terminate the scope early as a truncation.
    fn multipart_scope(
        &mut self,
        bounds: &mut BoundaryStack,
        depth: usize,
    ) -> Result<(Option<ByteRange>, Vec<Entity>, bool)> {
        let own_level = bounds.depth() - 1;
        let preamble_start = self.reader.tell();
        let mut parts = Vec::new();
        let mut in_preamble = true;
        let mut preamble = None;

        loop {
            enum Next {
                Eof,
                Data,
                OwnPart,
                OwnClose,
                Ancestor,
                Separator,
            }
            let scan_from = self.scan_from;
            let (next, line_offset) = match self.reader.peek_line()? {
                None => (Next::Eof, self.reader.tell()),
                Some(line) => {
                    let verdict = match bounds.check(line.content()) {
                        Some(BoundaryHit::Part { level }) if level == own_level => Next::OwnPart,
                        Some(BoundaryHit::Close { level }) if level == own_level => Next::OwnClose,
                        Some(_) => Next::Ancestor,
                        None if scan_from && envelope::is_message_separator(line.content()) => {
                            Next::Separator
                        }
                        None => Next::Data,
                    };
                    (verdict, line.offset())
                }
            };

            if in_preamble && !matches!(next, Next::Data) && line_offset > preamble_start {
                preamble = Some(ByteRange::new(preamble_start, line_offset));
            }

            match next {
                Next::Data => {
                    // Only preamble bytes reach here; segment content is
                    // consumed by construct_entity below.
                    self.reader.next_line()?;
                }
                Next::OwnPart => {
                    self.reader.next_line()?;
                    in_preamble = false;
                    let child = self.construct_entity(bounds, depth + 1)?;
                    parts.push(child);
                }
                Next::OwnClose => {
                    self.reader.next_line()?;
                    return Ok((preamble, parts, true));
                }
                Next::Ancestor => {
                    self.report(
                        ConditionKind::TruncatedMultipart,
                        line_offset,
                        "enclosing boundary before closing delimiter",
                    );
                    return Ok((preamble, parts, false));
                }
                Next::Separator => {
                    self.report(
                        ConditionKind::TruncatedMultipart,
                        line_offset,
                        "mbox separator before closing delimiter",
                    );
                    return Ok((preamble, parts, false));
                }
                Next::Eof => {
                    self.report(
                        ConditionKind::TruncatedMultipart,
                        line_offset,
                        "end of input before closing delimiter",
                    );
                    return Ok((preamble, parts, false));
                }
            }
        }
    }

    fn report(&mut self, kind: ConditionKind, offset: u64, description: impl Into<String>) {
        self.reporter
            .report(&Condition::new(kind, offset, description));
    }
}
