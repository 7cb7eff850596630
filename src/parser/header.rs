//! Header block parsing: folding, offsets, and pattern-hook dispatch.
//!
//! Consumes lines up to (and including) the blank separator line, leaving
//! the reader positioned at the first body byte. Tolerant of truncated
//! blocks and junk lines; every tolerated defect is reported and parsing
//! continues.

use regex::Regex;

use crate::error::{ParseError, Result};
use crate::model::header::HeaderList;
use crate::parser::lines::LineReader;
use crate::parser::mime::BoundaryStack;
use crate::report::{Condition, ConditionKind, Report};
use crate::stream::Stream;

/// Registered header-pattern hook.
///
/// The pattern is matched against each header *name*; matching headers are
/// handed to the callback in discovery order, with the fully unfolded value
/// and the offset of the entry's first physical line. At most one hook is
/// active per parser; registering again replaces the previous one.
pub struct HeaderHook {
    pattern: Regex,
    callback: Box<dyn FnMut(&str, &str, u64)>,
}

impl std::fmt::Debug for HeaderHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeaderHook")
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

impl HeaderHook {
    pub fn new(pattern: &str, callback: impl FnMut(&str, &str, u64) + 'static) -> Result<Self> {
        let compiled = Regex::new(pattern).map_err(|e| ParseError::InvalidPattern {
            pattern: pattern.to_string(),
            source: e,
        })?;
        Ok(Self {
            pattern: compiled,
            callback: Box::new(callback),
        })
    }

    fn dispatch(&mut self, name: &str, value: &str, offset: u64) {
        if self.pattern.is_match(name) {
            (self.callback)(name, value, offset);
        }
    }
}

/// Parse one header block from the reader's current position.
///
/// Stops at the blank separator line (consumed), at end of input, or at a
/// line matching an active boundary delimiter (left unconsumed). The last
/// two close the block best-effort and report `MissingHeaderTerminator`.
pub(crate) fn parse_block<S: Stream>(
    reader: &mut LineReader<S>,
    bounds: &BoundaryStack,
    mut hook: Option<&mut HeaderHook>,
    reporter: &mut dyn Report,
) -> Result<HeaderList> {
    let mut headers = HeaderList::new();
    // (name, unfolded value, offset of first physical line)
    let mut current: Option<(String, String, u64)> = None;

    enum BlockEnd {
        Blank,
        Eof,
        Boundary(u64),
    }

    loop {
        let verdict = match reader.peek_line()? {
            None => Some(BlockEnd::Eof),
            Some(line) if line.is_blank() => Some(BlockEnd::Blank),
            Some(line) if bounds.check(line.content()).is_some() => {
                Some(BlockEnd::Boundary(line.offset()))
            }
            Some(_) => None,
        };

        if let Some(end) = verdict {
            flush(&mut current, &mut headers, hook.as_deref_mut());
            match end {
                BlockEnd::Blank => {
                    reader.next_line()?;
                }
                BlockEnd::Eof => reporter.report(&Condition::new(
                    ConditionKind::MissingHeaderTerminator,
                    reader.tell(),
                    "end of input before blank line terminating header block",
                )),
                BlockEnd::Boundary(offset) => reporter.report(&Condition::new(
                    ConditionKind::MissingHeaderTerminator,
                    offset,
                    "boundary delimiter before blank line terminating header block",
                )),
            }
            return Ok(headers);
        }

        let Some(line) = reader.next_line()? else {
            continue;
        };
        let offset = line.offset();
        let content = line.content();

        if content[0] == b' ' || content[0] == b'\t' {
            // Folded continuation of the previous header
            match current.as_mut() {
                Some((_, value, _)) => {
                    value.push(' ');
                    value.push_str(decode_bytes(content).trim());
                }
                None => reporter.report(&Condition::new(
                    ConditionKind::MalformedHeader,
                    offset,
                    "continuation line with no preceding header",
                )),
            }
            continue;
        }

        flush(&mut current, &mut headers, hook.as_deref_mut());

        let text = decode_bytes(content);
        match text.split_once(':') {
            Some((name, value)) => {
                let name = name.trim();
                if name.is_empty() || name.contains(char::is_whitespace) {
                    reporter.report(&Condition::new(
                        ConditionKind::MalformedHeader,
                        offset,
                        format!("invalid header name in line '{}'", text.trim_end()),
                    ));
                } else {
                    current = Some((name.to_string(), value.trim().to_string(), offset));
                }
            }
            None => reporter.report(&Condition::new(
                ConditionKind::MalformedHeader,
                offset,
                format!("header line without colon: '{}'", text.trim_end()),
            )),
        }
    }
}

/// Complete the in-progress entry: dispatch the hook, then append.
fn flush(
    current: &mut Option<(String, String, u64)>,
    headers: &mut HeaderList,
    hook: Option<&mut HeaderHook>,
) {
    if let Some((name, value, offset)) = current.take() {
        if let Some(h) = hook {
            h.dispatch(&name, &value, offset);
        }
        headers.push(name, value, offset);
    }
}

/// Decode raw header line bytes to a string.
///
/// Tries UTF-8 first, then falls back to WINDOWS-1252 (which accepts every
/// byte). A leading UTF-8 BOM is stripped.
pub(crate) fn decode_bytes(bytes: &[u8]) -> String {
    let bytes = if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &bytes[3..]
    } else {
        bytes
    };
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::CollectReport;
    use crate::stream::MemStream;

    fn parse(input: &[u8]) -> (HeaderList, CollectReport, u64) {
        let mut reader = LineReader::new(MemStream::new(input.to_vec()));
        let collector = CollectReport::new();
        let mut sink = collector.clone();
        let headers = parse_block(&mut reader, &BoundaryStack::new(), None, &mut sink).unwrap();
        (headers, collector, reader.tell())
    }

    #[test]
    fn test_order_and_duplicates() {
        let (headers, report, _) = parse(b"A: 1\nA: 2\nB: x\n\nbody\n");
        assert_eq!(headers.len(), 3);
        let entries: Vec<(&str, &str)> = headers
            .iter()
            .map(|e| (e.name.as_str(), e.value.as_str()))
            .collect();
        assert_eq!(entries, [("A", "1"), ("A", "2"), ("B", "x")]);
        assert!(report.is_empty());
    }

    #[test]
    fn test_folded_value() {
        let (headers, _, _) = parse(b"Subject: hello\n world\n\n");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("Subject"), Some("hello world"));
    }

    #[test]
    fn test_folded_value_tab_and_offset() {
        let (headers, _, _) = parse(b"X: 1\nSubject: a\n\tb\n\tc\n\n");
        let entry = headers.iter().nth(1).unwrap();
        assert_eq!(entry.value, "a b c");
        assert_eq!(entry.offset, 5);
    }

    #[test]
    fn test_body_position_after_block() {
        let (_, _, tell) = parse(b"A: 1\n\nbody\n");
        assert_eq!(tell, 6, "reader must sit at the first body byte");
    }

    #[test]
    fn test_missing_terminator_at_eof() {
        let (headers, report, _) = parse(b"A: 1\nB: 2");
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("B"), Some("2"));
        let conditions = report.conditions();
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].kind, ConditionKind::MissingHeaderTerminator);
    }

    #[test]
    fn test_malformed_line_skipped() {
        let (headers, report, _) = parse(b"A: 1\nthis is junk\nB: 2\n\n");
        assert_eq!(headers.len(), 2);
        assert_eq!(report.conditions()[0].kind, ConditionKind::MalformedHeader);
    }

    #[test]
    fn test_mbox_separator_not_a_header() {
        // "From " lines carry colons in the timestamp; the whitespace in the
        // would-be name rejects them.
        let (headers, report, _) =
            parse(b"From user@example.com Thu Jan 01 00:00:00 2024\nA: 1\n\n");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("A"), Some("1"));
        assert_eq!(report.conditions()[0].kind, ConditionKind::MalformedHeader);
    }

    #[test]
    fn test_hook_fires_once_per_match() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let seen: Rc<RefCell<Vec<(String, String, u64)>>> = Rc::default();
        let sink = seen.clone();
        let mut hook = HeaderHook::new("^X-", move |name, value, offset| {
            sink.borrow_mut()
                .push((name.to_string(), value.to_string(), offset));
        })
        .unwrap();

        let mut reader = LineReader::new(MemStream::new(b"X-Id: 7\nSubject: hi\n\n".to_vec()));
        let mut report = CollectReport::new();
        let headers = parse_block(
            &mut reader,
            &BoundaryStack::new(),
            Some(&mut hook),
            &mut report,
        )
        .unwrap();

        assert_eq!(headers.len(), 2);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], ("X-Id".to_string(), "7".to_string(), 0));
    }

    #[test]
    fn test_hook_sees_unfolded_value() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let seen: Rc<RefCell<Vec<String>>> = Rc::default();
        let sink = seen.clone();
        let mut hook = HeaderHook::new("(?i)^received$", move |_, value, _| {
            sink.borrow_mut().push(value.to_string());
        })
        .unwrap();

        let mut reader = LineReader::new(MemStream::new(
            b"Received: from a\n by b\nReceived: from c\n\n".to_vec(),
        ));
        let mut report = CollectReport::new();
        parse_block(
            &mut reader,
            &BoundaryStack::new(),
            Some(&mut hook),
            &mut report,
        )
        .unwrap();

        assert_eq!(*seen.borrow(), ["from a by b", "from c"]);
    }

    #[test]
    fn test_bad_hook_pattern() {
        let err = HeaderHook::new("(unclosed", |_, _, _| {}).unwrap_err();
        assert!(matches!(err, ParseError::InvalidPattern { .. }));
    }

    #[test]
    fn test_decode_bytes_latin1_fallback() {
        // 0xE9 is 'é' in WINDOWS-1252 but invalid UTF-8
        assert_eq!(decode_bytes(b"caf\xe9"), "café");
        assert_eq!(decode_bytes("café".as_bytes()), "café");
    }
}
