//! `mimestream` — a streaming RFC 822/2045 MIME parser.
//!
//! Builds a navigable message tree (ordered headers, typed leaf parts,
//! recursively nested multiparts, embedded sub-messages) from any
//! forward-readable byte stream. Bodies are never decoded or buffered:
//! each leaf part records the `[start, end)` byte range of its undecoded
//! content so callers can fetch exactly the bytes they need later.

pub mod error;
pub mod model;
pub mod parser;
pub mod report;
pub mod stream;

pub use error::{ParseError, Result};
pub use model::content_type::ContentType;
pub use model::entity::{ByteRange, Entity, Envelope, Message, Multipart, Part};
pub use model::header::{HeaderEntry, HeaderList};
pub use parser::mime::Parser;
pub use report::{CollectReport, Condition, ConditionKind, LogReport, Report};
pub use stream::Stream;
