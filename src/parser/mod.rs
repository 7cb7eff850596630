//! Streaming parse machinery: line reading, header blocks, envelope
//! scanning, and the recursive MIME constructor.

pub mod envelope;
pub mod header;
pub mod lines;
pub mod mime;
