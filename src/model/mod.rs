//! Parsed message data model: headers, content types, and the entity tree.

pub mod content_type;
pub mod entity;
pub mod header;
