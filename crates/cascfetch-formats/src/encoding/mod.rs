//! Encoding file: content key to encoding key mapping
//!
//! The encoding file is the only route from a content key (what a file
//! *is*) to the encoding keys that name its stored BLTE blobs. It is
//! loaded once, validated page by page, and then queried by exact match.

#[cfg(any(test, feature = "builders"))]
mod builder;
mod error;
mod header;
mod table;

#[cfg(any(test, feature = "builders"))]
pub use builder::EncodingBuilder;
pub use error::EncodingError;
pub use header::EncodingHeader;
pub use table::{ContentMap, EncodedInfo, EncodingTable};
