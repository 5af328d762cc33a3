//! CDN archive indexes: encoding key to `(archive, offset, size)`

#[cfg(any(test, feature = "builders"))]
mod builder;
mod error;
mod index;

#[cfg(any(test, feature = "builders"))]
pub use builder::ArchiveIndexBuilder;
pub use error::{ArchiveError, ArchiveResult};
pub use index::{ArchiveIndex, FOOTER_SIZE, IndexEntry, IndexFooter};
