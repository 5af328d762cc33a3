//! Root file: `FileDataID` and path hash to content key
//!
//! Root is organised in blocks. Every block shares one set of locale and
//! content flags, so the same `FileDataID` may appear several times with
//! different content keys for different locales. Lookups pick one entry
//! per request; see [`RootFile::find_by_id`] for the precedence rule.

#[cfg(any(test, feature = "builders"))]
mod builder;
mod error;
mod file;
mod flags;
mod header;

#[cfg(any(test, feature = "builders"))]
pub use builder::RootBuilder;
pub use error::{Result, RootError};
pub use file::{RootEntry, RootFile};
pub use flags::{ContentFlags, LocaleFlags};
pub use header::{RootHeader, RootMagic, RootVersion};
