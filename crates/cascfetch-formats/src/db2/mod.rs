//! WDC3 record tables
//!
//! Only the subset needed to read small lookup tables is implemented:
//! fixed-size records, id lists or inline ids, copy tables and every
//! field storage type. Encrypted sections are skipped.

#[cfg(any(test, feature = "builders"))]
mod builder;
mod error;
mod header;
mod reader;
mod value;

#[cfg(any(test, feature = "builders"))]
pub use builder::{Db2Builder, FieldSpec};
pub use error::{Db2Error, Result};
pub use header::{FieldStorageInfo, SectionHeader, Wdc3Header};
pub use reader::{Db2Reader, RecordTable};
pub use value::FieldValue;
