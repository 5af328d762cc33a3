//! BPSV (Blizzard Pipe-Separated Values) format support
//!
//! BPSV is the text table format of the version and CDN endpoints:
//! a `Name!TYPE:size` header line, an optional `## seqn = N` line and
//! pipe-separated data rows.
//!
//! # Example
//!
//! ```
//! use cascfetch_formats::bpsv::parse;
//!
//! let content = "Region!STRING:0|BuildId!DEC:4\n## seqn = 12345\nus|1234\neu|5678";
//! let document = parse(content).expect("valid document");
//! assert_eq!(document.sequence_number(), Some(12345));
//! assert_eq!(document.get(1, "BuildId"), Some("5678"));
//! ```

mod document;
mod types;

pub use document::{BpsvDocument, parse};
pub use types::{BpsvError, BpsvField, BpsvType};
