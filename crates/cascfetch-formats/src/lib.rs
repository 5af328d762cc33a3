//! Parsers for the NGDP/CASC formats behind game file resolution
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_possible_wrap)] // Intentional for binary operations
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::doc_markdown)] // Many CASC-specific terms don't need backticks
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::redundant_closure_for_method_calls)] // Iterator chains
#![allow(clippy::return_self_not_must_use)] // Builder patterns
#![allow(clippy::use_self)]
//! Each format resolves one step of the lookup chain from a file name or
//! FileDataID down to the bytes stored on disk or on a CDN:
//!
//! - **Install**: file name to content key
//! - **Root**: FileDataID or name hash to content key, filtered by locale
//! - **Encoding**: content key to the encoding keys of its stored blobs
//! - **Archive**: CDN `.index` lookup from encoding key to archive offset
//! - **BLTE**: chunked container wrapping every stored blob
//! - **Config**: build and CDN config text files
//! - **BPSV**: pipe-separated version and CDN listings
//! - **DB2**: WDC3 record tables, used for the TACT key tables
//!
//! Parsers for the binary formats have matching builders behind the
//! `builders` feature so downstream tests can produce fixtures.

#![warn(missing_docs)]

/// CDN archive indices (`.index`)
///
/// An index lists the encoding keys stored in one archive together with
/// the size and offset of each blob. Entries are sorted and paged, with a
/// table of contents holding the last key of every page, so a lookup is a
/// binary search.
pub mod archive;
pub mod blte;
pub mod bpsv;
/// Build and CDN configuration files
pub mod config;
pub mod db2;
pub mod encoding;
/// Install manifest: file names, tags and content keys
pub mod install;
/// Root file mapping FileDataIDs and name hashes to content keys
///
/// All four layouts used by World of Warcraft are supported. Lookups pick
/// one entry per FileDataID using locale and content flags.
pub mod root;

mod util;
