//! Install manifest: the small set of files a client needs before anything
//! else, addressed by plain file name

#[cfg(any(test, feature = "builders"))]
mod builder;
mod error;
mod manifest;

#[cfg(any(test, feature = "builders"))]
pub use builder::InstallBuilder;
pub use error::{InstallError, Result};
pub use manifest::{InstallEntry, InstallManifest, InstallTag, normalize_name};
