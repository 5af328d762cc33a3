//! Identifier to content key lookups
//!
//! Two lookups exist. [`InstallLookup`] covers the handful of files a client
//! needs before anything else and is matched by plain name. [`RootLookup`]
//! covers everything else by `FileDataID` or path hash and honours locales.

use cascfetch_crypto::ContentKey;
use cascfetch_formats::install::InstallManifest;
use cascfetch_formats::root::{LocaleFlags, RootFile};

use crate::identifier::Identifier;

/// Maps an identifier to a content key
pub trait NameLookup: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Content key for `identifier`; `locale` of `None` means the lookup's default
    fn content_key(&self, identifier: &Identifier, locale: Option<LocaleFlags>)
    -> Option<ContentKey>;
}

/// Locale-aware lookup over the root file
#[derive(Debug, Clone)]
pub struct RootLookup {
    root: RootFile,
    default_locale: LocaleFlags,
}

impl RootLookup {
    /// Wrap a parsed root with the locale used when callers pass none
    pub fn new(root: RootFile, default_locale: LocaleFlags) -> Self {
        Self {
            root,
            default_locale,
        }
    }

    /// Locale used when callers pass none
    pub fn default_locale(&self) -> LocaleFlags {
        self.default_locale
    }

    /// Parsed root
    pub fn root(&self) -> &RootFile {
        &self.root
    }
}

impl NameLookup for RootLookup {
    fn name(&self) -> &'static str {
        "Root"
    }

    fn content_key(
        &self,
        identifier: &Identifier,
        locale: Option<LocaleFlags>,
    ) -> Option<ContentKey> {
        let locale = locale.unwrap_or(self.default_locale);
        let entry = match identifier {
            Identifier::FileDataId(id) => self.root.find_by_id(*id, locale),
            Identifier::Name(name) => self.root.find_by_path(name, locale),
        }?;
        Some(entry.content_key)
    }
}

/// Name lookup over the install manifest; locale is ignored
#[derive(Debug, Clone)]
pub struct InstallLookup {
    manifest: InstallManifest,
}

impl InstallLookup {
    /// Wrap a parsed install manifest
    pub fn new(manifest: InstallManifest) -> Self {
        Self { manifest }
    }

    /// Parsed manifest
    pub fn manifest(&self) -> &InstallManifest {
        &self.manifest
    }
}

impl NameLookup for InstallLookup {
    fn name(&self) -> &'static str {
        "Install"
    }

    fn content_key(&self, identifier: &Identifier, _locale: Option<LocaleFlags>) -> Option<ContentKey> {
        let name = identifier.to_string();
        let entry = self.manifest.find(&name)?;
        tracing::trace!(
            "Install match {} tags={:?}",
            entry.path,
            self.manifest.tags_for(&name)
        );
        Some(entry.content_key)
    }
}
