//! Encryption keys from the `TactKey` and `TactKeyLookup` tables
//!
//! Both tables are ordinary files, fetched through the same resolver that
//! later needs their keys. They are not encrypted themselves, so the
//! resolver's built-in keys are enough to read them. Rows of the lookup
//! table carry the 8-byte key name and rows of the key table with the same
//! record id carry the 16-byte key.

use cascfetch_cache::{CacheKey, DiskCache};
use cascfetch_crypto::TactKey;
use cascfetch_formats::db2::{Db2Reader, RecordTable};
use tracing::{debug, info, warn};

use crate::error::BootstrapError;
use crate::identifier::Identifier;
use crate::resolver::ContentResolver;

/// `FileDataID` of `DBFilesClient/TactKey.db2`
pub const TACT_KEY_FILE_ID: u32 = 1_302_850;

/// `FileDataID` of `DBFilesClient/TactKeyLookup.db2`
pub const TACT_KEY_LOOKUP_FILE_ID: u32 = 1_302_851;

/// Load every key the two tables agree on into the resolver's key store
///
/// The tables are kept in `cache` under `keys/<content key>` so later runs
/// skip the download. Returns the number of keys read from the tables.
pub async fn bootstrap_keys(
    resolver: &mut ContentResolver,
    cache: &DiskCache,
) -> Result<usize, BootstrapError> {
    let key_table = open_table(resolver, cache, "TactKey", TACT_KEY_FILE_ID).await?;
    let lookup_table = open_table(resolver, cache, "TactKeyLookup", TACT_KEY_LOOKUP_FILE_ID).await?;

    let mut keys = Vec::new();
    for (id, lookup_row) in lookup_table.records() {
        let Some(key_row) = key_table.get_record(id) else {
            continue;
        };
        let (Some(name), Some(key)) = (lookup_row.first(), key_row.first()) else {
            continue;
        };
        match TactKey::from_slices(&name.to_bytes(), &key.to_bytes()) {
            Ok(key) => keys.push(key),
            Err(e) => debug!("Skipping key record {}: {}", id, e),
        }
    }

    let found = keys.len();
    let added = resolver.add_keys(keys);
    info!("Loaded {} encryption keys ({} new)", found, added);
    Ok(found)
}

async fn open_table(
    resolver: &ContentResolver,
    cache: &DiskCache,
    table: &'static str,
    file_id: u32,
) -> Result<Db2Reader, BootstrapError> {
    let content_key = resolver
        .resolve_identifier(&Identifier::FileDataId(file_id), None)
        .ok_or(BootstrapError::NotInRoot(table))?;
    let cache_key = CacheKey::key_table(&content_key.to_hex())?;
    let path = cache.full_path(&cache_key);

    if !cache.exists(&cache_key).await {
        let outcome = resolver.fetch_content(&content_key, &path).await;
        if !outcome.is_success() {
            discard(cache, &cache_key).await;
            return Err(BootstrapError::Fetch {
                table,
                outcome: outcome.to_string(),
            });
        }
    }

    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(e) => {
            discard(cache, &cache_key).await;
            return Err(BootstrapError::Open {
                table,
                source: e.into(),
            });
        }
    };
    match Db2Reader::parse(data) {
        Ok(reader) => {
            debug!("{} has {} records", table, reader.len());
            Ok(reader)
        }
        Err(source) => {
            discard(cache, &cache_key).await;
            Err(BootstrapError::Open { table, source })
        }
    }
}

async fn discard(cache: &DiskCache, key: &CacheKey) {
    if let Err(e) = cache.delete(key).await {
        warn!("Failed to drop {} from cache: {}", key, e);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::{MemorySource, encoding, root};
    use cascfetch_crypto::{ContentKey, TactKeyStore};
    use cascfetch_formats::db2::{Db2Builder, FieldSpec, FieldValue};
    use pretty_assertions::assert_eq;

    fn key_table(rows: &[(u32, [u8; 16])]) -> Vec<u8> {
        rows.iter()
            .fold(Db2Builder::new(vec![FieldSpec::Bytes(16)]), |b, (id, key)| {
                b.row(*id, vec![FieldValue::Bytes(key.to_vec())])
            })
            .build()
    }

    fn lookup_table(rows: &[(u32, u64)]) -> Vec<u8> {
        rows.iter()
            .fold(Db2Builder::new(vec![FieldSpec::Bytes(8)]), |b, (id, name)| {
                b.row(*id, vec![FieldValue::Bytes(name.to_le_bytes().to_vec())])
            })
            .build()
    }

    fn resolver_serving(tables: &[(u32, &[u8])]) -> ContentResolver {
        let mut source = MemorySource::new("Remote");
        let entries: Vec<(&[u8], Vec<_>)> = tables
            .iter()
            .map(|(_, data)| (*data, vec![source.serve(data)]))
            .collect();
        ContentResolver::builder()
            .name_lookup(root(tables))
            .encoding(encoding(&entries))
            .data_source(source)
            .keys(TactKeyStore::empty())
            .build()
            .expect("resolver")
    }

    #[tokio::test]
    async fn test_correlated_rows_become_keys() {
        let keys = key_table(&[(1, [0x11; 16]), (2, [0x22; 16]), (3, [0x33; 16]), (9, [0x99; 16])]);
        let lookup = lookup_table(&[(1, 0xA1), (2, 0xA2), (3, 0xA3), (4, 0xA4)]);
        let mut resolver = resolver_serving(&[
            (TACT_KEY_FILE_ID, keys.as_slice()),
            (TACT_KEY_LOOKUP_FILE_ID, lookup.as_slice()),
        ]);
        let dir = tempfile::tempdir().expect("cache");
        let cache = DiskCache::open(dir.path()).await.expect("open");

        let loaded = bootstrap_keys(&mut resolver, &cache).await.expect("bootstrap");
        assert_eq!(loaded, 3);
        assert_eq!(resolver.keys().len(), 3);
        assert_eq!(resolver.keys().get(0xA2), Some(&[0x22; 16]));
        assert_eq!(resolver.keys().get(0xA4), None);

        let cached = CacheKey::key_table(&ContentKey::from_data(&keys).to_hex()).expect("key");
        assert!(cache.exists(&cached).await);
    }

    #[tokio::test]
    async fn test_missing_table_is_reported() {
        let keys = key_table(&[(1, [0x11; 16])]);
        let mut resolver = resolver_serving(&[(TACT_KEY_FILE_ID, keys.as_slice())]);
        let dir = tempfile::tempdir().expect("cache");
        let cache = DiskCache::open(dir.path()).await.expect("open");

        let result = bootstrap_keys(&mut resolver, &cache).await;
        assert!(matches!(result, Err(BootstrapError::NotInRoot("TactKeyLookup"))));
        assert!(resolver.keys().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_table_is_dropped_from_cache() {
        let garbage = b"not a record table".to_vec();
        let lookup = lookup_table(&[(1, 0xA1)]);
        let mut resolver = resolver_serving(&[
            (TACT_KEY_FILE_ID, garbage.as_slice()),
            (TACT_KEY_LOOKUP_FILE_ID, lookup.as_slice()),
        ]);
        let dir = tempfile::tempdir().expect("cache");
        let cache = DiskCache::open(dir.path()).await.expect("open");

        let result = bootstrap_keys(&mut resolver, &cache).await;
        assert!(matches!(result, Err(BootstrapError::Open { table: "TactKey", .. })));
        let cached = CacheKey::key_table(&ContentKey::from_data(&garbage).to_hex()).expect("key");
        assert!(!cache.exists(&cached).await);
    }

    #[tokio::test]
    async fn test_unfetchable_table_is_reported() {
        let keys = key_table(&[(1, [0x11; 16])]);
        let lookup = lookup_table(&[(1, 0xA1)]);
        let mut resolver = ContentResolver::builder()
            .name_lookup(root(&[
                (TACT_KEY_FILE_ID, keys.as_slice()),
                (TACT_KEY_LOOKUP_FILE_ID, lookup.as_slice()),
            ]))
            .encoding(encoding(&[]))
            .data_source(MemorySource::new("Remote"))
            .keys(TactKeyStore::empty())
            .build()
            .expect("resolver");
        let dir = tempfile::tempdir().expect("cache");
        let cache = DiskCache::open(dir.path()).await.expect("open");

        let result = bootstrap_keys(&mut resolver, &cache).await;
        assert!(matches!(result, Err(BootstrapError::Fetch { table: "TactKey", .. })));
    }
}
