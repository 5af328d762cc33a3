//! Walks the format chain end to end using builder fixtures
//!
//! Each step reads a BLTE-wrapped blob the way a client receives it and
//! feeds the key it yields into the next lookup.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use cascfetch_crypto::{ContentKey, EncodingKey, TactKeyStore};
use cascfetch_formats::archive::{ArchiveIndex, ArchiveIndexBuilder};
use cascfetch_formats::blte::{self, BlteBuilder, ChunkMode};
use cascfetch_formats::config::BuildConfig;
use cascfetch_formats::encoding::{EncodingBuilder, EncodingTable};
use cascfetch_formats::install::{InstallBuilder, InstallManifest};
use cascfetch_formats::root::{LocaleFlags, RootBuilder, RootFile, RootVersion};
use pretty_assertions::assert_eq;

const PAYLOAD: &[u8] = b"interface art bytes";

fn wrap(data: &[u8]) -> Vec<u8> {
    BlteBuilder::new()
        .chunk(&data[..data.len() / 2], ChunkMode::ZLib)
        .chunk(&data[data.len() / 2..], ChunkMode::Lz4)
        .build()
        .expect("blte")
}

#[test]
fn test_fdid_resolves_to_archive_location() {
    let keys = TactKeyStore::empty();
    let content_key = ContentKey::from_data(PAYLOAD);
    let encoding_key = EncodingKey::from_bytes([0x5A; 16]);

    let root = RootBuilder::new(RootVersion::V2)
        .block(LocaleFlags::EN_US, Default::default())
        .file(1_302_850, content_key, None)
        .build();
    let encoding = EncodingBuilder::new()
        .entry(content_key, PAYLOAD.len() as u64, vec![encoding_key])
        .build();
    let index = ArchiveIndexBuilder::new()
        .entry(encoding_key, 4096, 0x2000)
        .build();

    let root = RootFile::from_blte(&wrap(&root), &keys).expect("root");
    let entry = root
        .find_by_id(1_302_850, LocaleFlags::EN_US)
        .expect("fdid present");
    assert_eq!(entry.content_key, content_key);

    let encoding = EncodingTable::from_blte(&wrap(&encoding), &keys).expect("encoding");
    let map = encoding.content_map(&entry.content_key).expect("ckey present");
    assert_eq!(map.encoding_keys, vec![encoding_key]);

    let index = ArchiveIndex::parse(&index).expect("index");
    let located = index.find(&map.encoding_keys[0]).expect("ekey present");
    assert_eq!((located.size, located.offset), (4096, 0x2000));
}

#[test]
fn test_install_name_resolves_and_payload_verifies() {
    let keys = TactKeyStore::empty();
    let content_key = ContentKey::from_data(PAYLOAD);

    let install = InstallBuilder::new()
        .tag("Windows", 1)
        .file("Interface\\Art.blp", content_key, PAYLOAD.len() as u32, &["Windows"])
        .build();
    let install = InstallManifest::from_blte(&wrap(&install), &keys).expect("install");

    let entry = install.find("interface/art.blp").expect("name present");
    assert_eq!(install.tags_for("interface/art.blp"), vec!["Windows"]);

    let decoded = blte::decode(&wrap(PAYLOAD), &keys).expect("payload");
    assert_eq!(ContentKey::from_data(&decoded), entry.content_key);
}

#[test]
fn test_build_config_names_the_encoding_blob() {
    let text = "root = 00112233445566778899aabbccddeeff\n\
                encoding = ffeeddccbbaa99887766554433221100 0123456789abcdef0123456789abcdef\n";
    let config = BuildConfig::parse(text.as_bytes()).expect("config");
    assert_eq!(
        config.encoding_key().expect("valid"),
        Some("0123456789abcdef0123456789abcdef")
    );
    assert_eq!(
        config.root().expect("valid"),
        Some("00112233445566778899aabbccddeeff")
    );
}
