//! WDC3 fixed-size structures

use binrw::{BinRead, BinWrite};

/// File header (72 bytes)
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
#[allow(missing_docs)]
pub struct Wdc3Header {
    pub magic: [u8; 4],
    pub record_count: u32,
    pub field_count: u32,
    pub record_size: u32,
    pub string_table_size: u32,
    pub table_hash: u32,
    pub layout_hash: u32,
    pub min_id: u32,
    pub max_id: u32,
    pub locale: u32,
    pub flags: u16,
    pub id_index: u16,
    pub total_field_count: u32,
    pub bitpacked_data_offset: u32,
    pub lookup_column_count: u32,
    pub field_storage_info_size: u32,
    pub common_data_size: u32,
    pub pallet_data_size: u32,
    pub section_count: u32,
}

#[allow(missing_docs)]
impl Wdc3Header {
    pub const SIZE: usize = 72;
    pub const MAGIC: [u8; 4] = *b"WDC3";

    /// Records are variable-length and located through an offset map
    pub const FLAG_OFFSET_MAP: u16 = 0x01;
}

/// Section header (40 bytes)
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
#[allow(missing_docs)]
pub struct SectionHeader {
    /// Non-zero when the section is encrypted with a TACT key
    pub tact_key_hash: u64,
    pub file_offset: u32,
    pub record_count: u32,
    pub string_table_size: u32,
    pub offset_records_end: u32,
    pub id_list_size: u32,
    pub relationship_data_size: u32,
    pub offset_map_id_count: u32,
    pub copy_table_count: u32,
}

#[allow(missing_docs)]
impl SectionHeader {
    pub const SIZE: usize = 40;
}

/// Per-field storage description (24 bytes)
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
#[allow(missing_docs)]
pub struct FieldStorageInfo {
    pub field_offset_bits: u16,
    pub field_size_bits: u16,
    pub additional_data_size: u32,
    pub storage_type: u32,
    pub val1: u32,
    pub val2: u32,
    pub val3: u32,
}

#[allow(missing_docs)]
impl FieldStorageInfo {
    pub const SIZE: usize = 24;

    pub const NONE: u32 = 0;
    pub const BITPACKED: u32 = 1;
    pub const COMMON: u32 = 2;
    pub const PALLET: u32 = 3;
    pub const PALLET_ARRAY: u32 = 4;
    pub const BITPACKED_SIGNED: u32 = 5;
}
