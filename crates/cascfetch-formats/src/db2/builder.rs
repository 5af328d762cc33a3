//! WDC3 builder for fixtures

use binrw::BinWrite;
use binrw::io::Cursor;

use crate::db2::header::{FieldStorageInfo, SectionHeader, Wdc3Header};
use crate::db2::value::FieldValue;

/// Storage of one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSpec {
    /// Unpacked bytes stored inline
    Bytes(usize),
    /// Unsigned bitpacked integer of the given width
    Bitpacked(u16),
    /// Signed bitpacked integer of the given width
    Signed(u16),
    /// Value held in the common block, with this default
    Common(u32),
    /// Index into a pallet of 32-bit values
    Pallet,
    /// Index into a pallet of arrays with this many elements
    PalletArray(u32),
}

#[derive(Debug, Clone, Default)]
struct Section {
    tact_key_hash: u64,
    rows: Vec<(u32, Vec<FieldValue>)>,
    copies: Vec<(u32, u32)>,
}

/// Builds a WDC3 table with fixed-size records
#[derive(Debug, Clone)]
pub struct Db2Builder {
    fields: Vec<FieldSpec>,
    sections: Vec<Section>,
    inline_ids: bool,
}

fn write_bits(record: &mut [u8], offset: usize, size: usize, value: u64) {
    for i in 0..size {
        if (value >> i) & 1 == 1 {
            let bit = offset + i;
            record[bit / 8] |= 1 << (bit % 8);
        }
    }
}

fn index_bits(count: usize) -> u16 {
    if count <= 1 {
        1
    } else {
        (usize::BITS - (count - 1).leading_zeros()) as u16
    }
}

fn write<T>(out: &mut Vec<u8>, value: &T)
where
    T: for<'a> BinWrite<Args<'a> = ()>,
{
    let mut cursor = Cursor::new(Vec::new());
    if value.write_le(&mut cursor).is_ok() {
        out.extend_from_slice(&cursor.into_inner());
    }
}

impl Db2Builder {
    /// Builder for the given columns with one plain section
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self {
            fields,
            sections: vec![Section::default()],
            inline_ids: false,
        }
    }

    /// Take ids from column 0 instead of an id list
    #[must_use]
    pub fn inline_ids(mut self) -> Self {
        self.inline_ids = true;
        self
    }

    /// Start a new section; a non-zero hash marks it encrypted
    #[must_use]
    pub fn section(mut self, tact_key_hash: u64) -> Self {
        self.sections.push(Section {
            tact_key_hash,
            ..Section::default()
        });
        self
    }

    /// Add a record to the current section
    #[must_use]
    pub fn row(mut self, id: u32, values: Vec<FieldValue>) -> Self {
        if let Some(section) = self.sections.last_mut() {
            section.rows.push((id, values));
        }
        self
    }

    /// Add a copy-table entry to the current section
    #[must_use]
    pub fn copy(mut self, new_id: u32, source_id: u32) -> Self {
        if let Some(section) = self.sections.last_mut() {
            section.copies.push((new_id, source_id));
        }
        self
    }

    fn all_rows(&self) -> impl Iterator<Item = &(u32, Vec<FieldValue>)> {
        self.sections.iter().flat_map(|s| s.rows.iter())
    }

    /// Serialize
    pub fn build(self) -> Vec<u8> {
        let mut pallets: Vec<Vec<Vec<u32>>> = vec![Vec::new(); self.fields.len()];
        let mut common: Vec<Vec<(u32, u32)>> = vec![Vec::new(); self.fields.len()];
        for (id, values) in self.all_rows() {
            for (column, spec) in self.fields.iter().enumerate() {
                let entry = match (spec, values.get(column)) {
                    (FieldSpec::Pallet, Some(FieldValue::Int(v))) => vec![*v as u32],
                    (FieldSpec::PalletArray(_), Some(FieldValue::Array(v))) => v.clone(),
                    (FieldSpec::Common(default), Some(FieldValue::Int(v))) => {
                        if *v as u32 != *default {
                            common[column].push((*id, *v as u32));
                        }
                        continue;
                    }
                    _ => continue,
                };
                if !pallets[column].contains(&entry) {
                    pallets[column].push(entry);
                }
            }
        }

        let mut infos = Vec::with_capacity(self.fields.len());
        let mut bit = 0usize;
        for (column, spec) in self.fields.iter().enumerate() {
            let (storage_type, size, extra, val1, val3) = match spec {
                FieldSpec::Bytes(n) => {
                    bit = bit.next_multiple_of(8);
                    (FieldStorageInfo::NONE, n * 8, 0, 0, 0)
                }
                FieldSpec::Bitpacked(b) => (FieldStorageInfo::BITPACKED, usize::from(*b), 0, 0, 0),
                FieldSpec::Signed(b) => {
                    (FieldStorageInfo::BITPACKED_SIGNED, usize::from(*b), 0, 0, 0)
                }
                FieldSpec::Common(default) => {
                    (FieldStorageInfo::COMMON, 0, common[column].len() * 8, *default, 0)
                }
                FieldSpec::Pallet => (
                    FieldStorageInfo::PALLET,
                    usize::from(index_bits(pallets[column].len())),
                    pallets[column].len() * 4,
                    0,
                    0,
                ),
                FieldSpec::PalletArray(count) => (
                    FieldStorageInfo::PALLET_ARRAY,
                    usize::from(index_bits(pallets[column].len())),
                    pallets[column].len() * *count as usize * 4,
                    0,
                    *count,
                ),
            };
            infos.push(FieldStorageInfo {
                field_offset_bits: bit as u16,
                field_size_bits: size as u16,
                additional_data_size: extra as u32,
                storage_type,
                val1,
                val2: size as u32,
                val3,
            });
            bit += size;
        }
        let record_size = bit.div_ceil(8).max(1);

        let encode = |values: &[FieldValue]| -> Vec<u8> {
            let mut record = vec![0u8; record_size];
            for (column, info) in infos.iter().enumerate() {
                let offset = usize::from(info.field_offset_bits);
                let size = usize::from(info.field_size_bits);
                match (&self.fields[column], values.get(column)) {
                    (FieldSpec::Bytes(n), Some(FieldValue::Bytes(bytes))) => {
                        let start = offset / 8;
                        let len = (*n).min(bytes.len());
                        record[start..start + len].copy_from_slice(&bytes[..len]);
                    }
                    (FieldSpec::Bitpacked(_) | FieldSpec::Signed(_), Some(FieldValue::Int(v))) => {
                        write_bits(&mut record, offset, size, *v as u64);
                    }
                    (FieldSpec::Pallet, Some(FieldValue::Int(v))) => {
                        let index = pallets[column].iter().position(|p| p == &vec![*v as u32]);
                        write_bits(&mut record, offset, size, index.unwrap_or(0) as u64);
                    }
                    (FieldSpec::PalletArray(_), Some(FieldValue::Array(v))) => {
                        let index = pallets[column].iter().position(|p| p == v);
                        write_bits(&mut record, offset, size, index.unwrap_or(0) as u64);
                    }
                    _ => {}
                }
            }
            record
        };

        let pallet_data: Vec<u8> = pallets
            .iter()
            .flatten()
            .flatten()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let common_data: Vec<u8> = common
            .iter()
            .flatten()
            .flat_map(|(id, v)| [id.to_le_bytes(), v.to_le_bytes()])
            .flatten()
            .collect();

        let field_count = self.fields.len();
        let mut file_offset = Wdc3Header::SIZE
            + self.sections.len() * SectionHeader::SIZE
            + field_count * 4
            + field_count * FieldStorageInfo::SIZE
            + pallet_data.len()
            + common_data.len();

        let mut section_headers = Vec::new();
        let mut section_data = Vec::new();
        for section in &self.sections {
            let mut bytes = Vec::new();
            for (_, values) in &section.rows {
                bytes.extend_from_slice(&encode(values));
            }
            let id_list_size = if self.inline_ids {
                0
            } else {
                for (id, _) in &section.rows {
                    bytes.extend_from_slice(&id.to_le_bytes());
                }
                section.rows.len() * 4
            };
            for (new_id, old_id) in &section.copies {
                bytes.extend_from_slice(&new_id.to_le_bytes());
                bytes.extend_from_slice(&old_id.to_le_bytes());
            }
            section_headers.push(SectionHeader {
                tact_key_hash: section.tact_key_hash,
                file_offset: file_offset as u32,
                record_count: section.rows.len() as u32,
                string_table_size: 0,
                offset_records_end: 0,
                id_list_size: id_list_size as u32,
                relationship_data_size: 0,
                offset_map_id_count: 0,
                copy_table_count: section.copies.len() as u32,
            });
            file_offset += bytes.len();
            section_data.push(bytes);
        }

        let header = Wdc3Header {
            magic: Wdc3Header::MAGIC,
            record_count: self.all_rows().count() as u32,
            field_count: field_count as u32,
            record_size: record_size as u32,
            string_table_size: 0,
            table_hash: 0,
            layout_hash: 0,
            min_id: self.all_rows().map(|(id, _)| *id).min().unwrap_or(0),
            max_id: self.all_rows().map(|(id, _)| *id).max().unwrap_or(0),
            locale: 0,
            flags: if self.inline_ids { 0 } else { 0x04 },
            id_index: 0,
            total_field_count: field_count as u32,
            bitpacked_data_offset: 0,
            lookup_column_count: 0,
            field_storage_info_size: (field_count * FieldStorageInfo::SIZE) as u32,
            common_data_size: common_data.len() as u32,
            pallet_data_size: pallet_data.len() as u32,
            section_count: self.sections.len() as u32,
        };

        let mut out = Vec::new();
        write(&mut out, &header);
        for section in &section_headers {
            write(&mut out, section);
        }
        for info in &infos {
            let element_bits = match info.storage_type {
                FieldStorageInfo::NONE => 8,
                _ => i32::from(info.field_size_bits),
            };
            out.extend_from_slice(&((32 - element_bits) as i16).to_le_bytes());
            out.extend_from_slice(&(info.field_offset_bits / 8).to_le_bytes());
        }
        for info in &infos {
            write(&mut out, info);
        }
        out.extend_from_slice(&pallet_data);
        out.extend_from_slice(&common_data);
        for bytes in section_data {
            out.extend_from_slice(&bytes);
        }
        out
    }
}
