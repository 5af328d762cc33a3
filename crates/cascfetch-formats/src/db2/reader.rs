//! WDC3 record table reader

use std::collections::HashMap;
use std::path::Path;

use binrw::BinRead;
use binrw::io::Cursor;
use tracing::debug;

use crate::db2::error::{Db2Error, Result};
use crate::db2::header::{FieldStorageInfo, SectionHeader, Wdc3Header};
use crate::db2::value::FieldValue;

/// Read access to a table of records keyed by id
pub trait RecordTable {
    /// Fields of the record with this id
    fn get_record(&self, id: u32) -> Option<Vec<FieldValue>>;

    /// All records in file order, decoded as the iterator advances
    fn records(&self) -> Box<dyn Iterator<Item = (u32, Vec<FieldValue>)> + '_>;
}

#[derive(Debug, Clone)]
struct Field {
    info: FieldStorageInfo,
    pallet: Vec<u32>,
    common: HashMap<u32, u32>,
}

#[derive(Debug, Clone, Copy)]
struct RecordRef {
    id: u32,
    offset: usize,
    source_id: u32,
}

fn take<'a>(data: &'a [u8], pos: usize, len: usize, section: &'static str) -> Result<&'a [u8]> {
    let available = data.len().saturating_sub(pos);
    if available < len {
        return Err(Db2Error::Truncated {
            section,
            needed: len,
            available,
        });
    }
    Ok(&data[pos..pos + len])
}

fn u32s(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Read `size` bits starting at bit `offset`, least significant bit first
fn read_bits(record: &[u8], offset: usize, size: usize) -> u64 {
    (0..size.min(64)).fold(0u64, |acc, i| {
        let bit = offset + i;
        let set = record
            .get(bit / 8)
            .is_some_and(|byte| (byte >> (bit % 8)) & 1 == 1);
        if set { acc | (1 << i) } else { acc }
    })
}

impl Field {
    fn decode(&self, record: &[u8], id: u32) -> FieldValue {
        let info = &self.info;
        let offset = usize::from(info.field_offset_bits);
        let size = usize::from(info.field_size_bits);
        match info.storage_type {
            FieldStorageInfo::BITPACKED => FieldValue::Int(read_bits(record, offset, size) as i64),
            FieldStorageInfo::BITPACKED_SIGNED => {
                let raw = read_bits(record, offset, size);
                let shift = 64 - size.clamp(1, 64) as u32;
                FieldValue::Int(((raw << shift) as i64) >> shift)
            }
            FieldStorageInfo::COMMON => {
                FieldValue::Int(i64::from(self.common.get(&id).copied().unwrap_or(info.val1)))
            }
            FieldStorageInfo::PALLET => {
                let index = read_bits(record, offset, size) as usize;
                FieldValue::Int(i64::from(self.pallet.get(index).copied().unwrap_or(0)))
            }
            FieldStorageInfo::PALLET_ARRAY => {
                let count = info.val3 as usize;
                let index = read_bits(record, offset, size) as usize;
                let span = index
                    .checked_mul(count)
                    .and_then(|start| start.checked_add(count).map(|end| start..end));
                FieldValue::Array(
                    span.and_then(|span| self.pallet.get(span))
                        .map(<[u32]>::to_vec)
                        .unwrap_or_default(),
                )
            }
            _ => {
                let start = offset / 8;
                FieldValue::Bytes(
                    record
                        .get(start..start + size / 8)
                        .map(<[u8]>::to_vec)
                        .unwrap_or_default(),
                )
            }
        }
    }
}

/// WDC3 table with fixed-size records
#[derive(Debug, Clone)]
pub struct Db2Reader {
    data: Vec<u8>,
    header: Wdc3Header,
    fields: Vec<Field>,
    order: Vec<RecordRef>,
    index: HashMap<u32, usize>,
}

impl Db2Reader {
    /// Read and parse a table from disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::parse(std::fs::read(path)?)
    }

    /// Parse a table; record fields are decoded on access
    pub fn parse(data: Vec<u8>) -> Result<Self> {
        take(&data, 0, Wdc3Header::SIZE, "header")?;
        let header = Wdc3Header::read(&mut Cursor::new(&data))?;
        if header.magic != Wdc3Header::MAGIC {
            return Err(Db2Error::InvalidMagic(header.magic));
        }
        if header.flags & Wdc3Header::FLAG_OFFSET_MAP != 0 {
            return Err(Db2Error::Unsupported("variable-length records".to_string()));
        }

        let mut pos = Wdc3Header::SIZE;
        let section_bytes = take(
            &data,
            pos,
            header.section_count as usize * SectionHeader::SIZE,
            "section headers",
        )?;
        let mut cursor = Cursor::new(section_bytes);
        let sections = (0..header.section_count)
            .map(|_| SectionHeader::read(&mut cursor))
            .collect::<binrw::BinResult<Vec<_>>>()?;
        pos += section_bytes.len();

        pos += take(&data, pos, header.field_count as usize * 4, "field structure")?.len();

        let info_bytes = take(
            &data,
            pos,
            header.field_storage_info_size as usize,
            "field storage",
        )?;
        let mut cursor = Cursor::new(info_bytes);
        let infos = (0..info_bytes.len() / FieldStorageInfo::SIZE)
            .map(|_| FieldStorageInfo::read(&mut cursor))
            .collect::<binrw::BinResult<Vec<_>>>()?;
        pos += info_bytes.len();

        let pallet_block = take(&data, pos, header.pallet_data_size as usize, "pallet data")?;
        pos += pallet_block.len();
        let common_block = take(&data, pos, header.common_data_size as usize, "common data")?;

        let mut pallet_pos = 0;
        let mut common_pos = 0;
        let mut fields = Vec::with_capacity(infos.len());
        for info in infos {
            let extra = info.additional_data_size as usize;
            let mut field = Field {
                info,
                pallet: Vec::new(),
                common: HashMap::new(),
            };
            match field.info.storage_type {
                FieldStorageInfo::NONE
                | FieldStorageInfo::BITPACKED
                | FieldStorageInfo::BITPACKED_SIGNED => {}
                FieldStorageInfo::PALLET | FieldStorageInfo::PALLET_ARRAY => {
                    field.pallet = u32s(take(pallet_block, pallet_pos, extra, "pallet data")?);
                    pallet_pos += extra;
                }
                FieldStorageInfo::COMMON => {
                    let pairs = u32s(take(common_block, common_pos, extra, "common data")?);
                    field.common = pairs.chunks_exact(2).map(|p| (p[0], p[1])).collect();
                    common_pos += extra;
                }
                other => return Err(Db2Error::UnknownStorage(other)),
            }
            fields.push(field);
        }

        let mut reader = Self {
            data,
            header,
            fields,
            order: Vec::new(),
            index: HashMap::new(),
        };
        for section in &sections {
            reader.load_section(section)?;
        }

        debug!(
            records = reader.order.len(),
            fields = reader.fields.len(),
            sections = sections.len(),
            "Parsed WDC3 table"
        );
        Ok(reader)
    }

    fn load_section(&mut self, section: &SectionHeader) -> Result<()> {
        if section.tact_key_hash != 0 {
            debug!(
                key = format_args!("{:016X}", section.tact_key_hash),
                records = section.record_count,
                "Skipping encrypted WDC3 section"
            );
            return Ok(());
        }

        let record_size = self.header.record_size as usize;
        let count = section.record_count as usize;
        let records_start = section.file_offset as usize;
        let mut pos = records_start;
        pos += take(&self.data, pos, count * record_size, "records")?.len();
        pos += take(&self.data, pos, section.string_table_size as usize, "string table")?.len();
        let ids = u32s(take(&self.data, pos, section.id_list_size as usize, "id list")?);
        pos += section.id_list_size as usize;
        let copies = u32s(take(
            &self.data,
            pos,
            section.copy_table_count as usize * 8,
            "copy table",
        )?);

        let id_field = usize::from(self.header.id_index);
        for i in 0..count {
            let offset = records_start + i * record_size;
            let id = match ids.get(i) {
                Some(&id) => id,
                None => self
                    .fields
                    .get(id_field)
                    .and_then(|field| {
                        field
                            .decode(&self.data[offset..offset + record_size], 0)
                            .as_u64()
                    })
                    .ok_or_else(|| Db2Error::Unsupported("record without id".to_string()))?
                    as u32,
            };
            self.push(RecordRef {
                id,
                offset,
                source_id: id,
            });
        }

        for pair in copies.chunks_exact(2) {
            let (new_id, old_id) = (pair[0], pair[1]);
            if let Some(&source) = self.index.get(&old_id).map(|&i| &self.order[i]) {
                self.push(RecordRef {
                    id: new_id,
                    offset: source.offset,
                    source_id: source.source_id,
                });
            }
        }
        Ok(())
    }

    fn push(&mut self, record: RecordRef) {
        self.index.insert(record.id, self.order.len());
        self.order.push(record);
    }

    fn decode(&self, record: RecordRef) -> Vec<FieldValue> {
        let size = self.header.record_size as usize;
        let bytes = &self.data[record.offset..record.offset + size];
        self.fields
            .iter()
            .map(|field| field.decode(bytes, record.source_id))
            .collect()
    }

    /// Number of readable records, copies included
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no records are readable
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Table hash from the header
    pub fn table_hash(&self) -> u32 {
        self.header.table_hash
    }
}

impl RecordTable for Db2Reader {
    fn get_record(&self, id: u32) -> Option<Vec<FieldValue>> {
        let &position = self.index.get(&id)?;
        Some(self.decode(self.order[position]))
    }

    fn records(&self) -> Box<dyn Iterator<Item = (u32, Vec<FieldValue>)> + '_> {
        Box::new(self.order.iter().map(|&r| (r.id, self.decode(r))))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db2::{Db2Builder, FieldSpec};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_id_list_and_bytes_fields() {
        let data = Db2Builder::new(vec![FieldSpec::Bytes(8)])
            .row(10, vec![FieldValue::Bytes(vec![1, 2, 3, 4, 5, 6, 7, 8])])
            .row(42, vec![FieldValue::Bytes(vec![9; 8])])
            .build();
        let table = Db2Reader::parse(data).expect("parse");
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get_record(42).expect("42"),
            vec![FieldValue::Bytes(vec![9; 8])]
        );
        assert!(table.get_record(11).is_none());
        let ids: Vec<u32> = table.records().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![10, 42]);
    }

    #[test]
    fn test_packed_storage_types() {
        let fields = vec![
            FieldSpec::Bitpacked(12),
            FieldSpec::Signed(7),
            FieldSpec::Common(5),
            FieldSpec::Pallet,
            FieldSpec::PalletArray(3),
            FieldSpec::Bytes(2),
        ];
        let row = |a: i64, b: i64, c: i64, d: i64, e: Vec<u32>| {
            vec![
                FieldValue::Int(a),
                FieldValue::Int(b),
                FieldValue::Int(c),
                FieldValue::Int(d),
                FieldValue::Array(e),
                FieldValue::Bytes(vec![0xAB, 0xCD]),
            ]
        };
        let data = Db2Builder::new(fields)
            .row(1, row(4000, -3, 5, 70_000, vec![1, 2, 3]))
            .row(2, row(1, 63, 9, 12, vec![4, 5, 6]))
            .row(3, row(0, -64, 5, 70_000, vec![1, 2, 3]))
            .build();
        let table = Db2Reader::parse(data).expect("parse");

        assert_eq!(table.get_record(1).expect("1"), row(4000, -3, 5, 70_000, vec![1, 2, 3]));
        assert_eq!(table.get_record(2).expect("2"), row(1, 63, 9, 12, vec![4, 5, 6]));
        assert_eq!(table.get_record(3).expect("3"), row(0, -64, 5, 70_000, vec![1, 2, 3]));
    }

    #[test]
    fn test_inline_ids_and_copy_table() {
        let data = Db2Builder::new(vec![FieldSpec::Bitpacked(16), FieldSpec::Bytes(4)])
            .inline_ids()
            .row(300, vec![FieldValue::Int(300), FieldValue::Bytes(vec![1, 1, 1, 1])])
            .row(301, vec![FieldValue::Int(301), FieldValue::Bytes(vec![2, 2, 2, 2])])
            .copy(500, 301)
            .build();
        let table = Db2Reader::parse(data).expect("parse");
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.get_record(500).expect("copy")[1],
            FieldValue::Bytes(vec![2, 2, 2, 2])
        );
        assert_eq!(table.get_record(300).expect("300")[0], FieldValue::Int(300));
    }

    #[test]
    fn test_encrypted_section_is_skipped() {
        let data = Db2Builder::new(vec![FieldSpec::Bytes(4)])
            .row(1, vec![FieldValue::Bytes(vec![1; 4])])
            .section(0xFA50_5078_126A_CB3E)
            .row(2, vec![FieldValue::Bytes(vec![0; 4])])
            .build();
        let table = Db2Reader::parse(data).expect("parse");
        assert_eq!(table.len(), 1);
        assert!(table.get_record(2).is_none());
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            Db2Reader::parse(vec![0; 10]),
            Err(Db2Error::Truncated { section: "header", .. })
        ));
        let mut data = Db2Builder::new(vec![FieldSpec::Bytes(4)])
            .row(1, vec![FieldValue::Bytes(vec![1; 4])])
            .build();
        data[..4].copy_from_slice(b"WDC2");
        assert!(matches!(Db2Reader::parse(data), Err(Db2Error::InvalidMagic(_))));
    }

    #[test]
    fn test_open_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("TactKey.db2");
        let data = Db2Builder::new(vec![FieldSpec::Bytes(8)])
            .row(7, vec![FieldValue::Bytes(vec![7; 8])])
            .build();
        std::fs::write(&path, data).expect("write");

        let table = Db2Reader::open(&path).expect("open");
        assert_eq!(table.get_record(7).expect("7")[0].as_u64(), Some(0x0707_0707_0707_0707));
        assert!(matches!(
            Db2Reader::open(dir.path().join("missing.db2")),
            Err(Db2Error::Io(_))
        ));
    }

    #[test]
    fn test_pallet_array_index_out_of_range_is_empty() {
        let field = Field {
            info: FieldStorageInfo {
                field_offset_bits: 0,
                field_size_bits: 64,
                additional_data_size: 12,
                storage_type: FieldStorageInfo::PALLET_ARRAY,
                val1: 0,
                val2: 0,
                val3: u32::MAX,
            },
            pallet: vec![1, 2, 3],
            common: HashMap::new(),
        };
        assert_eq!(field.decode(&[0xFF; 8], 1), FieldValue::Array(Vec::new()));
        assert_eq!(field.decode(&[0; 8], 1), FieldValue::Array(Vec::new()));
    }

    #[test]
    fn test_read_bits() {
        assert_eq!(read_bits(&[0b1010_0000, 0b0000_0011], 5, 5), 0b11101);
        assert_eq!(read_bits(&[0xFF], 4, 8), 0x0F);
    }
}
