use crate::bpsv::types::{BpsvError, BpsvField, BpsvType};

/// Parsed BPSV document; cells are kept as text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BpsvDocument {
    fields: Vec<BpsvField>,
    rows: Vec<Vec<String>>,
    sequence_number: Option<u32>,
}

impl BpsvDocument {
    /// Field definitions from the header
    pub fn fields(&self) -> &[BpsvField] {
        &self.fields
    }

    /// Column index of a field, matched case-insensitively
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Number of data rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell of `row` in the named column; empty cells are `None`
    pub fn get(&self, row: usize, field: &str) -> Option<&str> {
        let column = self.field_index(field)?;
        self.rows
            .get(row)?
            .get(column)
            .map(String::as_str)
            .filter(|cell| !cell.is_empty())
    }

    /// Index of the first row whose `field` equals `value`, case-insensitively
    pub fn find_row(&self, field: &str, value: &str) -> Option<usize> {
        let column = self.field_index(field)?;
        self.rows
            .iter()
            .position(|row| row.get(column).is_some_and(|cell| cell.eq_ignore_ascii_case(value)))
    }

    /// `## seqn = N` value, if present
    pub fn sequence_number(&self) -> Option<u32> {
        self.sequence_number
    }
}

/// Parse a BPSV document
pub fn parse(content: &str) -> Result<BpsvDocument, BpsvError> {
    let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty());
    let header = lines.next().ok_or(BpsvError::EmptyDocument)?;
    let fields = header
        .split('|')
        .map(BpsvField::parse)
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows = Vec::new();
    let mut sequence_number = None;
    for line in lines {
        if let Some(rest) = line.strip_prefix("## seqn") {
            let value = rest.trim_start().trim_start_matches('=').trim();
            sequence_number = Some(
                value
                    .parse()
                    .map_err(|_| BpsvError::InvalidSequence(line.to_string()))?,
            );
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let cells: Vec<String> = line.split('|').map(String::from).collect();
        if cells.len() != fields.len() {
            return Err(BpsvError::FieldCountMismatch {
                row: rows.len(),
                expected: fields.len(),
                actual: cells.len(),
            });
        }
        for (field, cell) in fields.iter().zip(&cells) {
            if let BpsvType::Hex(bytes) = field.field_type {
                let valid = cell.is_empty()
                    || (cell.chars().all(|c| c.is_ascii_hexdigit())
                        && (bytes == 0 || cell.len() == bytes * 2));
                if !valid {
                    return Err(BpsvError::InvalidHex {
                        field: field.name.clone(),
                        value: cell.clone(),
                    });
                }
            }
        }
        rows.push(cells);
    }

    Ok(BpsvDocument {
        fields,
        rows,
        sequence_number,
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const VERSIONS: &str = "Region!STRING:0|BuildConfig!HEX:16|CDNConfig!HEX:16|KeyRing!HEX:16|BuildId!DEC:4|VersionsName!String:0|ProductConfig!HEX:16\n\
        ## seqn = 2241282\n\
        us|0123456789abcdef0123456789abcdef|fedcba9876543210fedcba9876543210||57212|11.0.5.57212|00000000000000000000000000000001\n\
        eu|0123456789abcdef0123456789abcdef|fedcba9876543210fedcba9876543210||57212|11.0.5.57212|00000000000000000000000000000001\n";

    #[test]
    fn test_parse_versions() {
        let doc = parse(VERSIONS).expect("parse");
        assert_eq!(doc.sequence_number(), Some(2_241_282));
        assert_eq!(doc.row_count(), 2);
        assert_eq!(doc.fields()[1].field_type, BpsvType::Hex(16));
        let eu = doc.find_row("region", "EU").expect("eu row");
        assert_eq!(doc.get(eu, "VersionsName"), Some("11.0.5.57212"));
        assert_eq!(doc.get(eu, "KeyRing"), None);
        assert_eq!(doc.find_row("Region", "kr"), None);
    }

    #[test]
    fn test_rejects_malformed_rows() {
        assert!(matches!(parse(""), Err(BpsvError::EmptyDocument)));
        assert!(matches!(
            parse("A!STRING:0|B!DEC:4\nonly-one\n"),
            Err(BpsvError::FieldCountMismatch { row: 0, .. })
        ));
        assert!(matches!(
            parse("A!HEX:2\nzz11\n"),
            Err(BpsvError::InvalidHex { .. })
        ));
        assert!(matches!(
            parse("A!BLOB:2\n"),
            Err(BpsvError::UnknownType(_))
        ));
    }
}
