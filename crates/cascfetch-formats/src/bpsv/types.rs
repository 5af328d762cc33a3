use std::fmt;
use thiserror::Error;

/// BPSV field type definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BpsvType {
    /// String field with size hint
    String(usize),
    /// Hexadecimal field with byte count
    Hex(usize),
    /// Decimal number field with digit count hint
    Dec(usize),
}

impl BpsvType {
    /// Parse a type specification like "STRING:0" or "HEX:16"
    pub fn parse(spec: &str) -> Result<Self, BpsvError> {
        let (name, size) = spec
            .split_once(':')
            .ok_or_else(|| BpsvError::InvalidTypeSpec(spec.to_string()))?;
        let size = size
            .parse::<usize>()
            .map_err(|_| BpsvError::InvalidTypeSpec(spec.to_string()))?;

        match name.to_ascii_uppercase().as_str() {
            "STRING" => Ok(Self::String(size)),
            "HEX" => Ok(Self::Hex(size)),
            "DEC" => Ok(Self::Dec(size)),
            other => Err(BpsvError::UnknownType(other.to_string())),
        }
    }
}

impl fmt::Display for BpsvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(size) => write!(f, "STRING:{size}"),
            Self::Hex(size) => write!(f, "HEX:{size}"),
            Self::Dec(size) => write!(f, "DEC:{size}"),
        }
    }
}

/// BPSV field definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BpsvField {
    /// Field name
    pub name: String,
    /// Field type with size hint
    pub field_type: BpsvType,
}

impl BpsvField {
    /// Parse a field specification like "BuildConfig!HEX:16"
    pub fn parse(spec: &str) -> Result<Self, BpsvError> {
        let (name, field_type) = spec
            .split_once('!')
            .ok_or_else(|| BpsvError::InvalidFieldSpec(spec.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            field_type: BpsvType::parse(field_type)?,
        })
    }
}

/// BPSV parsing errors
#[derive(Debug, Error)]
pub enum BpsvError {
    /// Document has no header line
    #[error("Empty BPSV document")]
    EmptyDocument,

    /// Malformed `Name!TYPE:size` specification
    #[error("Invalid field specification: {0}")]
    InvalidFieldSpec(String),

    /// Malformed `TYPE:size` specification
    #[error("Invalid type specification: {0}")]
    InvalidTypeSpec(String),

    /// Type name other than STRING, HEX or DEC
    #[error("Unknown field type: {0}")]
    UnknownType(String),

    /// Row has a different number of cells than the header
    #[error("Row {row} has {actual} fields, header declares {expected}")]
    FieldCountMismatch {
        /// Row index
        row: usize,
        /// Header field count
        expected: usize,
        /// Cells in the row
        actual: usize,
    },

    /// HEX cell is not valid hex of the declared length
    #[error("Invalid hex value for {field}: {value}")]
    InvalidHex {
        /// Field name
        field: String,
        /// Raw cell
        value: String,
    },

    /// Malformed `## seqn = N` line
    #[error("Invalid sequence number line: {0}")]
    InvalidSequence(String),
}
