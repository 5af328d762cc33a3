//! Caller-facing file identifiers

use std::fmt;

/// A file as callers name it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    /// Numeric `FileDataID`
    FileDataId(u32),
    /// File name with `\` separators
    Name(String),
}

impl Identifier {
    /// Classify raw input
    ///
    /// All-digit input that fits a `u32` is a `FileDataID`; anything else is
    /// a name, with `/` rewritten to `\`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = raw.parse() {
                return Self::FileDataId(id);
            }
        }
        Self::Name(raw.replace('/', "\\"))
    }
}

impl From<u32> for Identifier {
    fn from(id: u32) -> Self {
        Self::FileDataId(id)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileDataId(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_parse() {
        assert_eq!(Identifier::parse("1302850"), Identifier::FileDataId(1_302_850));
        assert_eq!(Identifier::parse(" 42 "), Identifier::FileDataId(42));
        assert_eq!(
            Identifier::parse("Interface/Icons/INV_Misc_QuestionMark.blp"),
            Identifier::Name("Interface\\Icons\\INV_Misc_QuestionMark.blp".to_string())
        );
        assert_eq!(Identifier::parse("Wow.exe"), Identifier::Name("Wow.exe".to_string()));
        assert_eq!(
            Identifier::parse("99999999999"),
            Identifier::Name("99999999999".to_string())
        );
    }

    #[test]
    fn test_display_round_trips_names() {
        let id = Identifier::parse("a/b.txt");
        assert_eq!(id.to_string(), "a\\b.txt");
        assert_eq!(Identifier::from(7).to_string(), "7");
    }

    proptest! {
        #[test]
        fn prop_numeric_input_is_file_data_id(id in any::<u32>()) {
            prop_assert_eq!(Identifier::parse(&id.to_string()), Identifier::FileDataId(id));
        }

        #[test]
        fn prop_separator_style_is_irrelevant(parts in proptest::collection::vec("[a-zA-Z_.]{1,8}", 1..5)) {
            prop_assert_eq!(Identifier::parse(&parts.join("/")), Identifier::parse(&parts.join("\\")));
        }
    }
}
