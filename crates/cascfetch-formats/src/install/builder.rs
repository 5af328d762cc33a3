//! Install manifest builder for fixtures

use cascfetch_crypto::ContentKey;

/// Builds a decoded install manifest
#[derive(Debug, Clone, Default)]
pub struct InstallBuilder {
    tags: Vec<(String, u16)>,
    files: Vec<(String, ContentKey, u32, Vec<String>)>,
}

impl InstallBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a tag
    #[must_use]
    pub fn tag(mut self, name: &str, tag_type: u16) -> Self {
        self.tags.push((name.to_string(), tag_type));
        self
    }

    /// Add a file with the names of the tags it carries
    #[must_use]
    pub fn file(mut self, path: &str, content_key: ContentKey, size: u32, tags: &[&str]) -> Self {
        self.files.push((
            path.to_string(),
            content_key,
            size,
            tags.iter().map(|t| (*t).to_string()).collect(),
        ));
        self
    }

    /// Serialize
    pub fn build(self) -> Vec<u8> {
        let mut out = b"IN".to_vec();
        out.push(1);
        out.push(16);
        out.extend_from_slice(&(self.tags.len() as u16).to_be_bytes());
        out.extend_from_slice(&(self.files.len() as u32).to_be_bytes());

        let mask_len = self.files.len().div_ceil(8);
        for (name, tag_type) in &self.tags {
            out.extend_from_slice(name.as_bytes());
            out.push(0);
            out.extend_from_slice(&tag_type.to_be_bytes());
            let mut mask = vec![0u8; mask_len];
            for (index, (_, _, _, tags)) in self.files.iter().enumerate() {
                if tags.contains(name) {
                    mask[index / 8] |= 0x80 >> (index % 8);
                }
            }
            out.extend_from_slice(&mask);
        }

        for (path, ckey, size, _) in &self.files {
            out.extend_from_slice(path.as_bytes());
            out.push(0);
            out.extend_from_slice(ckey.as_bytes());
            out.extend_from_slice(&size.to_be_bytes());
        }
        out
    }
}
