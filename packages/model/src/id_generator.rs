use crate::error::{ModelError, ModelResult};
use crc32fast::Hasher;

/// Derive a short, stable seed from a document id using CRC32
pub fn document_seed(document_id: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(b"invitation://");
    hasher.update(document_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential id generator for blocks, sections and elements.
///
/// The counter only moves forward, so an id freed by a remove is never
/// handed out again within the document.
#[derive(Debug, Clone, PartialEq)]
pub struct IdGenerator {
    seed: String,
    count: u64,
}

impl IdGenerator {
    pub fn new(document_id: &str) -> Self {
        Self {
            seed: document_seed(document_id),
            count: 0,
        }
    }

    /// Resume after ids already present in a loaded document
    pub fn resume<'a>(document_id: &str, existing: impl IntoIterator<Item = &'a str>) -> Self {
        let mut generator = Self::new(document_id);
        for id in existing {
            generator.observe(id);
        }
        generator
    }

    /// Generate next sequential id. Fails once the counter cannot advance,
    /// rather than wrapping onto ids already handed out.
    pub fn new_id(&mut self) -> ModelResult<String> {
        self.count = self
            .count
            .checked_add(1)
            .ok_or_else(|| ModelError::IdsExhausted(self.seed.clone()))?;
        Ok(format!("{}-{}", self.seed, self.count))
    }

    /// Advance the counter past an id produced by this seed
    pub fn observe(&mut self, id: &str) {
        let suffix = id
            .strip_prefix(self.seed.as_str())
            .and_then(|rest| rest.strip_prefix('-'))
            .and_then(|n| n.parse::<u64>().ok());

        if let Some(n) = suffix {
            self.count = self.count.max(n);
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}
