use invitation_model::{FieldMap, Mode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which representations a type may appear in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    /// Linear blocks and free elements
    Both,
    /// Free elements only (no linear equivalent without a mapping)
    FreeOnly,
}

impl Availability {
    pub fn allows(&self, mode: Mode) -> bool {
        match self {
            Availability::Both => true,
            Availability::FreeOnly => mode == Mode::Free,
        }
    }
}

/// How a free-only element becomes a linear block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InverseMapping {
    /// Linear type tag to produce
    pub target: String,

    /// Content field renames, `(from, to)`
    pub fields: Vec<(String, String)>,
}

impl InverseMapping {
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            fields: Vec::new(),
        }
    }

    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.fields.push((from.into(), to.into()));
        self
    }

    fn target_of(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(from, _)| from == field)
            .map(|(_, to)| to.as_str())
    }

    /// Apply field renames to a content map; unlisted fields pass through.
    ///
    /// A renamed value wins over a field already stored under its new name;
    /// the value it replaced is returned in `displaced`.
    pub fn map_content(&self, content: &FieldMap) -> MappedContent {
        let mut mapped: FieldMap = content
            .iter()
            .filter(|(key, _)| self.target_of(key).is_none())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let mut displaced = Vec::new();
        for (key, value) in content {
            let Some(to) = self.target_of(key) else {
                continue;
            };
            if let Some(previous) = mapped.insert(to.to_string(), value.clone()) {
                if previous != *value {
                    displaced.push((to.to_string(), previous));
                }
            }
        }

        MappedContent {
            content: mapped,
            displaced,
        }
    }
}

/// Result of [`InverseMapping::map_content`]
#[derive(Debug, Clone, PartialEq)]
pub struct MappedContent {
    pub content: FieldMap,

    /// `(field, value)` pairs overwritten by a rename
    pub displaced: Vec<(String, Value)>,
}

/// Catalog entry for one content type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Type tag stored on blocks/elements
    pub tag: String,

    /// Human-readable name for pickers
    pub label: String,

    pub availability: Availability,

    /// Default content for freshly added items
    pub defaults: FieldMap,

    /// Migration mapping for free-only types
    pub inverse: Option<InverseMapping>,
}

impl TypeDescriptor {
    pub fn new(tag: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            label: label.into(),
            availability: Availability::Both,
            defaults: FieldMap::new(),
            inverse: None,
        }
    }

    pub fn free_only(mut self) -> Self {
        self.availability = Availability::FreeOnly;
        self
    }

    pub fn with_default(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(field.into(), value.into());
        self
    }

    pub fn with_inverse(mut self, inverse: InverseMapping) -> Self {
        self.inverse = Some(inverse);
        self
    }

    /// Fresh copy of the default content
    pub fn default_content(&self) -> FieldMap {
        self.defaults.clone()
    }
}
