use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// What to do with free-canvas items that have no linear equivalent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationPolicy {
    /// Report the drop list and wait for the user to confirm
    #[default]
    Strict,
    /// Drop them and log a warning
    Tolerant,
}

/// An element left out of a free → linear conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedItem {
    pub id: String,
    pub kind: String,
    pub section_id: String,
}

/// Non-fatal findings collected during a conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "warning", rename_all = "camelCase")]
pub enum MigrationWarning {
    /// Free-only type without a linear mapping
    Dropped { id: String, kind: String },
    /// Tag not in the registry; carried through as an opaque placeholder
    UnknownType { id: String, kind: String },
    /// Absolute geometry has no linear counterpart
    GeometryDiscarded { id: String },
    /// Lock flag has no linear counterpart
    LockDiscarded { id: String },
    /// Section background has no linear counterpart
    BackgroundDiscarded { section_id: String },
    /// A field rename landed on a field that already held a value
    FieldOverwritten {
        id: String,
        field: String,
        displaced: Value,
    },
}

impl fmt::Display for MigrationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationWarning::Dropped { id, kind } => {
                write!(f, "'{}' ({}) has no linear equivalent and was dropped", id, kind)
            }
            MigrationWarning::UnknownType { id, kind } => {
                write!(f, "'{}' has unregistered type '{}'", id, kind)
            }
            MigrationWarning::GeometryDiscarded { id } => {
                write!(f, "position of '{}' discarded", id)
            }
            MigrationWarning::LockDiscarded { id } => write!(f, "lock on '{}' discarded", id),
            MigrationWarning::BackgroundDiscarded { section_id } => {
                write!(f, "background of section '{}' discarded", section_id)
            }
            MigrationWarning::FieldOverwritten { id, field, displaced } => {
                write!(f, "field '{}' of '{}' replaced; previous value {} discarded", field, id, displaced)
            }
        }
    }
}

/// Outcome of a conversion. Conversions never fail; the caller inspects the
/// report to decide whether the (possibly lossy) switch should go ahead.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationReport<T> {
    pub output: T,
    pub dropped: Vec<DroppedItem>,
    pub warnings: Vec<MigrationWarning>,
    /// Set under the strict policy when items would be dropped; `output`
    /// must not be applied until the user confirms
    pub requires_confirmation: bool,
}

impl<T> MigrationReport<T> {
    pub fn clean(output: T) -> Self {
        Self {
            output,
            dropped: Vec::new(),
            warnings: Vec::new(),
            requires_confirmation: false,
        }
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }

    /// Everything except the output, for machine-readable reporting
    pub fn diagnostics(&self) -> Diagnostics<'_> {
        Diagnostics {
            dropped: &self.dropped,
            warnings: &self.warnings,
            requires_confirmation: self.requires_confirmation,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> MigrationReport<U> {
        MigrationReport {
            output: f(self.output),
            dropped: self.dropped,
            warnings: self.warnings,
            requires_confirmation: self.requires_confirmation,
        }
    }
}

/// Serializable view of a report's findings
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics<'a> {
    pub dropped: &'a [DroppedItem],
    pub warnings: &'a [MigrationWarning],
    pub requires_confirmation: bool,
}
