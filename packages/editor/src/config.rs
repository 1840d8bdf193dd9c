use invitation_migration::MigrationPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for an editing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Quiet period before a change is persisted
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Maximum undo levels kept
    #[serde(default = "default_undo_depth")]
    pub undo_depth: usize,

    /// Policy used when a mode switch would drop free-only items
    #[serde(default)]
    pub migration_policy: MigrationPolicy,
}

fn default_debounce_ms() -> u64 {
    2000
}

fn default_undo_depth() -> usize {
    50
}

impl EditorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub fn with_undo_depth(mut self, undo_depth: usize) -> Self {
        self.undo_depth = undo_depth;
        self
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            undo_depth: default_undo_depth(),
            migration_policy: MigrationPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{ "debounceMs": 500, "undoDepth": 10, "migrationPolicy": "tolerant" }"#;

        let config: EditorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert_eq!(config.undo_depth, 10);
        assert_eq!(config.migration_policy, MigrationPolicy::Tolerant);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: EditorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.debounce_ms, 2000);
        assert_eq!(config.undo_depth, 50);
        assert_eq!(config.migration_policy, MigrationPolicy::Strict);
    }
}
