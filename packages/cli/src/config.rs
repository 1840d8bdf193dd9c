use invitation_editor::EditorConfig;
use invitation_registry::{TypeDescriptor, TypeRegistry};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_NAME: &str = "invitation.config.json";

/// Invitation configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Editor tunables (`debounceMs`, `undoDepth`, `migrationPolicy`)
    #[serde(flatten)]
    pub editor: EditorConfig,

    /// Project-specific content types registered after the built-ins
    #[serde(default)]
    pub extra_types: Vec<TypeDescriptor>,
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// Built-in registry plus configured extra types
    pub fn registry(&self) -> TypeRegistry {
        let mut registry = TypeRegistry::builtin();
        for descriptor in &self.extra_types {
            registry.register(descriptor.clone());
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invitation_migration::MigrationPolicy;
    use invitation_registry::TypeLookup;
    use tempfile::TempDir;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "debounceMs": 750,
            "migrationPolicy": "tolerant",
            "extraTypes": [
                {
                    "tag": "gift-registry",
                    "label": "Gift registry",
                    "availability": "both",
                    "defaults": { "url": "" },
                    "inverse": null
                }
            ]
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.editor.debounce_ms, 750);
        assert_eq!(config.editor.undo_depth, 50);
        assert_eq!(config.editor.migration_policy, MigrationPolicy::Tolerant);
        assert_eq!(config.extra_types.len(), 1);
        assert!(config.registry().lookup("gift-registry").is_known());
    }

    #[test]
    fn test_load_from_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{ "undoDepth": 5 }"#).unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.editor.undo_depth, 5);
        assert_eq!(config.editor.debounce_ms, 2000);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.editor, EditorConfig::default());
        assert!(matches!(config.registry().lookup("hero"), TypeLookup::Known(_)));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), "{ not json").unwrap();

        assert!(Config::load(dir.path()).is_err());
    }
}
