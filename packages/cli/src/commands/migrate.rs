use super::read_payload;
use crate::config::Config;
use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use invitation_migration::{decode_payload, migrate as convert, MigrationPolicy, MigrationReport};
use invitation_model::Mode;
use invitation_registry::TypeRegistry;
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetMode {
    Linear,
    Free,
}

impl From<TargetMode> for Mode {
    fn from(target: TargetMode) -> Self {
        match target {
            TargetMode::Linear => Mode::Linear,
            TargetMode::Free => Mode::Free,
        }
    }
}

#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Payload file to convert
    pub input: PathBuf,

    /// Target representation
    #[arg(long, value_enum)]
    pub to: TargetMode,

    /// Refuse to drop free-only items (default unless configured otherwise)
    #[arg(long, conflicts_with = "tolerant")]
    pub strict: bool,

    /// Drop free-only items that have no linear equivalent
    #[arg(long)]
    pub tolerant: bool,

    /// Write the converted payload here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write dropped items and warnings as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl MigrateArgs {
    fn policy(&self, config: &Config) -> MigrationPolicy {
        if self.strict {
            MigrationPolicy::Strict
        } else if self.tolerant {
            MigrationPolicy::Tolerant
        } else {
            config.editor.migration_policy
        }
    }
}

pub fn migrate(args: MigrateArgs, config: &Config) -> Result<()> {
    let registry = config.registry();
    let policy = args.policy(config);
    let payload = read_payload(&args.input)?;

    let report = convert_payload(payload, args.to.into(), &registry, policy)?;
    debug!(
        input = %args.input.display(),
        ?policy,
        dropped = report.dropped_count(),
        warnings = report.warnings.len(),
        "converted payload"
    );

    if let Some(path) = &args.report {
        let diagnostics = serde_json::to_string_pretty(&report.diagnostics())?;
        std::fs::write(path, diagnostics)?;
    }

    for warning in &report.warnings {
        eprintln!("   {} {}", "⚠".yellow(), warning);
    }

    if report.requires_confirmation {
        eprintln!();
        eprintln!(
            "{} {} item(s) have no linear equivalent:",
            "✗".red(),
            report.dropped_count()
        );
        for item in &report.dropped {
            eprintln!("   - {} ({}) in section {}", item.id, item.kind, item.section_id);
        }
        return Err(anyhow::anyhow!("Conversion would drop content; rerun with --tolerant to accept"));
    }

    let json = serde_json::to_string_pretty(&report.output)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)?;
            eprintln!(
                "{} {} → {}",
                "✓".green(),
                args.input.display(),
                path.display()
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Decode, convert and re-encode a payload
pub fn convert_payload(
    payload: Value,
    target: Mode,
    registry: &TypeRegistry,
    policy: MigrationPolicy,
) -> Result<MigrationReport<Value>> {
    let content = decode_payload(payload)?;
    Ok(convert(&content, target, registry, policy).map(|converted| converted.to_payload()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use invitation_migration::detect_mode;
    use serde_json::json;
    use tempfile::TempDir;

    fn free_payload() -> Value {
        json!([
            {"id": "s1", "order": 0, "elements": [
                {"id": "e1", "type": "hero", "position": {"kind": "auto", "slot": 0}},
                {"id": "e2", "type": "sticker", "position": {"kind": "absolute", "x": 10.0, "y": 10.0, "width": 20.0, "height": 20.0}}
            ]}
        ])
    }

    #[test]
    fn test_convert_linear_to_free() {
        let payload = json!([{"id": "a", "type": "hero", "order": 0, "content": {"title": "Hi"}}]);

        let report = convert_payload(payload, Mode::Free, &TypeRegistry::builtin(), MigrationPolicy::Strict)
            .unwrap();
        assert!(!report.requires_confirmation);
        assert_eq!(detect_mode(&report.output), Mode::Free);
        assert_eq!(report.output[0]["elements"][0]["content"]["title"], "Hi");
    }

    #[test]
    fn test_strict_reports_drops() {
        let report = convert_payload(
            free_payload(),
            Mode::Linear,
            &TypeRegistry::builtin(),
            MigrationPolicy::Strict,
        )
        .unwrap();
        assert!(report.requires_confirmation);
        assert_eq!(report.dropped[0].id, "e2");
    }

    #[test]
    fn test_migrate_writes_output_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("free.json");
        let output = dir.path().join("linear.json");
        std::fs::write(&input, free_payload().to_string()).unwrap();

        let args = MigrateArgs {
            input,
            to: TargetMode::Linear,
            strict: false,
            tolerant: true,
            output: Some(output.clone()),
            report: None,
        };
        migrate(args, &Config::default()).unwrap();

        let written: Value = serde_json::from_str(&std::fs::read_to_string(output).unwrap()).unwrap();
        assert_eq!(detect_mode(&written), Mode::Linear);
        assert_eq!(written.as_array().unwrap().len(), 1);
        assert_eq!(written[0]["id"], "e1");
    }

    #[test]
    fn test_migrate_refuses_lossy_strict_conversion() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("free.json");
        std::fs::write(&input, free_payload().to_string()).unwrap();

        let args = MigrateArgs {
            input,
            to: TargetMode::Linear,
            strict: true,
            tolerant: false,
            output: None,
            report: None,
        };
        assert!(migrate(args, &Config::default()).is_err());
    }

    #[test]
    fn test_migrate_writes_diagnostics_report() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("free.json");
        let report = dir.path().join("report.json");
        std::fs::write(&input, free_payload().to_string()).unwrap();

        let args = MigrateArgs {
            input,
            to: TargetMode::Linear,
            strict: true,
            tolerant: false,
            output: None,
            report: Some(report.clone()),
        };
        assert!(migrate(args, &Config::default()).is_err());

        let written: Value = serde_json::from_str(&std::fs::read_to_string(report).unwrap()).unwrap();
        assert_eq!(written["requiresConfirmation"], true);
        assert_eq!(written["dropped"][0]["id"], "e2");
        assert!(written["warnings"]
            .as_array()
            .unwrap()
            .iter()
            .any(|w| w["warning"] == "dropped" && w["kind"] == "sticker"));
    }
}
