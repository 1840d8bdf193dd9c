use super::{collect_payload_files, read_payload};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use invitation_migration::decode_payload;
use invitation_model::{content_hash, Content, ContentHash, Mode};
use invitation_registry::TypeRegistry;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Payload file or directory of payloads
    pub input: PathBuf,
}

/// One line of the item listing
#[derive(Debug, Clone, PartialEq)]
pub struct ItemLine {
    pub id: String,
    pub kind: Option<String>,
    pub order: Option<u32>,
    pub nested: bool,
    pub known: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub mode: Mode,
    pub items: Vec<ItemLine>,
    pub unknown: Vec<String>,
    pub hash: ContentHash,
}

pub fn inspect(args: InspectArgs, config: &Config) -> Result<()> {
    let registry = config.registry();
    let files = collect_payload_files(&args.input)?;

    let mut failed = 0;
    for file in &files {
        match inspect_file(file, &registry) {
            Ok(summary) => print_summary(file, &summary),
            Err(err) => {
                debug!(file = %file.display(), "payload could not be inspected: {:#}", err);
                eprintln!("{} {}: {}", "✗".red(), file.display(), err);
                failed += 1;
            }
        }
    }

    if files.len() > 1 {
        println!("   Files inspected: {}", files.len());
    }
    if failed > 0 {
        return Err(anyhow::anyhow!("{} of {} payloads could not be read", failed, files.len()));
    }
    Ok(())
}

fn inspect_file(path: &Path, registry: &TypeRegistry) -> Result<Summary> {
    let content = decode_payload(read_payload(path)?)?;
    Ok(summarize(&content, registry))
}

pub fn summarize(content: &Content, registry: &TypeRegistry) -> Summary {
    let items: Vec<ItemLine> = match content {
        Content::Linear(blocks) => blocks
            .iter()
            .map(|b| typed_line(registry, &b.id, &b.kind, Some(b.order), false))
            .collect(),
        Content::Free(sections) => sections
            .iter()
            .flat_map(|s| {
                let header = ItemLine {
                    id: s.id.clone(),
                    kind: None,
                    order: Some(s.order),
                    nested: false,
                    known: true,
                };
                std::iter::once(header).chain(
                    s.elements
                        .iter()
                        .map(move |e| typed_line(registry, &e.id, &e.kind, None, true)),
                )
            })
            .collect(),
    };

    let mut unknown: Vec<String> = items
        .iter()
        .filter(|item| !item.known)
        .filter_map(|item| item.kind.clone())
        .collect();
    unknown.sort();
    unknown.dedup();

    Summary {
        mode: content.mode(),
        items,
        unknown,
        hash: content_hash(content),
    }
}

fn typed_line(
    registry: &TypeRegistry,
    id: &str,
    kind: &str,
    order: Option<u32>,
    nested: bool,
) -> ItemLine {
    ItemLine {
        id: id.to_string(),
        kind: Some(kind.to_string()),
        order,
        nested,
        known: registry.lookup(kind).is_known(),
    }
}

fn print_summary(path: &Path, summary: &Summary) {
    println!("📄 {}", path.display().to_string().bold());
    println!("   Mode: {}", summary.mode.to_string().cyan());
    println!("   Hash: {:08x}", summary.hash);
    println!();

    for item in &summary.items {
        let indent = if item.nested { "      " } else { "   " };
        let order = item.order.map(|o| format!("{:>3}. ", o)).unwrap_or_default();
        match &item.kind {
            Some(kind) if item.known => println!("{}{}{} {}", indent, order, kind, item.id.dimmed()),
            Some(kind) => println!(
                "{}{}{} {} {}",
                indent,
                order,
                kind.yellow(),
                item.id.dimmed(),
                "(unknown type)".yellow()
            ),
            None => println!("{}{}section {}", indent, order, item.id.dimmed()),
        }
    }

    println!();
    if summary.unknown.is_empty() {
        println!("   {} All types registered", "✓".green());
    } else {
        println!(
            "   {} Unknown types: {}",
            "⚠".yellow(),
            summary.unknown.join(", ")
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summarize_flags_unknown_types() {
        let payload = json!([
            {"id": "a", "type": "hero", "order": 0},
            {"id": "b", "type": "holoprojection", "order": 1},
            {"id": "c", "type": "holoprojection", "order": 2}
        ]);
        let content = decode_payload(payload).unwrap();

        let summary = summarize(&content, &TypeRegistry::builtin());
        assert_eq!(summary.mode, Mode::Linear);
        assert_eq!(summary.items.len(), 3);
        assert!(summary.items[0].known);
        assert_eq!(summary.unknown, vec!["holoprojection".to_string()]);
        assert_eq!(summary.hash, content_hash(&content));
    }

    #[test]
    fn test_summarize_free_lists_sections_and_elements() {
        let payload = json!([
            {"id": "s1", "order": 0, "elements": [
                {"id": "e1", "type": "sticker", "position": {"kind": "auto", "slot": 0}}
            ]}
        ]);
        let content = decode_payload(payload).unwrap();

        let summary = summarize(&content, &TypeRegistry::builtin());
        assert_eq!(summary.mode, Mode::Free);
        assert_eq!(summary.items.len(), 2);
        assert_eq!(summary.items[0].kind, None);
        assert!(summary.items[1].nested);
        assert!(summary.unknown.is_empty());
    }
}
