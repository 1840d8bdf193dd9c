use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use invitation_model::Mode;
use invitation_registry::{Availability, TypeDescriptor};

#[derive(Args, Debug)]
pub struct TypesArgs {
    /// Only list types usable in this mode (linear, free)
    #[arg(short, long)]
    pub mode: Option<Mode>,

    /// Print descriptors as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn types(args: TypesArgs, config: &Config) -> Result<()> {
    let registry = config.registry();
    let listed: Vec<&TypeDescriptor> = registry
        .list_types()
        .filter(|d| args.mode.map_or(true, |mode| d.availability.allows(mode)))
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listed)?);
        return Ok(());
    }

    println!("📦 {} registered types", listed.len().to_string().bold());
    println!();

    for descriptor in listed {
        let availability = match descriptor.availability {
            Availability::Both => "linear + free".green(),
            Availability::FreeOnly => "free only".yellow(),
        };
        print!("   {:<12} {:<18} {}", descriptor.tag.bold(), descriptor.label, availability);
        if let Some(inverse) = &descriptor.inverse {
            print!("  → {}", inverse.target.cyan());
        }
        println!();
    }

    Ok(())
}
