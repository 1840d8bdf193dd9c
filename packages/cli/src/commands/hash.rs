use super::{collect_payload_files, read_payload};
use anyhow::Result;
use clap::Args;
use invitation_migration::decode_payload;
use invitation_model::content_hash;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct HashArgs {
    /// Payload file or directory of payloads
    pub input: PathBuf,
}

/// Print the dirty hash the autosave engine would compute for each payload
pub fn hash(args: HashArgs) -> Result<()> {
    for file in collect_payload_files(&args.input)? {
        let content = decode_payload(read_payload(&file)?)?;
        println!("{:08x}  {}", content_hash(&content), file.display());
    }
    Ok(())
}
