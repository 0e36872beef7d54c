use super::{display_name, open_pack};
use anyhow::Result;
use ftldat::{HashWriter, PackConfig, PackStore, human_size};
use std::path::Path;
use tracing::info;

pub fn handle_list(datfile: &Path, config: &PackConfig) -> Result<()> {
    let pack = open_pack(datfile, config)?;

    let mut names: Vec<&[u8]> = pack.list().collect();
    names.sort_unstable();
    for name in names {
        println!("{}", display_name(name));
    }
    Ok(())
}

pub fn handle_info(datfile: &Path, hashes: bool, bytes: bool, config: &PackConfig) -> Result<()> {
    info!("loading index of {}", datfile.display());
    let mut pack = open_pack(datfile, config)?;
    let format_size = |size: u64| {
        if bytes {
            size.to_string()
        } else {
            human_size(size)
        }
    };

    println!("{:<4} {:<7} {:<57}{:>10}", "#", "offset", "filename", "size");

    let entries = pack.list_metadata();
    let mut total = 0u64;
    for entry in &entries {
        let size = u64::from(entry.size);
        println!(
            "{:<4} {:<7x} {:<57}{:>10}",
            entry.slot,
            entry.offset,
            display_name(&entry.name),
            format_size(size)
        );
        if hashes {
            let mut hw = HashWriter::new();
            pack.extract_to(&entry.name, &mut hw)?;
            println!("        md5: {}", hw.finish());
        }
        total += size;
    }

    println!();
    println!("  {}/{} entries", entries.len(), pack.index_size());
    println!("  {}", format_size(total));
    Ok(())
}

pub fn handle_hashes(datfile: &Path, config: &PackConfig) -> Result<()> {
    let mut pack = open_pack(datfile, config)?;
    for (name, digest) in PackStore::hashes(&mut pack)? {
        println!("{} {}", display_name(&name), digest);
    }
    Ok(())
}
