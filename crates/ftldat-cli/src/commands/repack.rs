use super::open_pack;
use anyhow::Result;
use ftldat::{PackConfig, human_size};
use std::path::Path;
use tracing::info;

/// Share of `part` in `whole` as a percentage, 0 for an empty whole.
#[allow(clippy::cast_precision_loss)]
fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

pub fn handle_repack(datfile: &Path, config: &PackConfig) -> Result<()> {
    info!("repacking {}", datfile.display());
    let mut pack = open_pack(datfile, config)?;
    let stats = pack.repack()?;
    pack.flush()?;

    println!(
        " old size      {} ({})",
        human_size(stats.old_size),
        stats.old_size
    );
    println!(
        " new size      {} ({}; {:.1}%)",
        human_size(stats.new_size),
        stats.new_size,
        percent(stats.new_size, stats.old_size)
    );
    println!(
        " bytes moved   {} ({}; {:.1}%)",
        human_size(stats.bytes_moved),
        stats.bytes_moved,
        percent(stats.bytes_moved, stats.new_size)
    );
    Ok(())
}
