use super::open_pack;
use anyhow::{Context, Result, bail};
use ftldat::PackConfig;
use ftldat::path::name_from_path;
use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::debug;

fn input_size(path: &Path) -> Result<u64> {
    if !path.exists() {
        bail!("{} does not exist.", path.display());
    }
    Ok(fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?
        .len())
}

pub fn handle_add(
    datfile: &Path,
    file: &Path,
    name: Option<String>,
    force: bool,
    config: &PackConfig,
) -> Result<()> {
    let size = input_size(file)?;
    let name = match name {
        Some(name) => name,
        None => name_from_path(file)?,
    };

    let mut pack = open_pack(datfile, config)?;
    if pack.contains(&name) {
        if !force {
            bail!("{name} already exists. Use -f to replace.");
        }
        pack.remove(&name)?;
    }

    let mut source = File::open(file)?;
    pack.add(&name, &mut source, size)
        .with_context(|| format!("failed to add {name}"))?;
    pack.flush()?;
    Ok(())
}

pub fn handle_append(
    datfile: &Path,
    name: &str,
    appendix: &Path,
    force: bool,
    config: &PackConfig,
) -> Result<()> {
    let appendix_size = input_size(appendix)?;
    let mut pack = open_pack(datfile, config)?;
    let mut appendix_file = File::open(appendix)?;

    if !pack.contains(name) {
        if !force {
            bail!("{name} does not exist. Use -f to add anyway.");
        }
        pack.add(name, &mut appendix_file, appendix_size)?;
        pack.flush()?;
        return Ok(());
    }

    // Stage old content plus appendix, then swap the entry
    let mut combined = tempfile::tempfile().context("failed to create temporary file")?;
    pack.extract_to(name, &mut combined)?;
    io::copy(&mut appendix_file, &mut combined)?;
    let size = combined.stream_position()?;
    combined.seek(SeekFrom::Start(0))?;
    debug!("appending {} bytes to {} ({} total)", appendix_size, name, size);

    pack.remove(name)?;
    pack.add(name, &mut combined, size)?;
    pack.flush()?;
    Ok(())
}

pub fn handle_replace(
    datfile: &Path,
    replacement: &Path,
    name: &str,
    force: bool,
    config: &PackConfig,
) -> Result<()> {
    let size = input_size(replacement)?;
    let mut pack = open_pack(datfile, config)?;

    if pack.contains(name) {
        pack.remove(name)?;
    } else if !force {
        bail!("{name} does not exist. Use -f to add anyway.");
    }

    let mut source = File::open(replacement)?;
    pack.add(name, &mut source, size)?;
    pack.flush()?;
    Ok(())
}

pub fn handle_remove(datfile: &Path, name: &str, force: bool, config: &PackConfig) -> Result<()> {
    let mut pack = open_pack(datfile, config)?;

    if pack.contains(name) {
        pack.remove(name)?;
        pack.flush()?;
    } else if !force {
        bail!("{name} does not exist.");
    }
    Ok(())
}

pub fn handle_extract(
    datfile: &Path,
    name: &str,
    target: Option<&Path>,
    force: bool,
    config: &PackConfig,
) -> Result<()> {
    if let Some(target) = target
        && target.exists()
        && !force
    {
        bail!("{} already exists. Use -f to override.", target.display());
    }

    let mut pack = open_pack(datfile, config)?;
    if !pack.contains(name) {
        bail!("{name} does not exist.");
    }

    match target {
        Some(target) => {
            let mut file = File::create(target)
                .with_context(|| format!("failed to create {}", target.display()))?;
            pack.extract_to(name, &mut file)?;
            file.flush()?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            pack.extract_to(name, &mut stdout)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
