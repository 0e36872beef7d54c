use super::{default_folder, display_name, open_pack};
use anyhow::{Context, Result, bail};
use ftldat::{DatPack, FolderPack, PackConfig, PackStore};
use std::path::{Path, PathBuf};
use tracing::info;

pub fn handle_pack(
    datfile: &Path,
    folder: Option<PathBuf>,
    index_size: Option<u32>,
    force: bool,
    config: &PackConfig,
) -> Result<()> {
    if datfile.exists() && !force {
        bail!("{} already exists. Use -f to override.", datfile.display());
    }
    let folder = folder.unwrap_or_else(|| default_folder(datfile));
    if !folder.is_dir() {
        bail!("{} is not a directory", folder.display());
    }

    info!("listing files in {}", folder.display());
    let source = FolderPack::with_config(&folder, config);
    let files = source.list_sizes()?;

    let count = u32::try_from(files.len()).context("too many files for one datfile")?;
    let index_size = index_size.map_or(count, |n| n.max(count));

    info!("creating {} with {} slots", datfile.display(), index_size);
    let mut pack = DatPack::create_with_config(datfile, &config.clone().with_index_size(index_size))
        .with_context(|| format!("failed to create {}", datfile.display()))?;

    for (name, size) in &files {
        println!(" {}", display_name(name));
        let (mut file, _) = source.open_file(name)?;
        pack.add(name, &mut file, *size)
            .with_context(|| format!("failed to pack {}", display_name(name)))?;
    }
    pack.flush()?;
    Ok(())
}

pub fn handle_unpack(
    datfile: &Path,
    folder: Option<PathBuf>,
    force: bool,
    config: &PackConfig,
) -> Result<()> {
    let folder = folder.unwrap_or_else(|| default_folder(datfile));
    let mut pack = open_pack(datfile, config)?;
    let target = FolderPack::with_config(&folder, config);

    let mut names: Vec<Vec<u8>> = pack.list().map(<[u8]>::to_vec).collect();
    names.sort_unstable();

    // Fail before writing anything rather than halfway through
    for name in &names {
        target.path_for(name)?;
        if !force && PackStore::contains(&target, name) {
            bail!(
                "{} already exists. Use -f to override.",
                display_name(name)
            );
        }
    }

    info!("extracting {} entries to {}", names.len(), folder.display());
    for name in &names {
        println!(" {}", display_name(name));
        let mut file = target.create_file(name)?;
        pack.extract_to(name, &mut file)
            .with_context(|| format!("failed to extract {}", display_name(name)))?;
    }
    Ok(())
}
