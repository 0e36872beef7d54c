//! Command handlers

pub mod edit;
pub mod inspect;
pub mod repack;
pub mod transfer;

use crate::Commands;
use anyhow::{Context, Result};
use ftldat::{DatPack, PackConfig};
use std::borrow::Cow;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Dispatch one parsed subcommand.
pub fn run(command: Commands, config: &PackConfig) -> Result<()> {
    match command {
        Commands::List { datfile } => inspect::handle_list(&datfile, config),
        Commands::Info {
            datfile,
            hashes,
            bytes,
        } => inspect::handle_info(&datfile, hashes, bytes, config),
        Commands::Hashes { datfile } => inspect::handle_hashes(&datfile, config),
        Commands::Pack {
            datfile,
            folder,
            index_size,
            force,
        } => transfer::handle_pack(&datfile, folder, index_size, force, config),
        Commands::Unpack {
            datfile,
            folder,
            force,
        } => transfer::handle_unpack(&datfile, folder, force, config),
        Commands::Add {
            datfile,
            file,
            name,
            force,
        } => edit::handle_add(&datfile, &file, name, force, config),
        Commands::Append {
            datfile,
            name,
            appendix,
            force,
        } => edit::handle_append(&datfile, &name, &appendix, force, config),
        Commands::Replace {
            datfile,
            replacement,
            name,
            force,
        } => edit::handle_replace(&datfile, &replacement, &name, force, config),
        Commands::Remove {
            datfile,
            name,
            force,
        } => edit::handle_remove(&datfile, &name, force, config),
        Commands::Extract {
            datfile,
            name,
            target,
            force,
        } => edit::handle_extract(&datfile, &name, target.as_deref(), force, config),
        Commands::Repack { datfile } => repack::handle_repack(&datfile, config),
    }
}

/// Open an existing datfile for reading and writing.
pub(crate) fn open_pack(datfile: &Path, config: &PackConfig) -> Result<DatPack> {
    DatPack::open_with_config(datfile, config)
        .with_context(|| format!("failed to open {}", datfile.display()))
}

/// `DATFILE-unpacked`, the folder used when none is given.
pub(crate) fn default_folder(datfile: &Path) -> PathBuf {
    let mut folder = OsString::from(datfile.as_os_str());
    folder.push("-unpacked");
    PathBuf::from(folder)
}

pub(crate) fn display_name(name: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(name)
}
