//! FTL `.dat` command-line tool
//!
//! Subcommand definitions and handlers for the `ftldat` binary.

pub mod commands;

pub use crate::commands::run;

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Lists the entry names in the datfile
    List {
        /// The datfile to examine
        datfile: PathBuf,
    },

    /// Shows detailed technical information about a datfile
    Info {
        /// The datfile to examine
        datfile: PathBuf,

        /// Show MD5 hashes
        #[arg(short = 'H', long)]
        hashes: bool,

        /// Show sizes in bytes
        #[arg(short = 'B', long)]
        bytes: bool,
    },

    /// Shows the entry names and their MD5 hashes alphabetically
    Hashes {
        /// The datfile to examine
        datfile: PathBuf,
    },

    /// Creates a datfile from a folder
    Pack {
        /// The datfile to create
        datfile: PathBuf,

        /// The folder to pack. Defaults to [DATFILE]-unpacked
        folder: Option<PathBuf>,

        /// Index size; raised to the number of files if smaller
        #[arg(short = 'I', long = "indexsize", env = "FTLDAT_INDEX_SIZE")]
        index_size: Option<u32>,

        /// Override an existing datfile
        #[arg(short, long)]
        force: bool,
    },

    /// Unpacks a datfile to a folder
    Unpack {
        /// The datfile to unpack
        datfile: PathBuf,

        /// The folder to extract to. Defaults to [DATFILE]-unpacked
        folder: Option<PathBuf>,

        /// Override existing files
        #[arg(short, long)]
        force: bool,
    },

    /// Adds a single file to a datfile
    Add {
        /// The datfile to add the file to
        datfile: PathBuf,

        /// The file to add
        file: PathBuf,

        /// The name the file will have in the datfile. Defaults to [FILE]
        name: Option<String>,

        /// Replace [NAME] if it already exists
        #[arg(short, long)]
        force: bool,
    },

    /// Appends a file to an existing entry in the datfile
    Append {
        /// The datfile
        datfile: PathBuf,

        /// The entry to append to
        name: String,

        /// The file to append
        appendix: PathBuf,

        /// Create [NAME] if it does not exist
        #[arg(short, long)]
        force: bool,
    },

    /// Replaces a single entry in the datfile
    Replace {
        /// The datfile
        datfile: PathBuf,

        /// The file to replace [NAME] with
        replacement: PathBuf,

        /// The entry to replace
        name: String,

        /// Add [REPLACEMENT] even if [NAME] does not exist
        #[arg(short, long)]
        force: bool,
    },

    /// Removes an entry from the datfile
    Remove {
        /// The datfile to remove the entry from
        datfile: PathBuf,

        /// The entry to remove
        name: String,

        /// Do not fail when [NAME] does not exist
        #[arg(short, long)]
        force: bool,
    },

    /// Extracts a single entry from a datfile
    Extract {
        /// The datfile to extract from
        datfile: PathBuf,

        /// The entry to extract
        name: String,

        /// The file to extract to. Defaults to stdout
        target: Option<PathBuf>,

        /// Override [TARGET] if it already exists
        #[arg(short, long)]
        force: bool,
    },

    /// Repacks the datfile, removing unused space
    Repack {
        /// The datfile to repack
        datfile: PathBuf,
    },
}
