//! Plain-directory mirror of a container's key space.
//!
//! [`FolderPack`] maps entry names such as `img/ship/hull.png` onto files
//! below a root directory. It is the unpacked form of a `.dat` file and the
//! source for building one.

use crate::config::PackConfig;
use crate::copy::ChunkCopier;
use crate::path::{checked_split, name_from_path};
use crate::store::PackStore;
use crate::{FtlDatError, Result};
use std::fs::{self, File};
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A directory tree used as a pack.
pub struct FolderPack {
    root: PathBuf,
    copier: ChunkCopier,
}

impl FolderPack {
    /// Use `root` as the pack directory. It need not exist yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_config(root, &PackConfig::default())
    }

    /// Use `root` with the chunk size from `config`.
    pub fn with_config(root: impl Into<PathBuf>, config: &PackConfig) -> Self {
        Self {
            root: root.into(),
            copier: ChunkCopier::new(config.chunk_size),
        }
    }

    /// The pack directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for `name`.
    ///
    /// Fails with [`FtlDatError::InvalidName`] for names that could point
    /// outside the root.
    pub fn path_for(&self, name: &[u8]) -> Result<PathBuf> {
        let mut path = self.root.clone();
        path.extend(checked_split(name)?);
        Ok(path)
    }

    /// Create (or truncate) the file for `name`, creating parent directories.
    pub fn create_file(&self, name: &[u8]) -> Result<File> {
        let path = self.path_for(name)?;
        ensure_parent(&path)?;
        Ok(File::create(&path)?)
    }

    /// Open the file for `name` for reading, along with its size.
    pub fn open_file(&self, name: &[u8]) -> Result<(File, u64)> {
        let path = self.path_for(name)?;
        let file = File::open(&path).map_err(|e| missing(name, e))?;
        let size = file.metadata()?.len();
        Ok((file, size))
    }

    fn walk(&self) -> Result<Vec<(Vec<u8>, u64)>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(&self.root).map_err(|_| {
                FtlDatError::InvalidName(format!("{} is outside the pack", entry.path().display()))
            })?;
            let name = match name_from_path(relative) {
                Ok(name) => name,
                Err(e) => {
                    warn!("skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            found.push((name.into_bytes(), entry.metadata().map_err(io::Error::from)?.len()));
        }
        Ok(found)
    }
}

impl PackStore for FolderPack {
    fn list(&self) -> Result<Vec<Vec<u8>>> {
        Ok(self.walk()?.into_iter().map(|(name, _)| name).collect())
    }

    fn list_sizes(&self) -> Result<Vec<(Vec<u8>, u64)>> {
        self.walk()
    }

    fn add<R: Read + ?Sized>(&mut self, name: &[u8], source: &mut R, size: u64) -> Result<()> {
        let path = self.path_for(name)?;
        ensure_parent(&path)?;

        let mut file = File::create_new(&path).map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                FtlDatError::DuplicateKey(name.to_vec())
            } else {
                e.into()
            }
        })?;

        if let Err(e) = self.copier.copy_exact(source, &mut file, size) {
            drop(file);
            if let Err(cleanup) = fs::remove_file(&path) {
                warn!("could not remove partial {}: {}", path.display(), cleanup);
            }
            return Err(e);
        }
        debug!("wrote {} ({} bytes)", path.display(), size);
        Ok(())
    }

    fn extract_to<W: Write + ?Sized>(&mut self, name: &[u8], sink: &mut W) -> Result<()> {
        let (mut file, size) = self.open_file(name)?;
        self.copier.copy_exact(&mut file, sink, size)
    }

    fn remove(&mut self, name: &[u8]) -> Result<()> {
        let path = self.path_for(name)?;
        fs::remove_file(&path).map_err(|e| missing(name, e))
    }

    fn contains(&self, name: &[u8]) -> bool {
        self.path_for(name).is_ok_and(|path| path.is_file())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn missing(name: &[u8], e: io::Error) -> FtlDatError {
    if e.kind() == ErrorKind::NotFound {
        FtlDatError::NotFound(name.to_vec())
    } else {
        e.into()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn folder() -> (TempDir, FolderPack) {
        let dir = TempDir::new().expect("tempdir");
        let pack = FolderPack::new(dir.path().join("unpacked"));
        (dir, pack)
    }

    #[test]
    fn test_add_creates_nested_file() {
        let (_dir, mut pack) = folder();
        pack.add(b"img/ship/hull.png", &mut Cursor::new(b"hull"), 4)
            .expect("add");

        let on_disk = pack.root().join("img").join("ship").join("hull.png");
        assert_eq!(fs::read(on_disk).expect("read"), b"hull");
        assert!(pack.contains(b"img/ship/hull.png"));
    }

    #[test]
    fn test_list_uses_forward_slashes() {
        let (_dir, mut pack) = folder();
        pack.add(b"data/a.xml", &mut Cursor::new(b"aa"), 2).expect("add");
        pack.add(b"audio/waves/b.ogg", &mut Cursor::new(b"bbb"), 3)
            .expect("add");
        pack.add(b"top", &mut Cursor::new(b""), 0).expect("add");

        let mut sizes = pack.list_sizes().expect("list");
        sizes.sort();
        assert_eq!(
            sizes,
            vec![
                (b"audio/waves/b.ogg".to_vec(), 3),
                (b"data/a.xml".to_vec(), 2),
                (b"top".to_vec(), 0),
            ]
        );
    }

    #[test]
    fn test_missing_root_lists_nothing() {
        let (_dir, pack) = folder();
        assert!(pack.list().expect("list").is_empty());
    }

    #[test]
    fn test_duplicate_add() {
        let (_dir, mut pack) = folder();
        pack.add(b"a", &mut Cursor::new(b"1"), 1).expect("add");
        let err = pack
            .add(b"a", &mut Cursor::new(b"2"), 1)
            .expect_err("duplicate");
        assert!(matches!(err, FtlDatError::DuplicateKey(_)));
    }

    #[test]
    fn test_short_source_leaves_no_file() {
        let (_dir, mut pack) = folder();
        let err = pack
            .add(b"short", &mut Cursor::new(b"abc"), 10)
            .expect_err("short");
        assert!(matches!(err, FtlDatError::ShortRead { .. }));
        assert!(!pack.contains(b"short"));
    }

    #[test]
    fn test_extract_and_remove() {
        let (_dir, mut pack) = folder();
        pack.add(b"x/y", &mut Cursor::new(b"content"), 7).expect("add");

        let mut out = Vec::new();
        pack.extract_to(b"x/y", &mut out).expect("extract");
        assert_eq!(out, b"content");

        pack.remove(b"x/y").expect("remove");
        assert!(!pack.contains(b"x/y"));
        assert!(matches!(pack.remove(b"x/y"), Err(FtlDatError::NotFound(_))));
        assert!(matches!(
            pack.extract_to(b"x/y", &mut Vec::<u8>::new()),
            Err(FtlDatError::NotFound(_))
        ));
    }

    #[test]
    fn test_rejects_escaping_names() {
        let (_dir, mut pack) = folder();
        let err = pack
            .add(b"../escape", &mut Cursor::new(b"x"), 1)
            .expect_err("escape");
        assert!(matches!(err, FtlDatError::InvalidName(_)));
        assert!(!pack.contains(b"../escape"));
        assert!(pack.create_file(b"a/../../b").is_err());
    }

    #[test]
    fn test_create_file_truncates() {
        let (_dir, mut pack) = folder();
        pack.add(b"f", &mut Cursor::new(b"long content"), 12)
            .expect("add");

        let mut file = pack.create_file(b"f").expect("create");
        file.write_all(b"new").expect("write");
        drop(file);

        let mut out = Vec::new();
        pack.extract_to(b"f", &mut out).expect("extract");
        assert_eq!(out, b"new");
    }
}
