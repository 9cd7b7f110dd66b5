//! Output store – generated PDFs in one directory, addressed by bare file
//! name.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;

use crate::error::{Error, Result};

/// Reject names that could leave the output directory.
///
/// Runs before any file-system access.
pub fn check_filename(name: &str) -> Result<()> {
    if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
        log::warn!("rejected unsafe file name {name:?}");
        return Err(Error::UnsafeFilename(name.to_string()));
    }
    Ok(())
}

/// Default name for a generated manuscript: `manuscript_<unix-millis>.pdf`.
pub fn generated_filename() -> String {
    format!("manuscript_{}.pdf", Utc::now().timestamp_millis())
}

/// Attempts at a fresh generated name before giving up.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// A PDF written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct OutputStore {
    dir: PathBuf,
}

impl OutputStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        check_filename(name)?;
        Ok(self.dir.join(name))
    }

    /// Write `bytes` under `name`, creating the directory if needed, and
    /// report the size on disk.
    pub fn write(&self, name: &str, bytes: &[u8]) -> Result<StoredFile> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.dir).map_err(|e| Error::fs(&self.dir, e))?;
        fs::write(&path, bytes).map_err(|e| Error::fs(&path, e))?;
        let size = fs::metadata(&path).map_err(|e| Error::fs(&path, e))?.len();
        log::info!("wrote {} ({size} bytes)", path.display());
        Ok(StoredFile {
            filename: name.to_string(),
            path,
            size,
        })
    }

    /// Write `bytes` under a fresh generated name. A name already on disk is
    /// never overwritten: same-millisecond collisions get a `_<n>` suffix.
    pub fn write_generated(&self, bytes: &[u8]) -> Result<StoredFile> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::fs(&self.dir, e))?;
        let base = generated_filename();
        let stem = base.trim_end_matches(".pdf");
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                base.clone()
            } else {
                format!("{stem}_{attempt}.pdf")
            };
            let path = self.dir.join(&name);
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(f) => f,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(Error::fs(&path, e)),
            };
            file.write_all(bytes).map_err(|e| Error::fs(&path, e))?;
            let size = file.metadata().map_err(|e| Error::fs(&path, e))?.len();
            log::info!("wrote {} ({size} bytes)", path.display());
            return Ok(StoredFile {
                filename: name,
                path,
                size,
            });
        }
        Err(Error::Unknown(format!(
            "no free file name for {base} after {MAX_NAME_ATTEMPTS} attempts"
        )))
    }

    /// Read a stored file for download.
    pub fn open(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(Error::NotFound(name.to_string()));
        }
        fs::read(&path).map_err(|e| Error::fs(&path, e))
    }

    /// Delete stored PDFs last modified more than `retention` ago. Returns
    /// the names removed. A missing directory counts as empty.
    pub fn purge_older_than(&self, retention: Duration) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::fs(&self.dir, e)),
        };

        let mut removed = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::fs(&self.dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("pdf") {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .map_err(|e| Error::fs(&path, e))?;
            let age = modified.elapsed().unwrap_or_default();
            if age > retention {
                fs::remove_file(&path).map_err(|e| Error::fs(&path, e))?;
                removed.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        if !removed.is_empty() {
            log::info!("purged {} expired files from {}", removed.len(), self.dir.display());
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsafe_names_are_rejected() {
        for name in ["../x.pdf", "a/b.pdf", "a\\b.pdf", "..", "x..pdf", ""] {
            assert!(
                matches!(check_filename(name), Err(Error::UnsafeFilename(_))),
                "{name:?}"
            );
        }
        assert!(check_filename("manuscript_1.pdf").is_ok());
        assert!(check_filename("原稿.pdf").is_ok());
    }

    #[test]
    fn unsafe_open_never_touches_disk() {
        // The directory does not exist; a file-system access would yield a
        // different error.
        let store = OutputStore::new("/nonexistent/mforge-store");
        assert!(matches!(store.open("../etc/passwd"), Err(Error::UnsafeFilename(_))));
        assert!(matches!(store.write("a/b.pdf", b"x"), Err(Error::UnsafeFilename(_))));
    }

    #[test]
    fn write_then_open() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path().join("out"));
        let stored = store.write("a.pdf", b"%PDF-1.7").unwrap();
        assert_eq!(stored.size, 8);
        assert_eq!(store.open("a.pdf").unwrap(), b"%PDF-1.7");
        assert!(matches!(store.open("b.pdf"), Err(Error::NotFound(_))));
    }

    #[test]
    fn purge_removes_only_expired_pdfs() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        store.write("old.pdf", b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

        assert!(store.purge_older_than(Duration::from_secs(3600)).unwrap().is_empty());
        std::thread::sleep(Duration::from_millis(20));
        let removed = store.purge_older_than(Duration::ZERO).unwrap();
        assert_eq!(removed, vec!["old.pdf".to_string()]);
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn generated_names_are_safe() {
        let name = generated_filename();
        assert!(name.starts_with("manuscript_") && name.ends_with(".pdf"));
        assert!(check_filename(&name).is_ok());
    }

    #[test]
    fn generated_writes_never_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let stored: Vec<StoredFile> = (0..20)
            .map(|i| store.write_generated(format!("%PDF-{i}").as_bytes()).unwrap())
            .collect();
        let mut names: Vec<&str> = stored.iter().map(|s| s.filename.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 20);
        for (i, s) in stored.iter().enumerate() {
            assert!(check_filename(&s.filename).is_ok());
            assert_eq!(store.open(&s.filename).unwrap(), format!("%PDF-{i}").into_bytes());
        }
    }
}
