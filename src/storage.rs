//! Alias Storage Module
//!
//! Maps a short alias to the two files that hold a certificate/private key
//! pair inside a single flat directory:
//!
//! ```text
//! <dir>/<alias>.pem   certificate, mode 0640
//! <dir>/<alias>.key   RSA private key, mode 0400
//! ```
//!
//! Nothing here knows about PEM or X.509; see [`crate::pair_store`] for that.
//! The directory is shared mutable state with no locking: two processes
//! writing the same alias at once can interleave their writes.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{PkiError, Result};

/// Which half of a pair a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Certificate,
    PrivateKey,
}

impl FileKind {
    pub const ALL: [FileKind; 2] = [FileKind::Certificate, FileKind::PrivateKey];

    /// File name suffix, without the dot.
    pub fn suffix(self) -> &'static str {
        match self {
            FileKind::Certificate => "pem",
            FileKind::PrivateKey => "key",
        }
    }

    /// Unix permission bits applied on every write.
    pub fn mode(self) -> u32 {
        match self {
            FileKind::Certificate => 0o640,
            FileKind::PrivateKey => 0o400,
        }
    }

    fn strip_suffix(file_name: &str) -> Option<&str> {
        Self::ALL.iter().find_map(|kind| {
            file_name
                .strip_suffix(kind.suffix())
                .and_then(|stem| stem.strip_suffix('.'))
        })
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Certificate => f.write_str("certificate"),
            FileKind::PrivateKey => f.write_str("private key"),
        }
    }
}

/// Filesystem directory holding alias pairs.
#[derive(Debug, Clone)]
pub struct AliasStorage {
    dir: PathBuf,
}

impl AliasStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of one file of an alias. Pure, no I/O.
    pub fn path_for(&self, alias: &str, kind: FileKind) -> PathBuf {
        self.dir.join(format!("{}.{}", alias, kind.suffix()))
    }

    /// Whether one file of an alias exists.
    ///
    /// Only a genuine not-found answers `Ok(false)`. Any other stat failure
    /// (permission denied on the directory, for instance) is returned as an
    /// error instead of being guessed either way.
    pub fn exists(&self, alias: &str, kind: FileKind) -> Result<bool> {
        let path = self.path_for(alias, kind);
        match fs::metadata(&path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PkiError::io(path, e)),
        }
    }

    /// True when either file of the alias is present.
    pub fn alias_taken(&self, alias: &str) -> Result<bool> {
        for kind in FileKind::ALL {
            if self.exists(alias, kind)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Remove both files of an alias.
    ///
    /// Missing files are fine, so deleting twice succeeds twice. Any other
    /// failure is returned immediately, which can leave the certificate
    /// behind after the key is already gone.
    pub fn delete(&self, alias: &str) -> Result<()> {
        let mut removed = 0;
        for kind in [FileKind::PrivateKey, FileKind::Certificate] {
            let path = self.path_for(alias, kind);
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(alias, %kind, path = %path.display(), "removed");
                    removed += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    if removed > 0 {
                        warn!(alias, "alias left half-deleted");
                    }
                    return Err(PkiError::io(path, e));
                }
            }
        }
        info!(alias, files = removed, "alias deleted");
        Ok(())
    }

    /// Every alias with at least one file in the directory, deduplicated.
    pub fn list_aliases(&self) -> Result<BTreeSet<String>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| PkiError::io(&self.dir, e))?;
        let mut aliases = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| PkiError::io(&self.dir, e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| PkiError::io(entry.path(), e))?;
            if file_type.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if let Some(alias) = FileKind::strip_suffix(name).filter(|a| !a.is_empty()) {
                    aliases.insert(alias.to_string());
                }
            }
        }
        Ok(aliases)
    }

    /// Create one file of an alias.
    ///
    /// Never overwrites: an existing file fails with an I/O error. The kind's
    /// mode is set when the file is created and set again once it is written
    /// so the process umask cannot widen or narrow it.
    pub(crate) fn write(&self, alias: &str, kind: FileKind, contents: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(alias, kind);
        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(kind.mode());
        }
        let mut file = options.open(&path).map_err(|e| PkiError::io(&path, e))?;
        file.write_all(contents)
            .and_then(|()| file.sync_all())
            .map_err(|e| PkiError::io(&path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(kind.mode()))
                .map_err(|e| PkiError::io(&path, e))?;
        }
        debug!(alias, %kind, path = %path.display(), "written");
        Ok(path)
    }

    /// Read one file of an alias; returns the path alongside for error reporting.
    pub(crate) fn read(&self, alias: &str, kind: FileKind) -> Result<(PathBuf, Vec<u8>)> {
        let path = self.path_for(alias, kind);
        match fs::read(&path) {
            Ok(data) => Ok((path, data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(PkiError::NotFound {
                alias: alias.to_string(),
                kind,
                path,
            }),
            Err(e) => Err(PkiError::io(path, e)),
        }
    }
}
