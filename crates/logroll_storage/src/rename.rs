//! Rename capability.

use std::fmt;
use std::io;
use std::path::Path;

/// Moves a file from one path to another.
///
/// The rotating writer renames the live file out of the way on every
/// rotation. Expressing that step as a trait lets tests substitute a
/// failing or slow implementation without touching the filesystem.
///
/// # Invariants
///
/// - On success, `from` no longer exists and `to` holds its contents
/// - On failure, `from` is left in place
/// - Implementations must be `Send + Sync`; one renamer is shared by every
///   segment of a writer
pub trait Renamer: Send + Sync + fmt::Debug {
    /// Renames `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the rename cannot be performed.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// Renames using [`std::fs::rename`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FsRenamer;

impl Renamer for FsRenamer {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn fs_renamer_moves_file() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("a.log");
        let to = dir.path().join("a.log.1");
        std::fs::write(&from, b"data").unwrap();

        FsRenamer.rename(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"data");
    }

    #[test]
    fn fs_renamer_missing_source() {
        let dir = tempdir().unwrap();
        let err = FsRenamer
            .rename(&dir.path().join("missing"), &dir.path().join("x"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn renamer_is_object_safe() {
        let renamer: Box<dyn Renamer> = Box::new(FsRenamer);
        assert!(format!("{renamer:?}").contains("FsRenamer"));
    }
}
