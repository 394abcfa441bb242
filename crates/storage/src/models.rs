//! Directory listing models.

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
}

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Base name of the entry, as it appears in the directory.
    pub name: String,
    /// Full path (the listed directory joined with `name`).
    pub path: PathBuf,
    pub kind: EntryKind,
}
impl Entry {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(path, EntryKind::File)
    }

    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self::new(path, EntryKind::Directory)
    }

    fn new(path: impl Into<PathBuf>, kind: EntryKind) -> Self {
        let path = path.into();
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        Self { name, path, kind }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_name_from_path() {
        let entry = Entry::file("/library/Series/ch1.cbz");
        assert_eq!(entry.name, "ch1.cbz");
        assert!(entry.is_file());
        assert!(!Entry::directory("/library/Series").is_file());
    }
}
