use crate::error::{ErrorKind, Result};
use crate::extract::{Extractor, detect, open_error};
use crate::{ArchiveFormat, is_image};
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::{File, create_dir_all};
use std::io::BufReader;
use std::path::Path;
use tracing::instrument;
use zip::ZipArchive;

/// Pure-Rust zip extraction for hosts without native tools.
///
/// Entries are located through the central directory, so archives written by
/// streaming tools (sizes deferred to a data descriptor) extract like any
/// other. Only page images are written out; every other entry, and any entry
/// whose name would land outside the destination, is skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinExtractor;

impl BuiltinExtractor {
    /// Returns the number of files written.
    #[instrument(skip_all, fields(archive = %archive.display()))]
    pub(crate) async fn extract_format(&self, format: ArchiveFormat, archive: &Path, dest: &Path) -> Result<usize> {
        if format != ArchiveFormat::Zip {
            exn::bail!(ErrorKind::UnsupportedFormat(format.to_string()));
        }
        let archive = archive.to_path_buf();
        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || extract_zip(&archive, &dest)).await.or_raise(|| ErrorKind::Io)?
    }
}

#[async_trait]
impl Extractor for BuiltinExtractor {
    fn name(&self) -> &str {
        "builtin"
    }

    async fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        let format = detect(archive).await?;
        self.extract_format(format, archive, dest).await.map(|_| ())
    }
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive).map_err(|e| open_error(e, archive))?;
    let mut zip = ZipArchive::new(BufReader::new(file)).or_raise(|| ErrorKind::InvalidArchive)?;
    let mut written = 0;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).or_raise(|| ErrorKind::InvalidArchive)?;
        if entry.is_dir() {
            continue;
        }
        let Some(name) = entry.enclosed_name() else {
            tracing::warn!(archive = %archive.display(), entry = entry.name(), "Skipping archive entry outside of extraction directory");
            continue;
        };
        if !is_image(&name) {
            continue;
        }
        let target = dest.join(&name);
        if let Some(parent) = target.parent() {
            create_dir_all(parent).or_raise(|| ErrorKind::Io)?;
        }
        let mut output = File::create(&target).or_raise(|| ErrorKind::Io)?;
        std::io::copy(&mut entry, &mut output).or_raise(|| ErrorKind::InvalidArchive)?;
        written += 1;
    }
    tracing::debug!(archive = %archive.display(), written, "Builtin extraction complete");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::tests::write_zip;

    /// Rewrite every entry of a stored zip the way streaming writers leave
    /// it: general purpose flag bit 3 set and the local header's CRC and
    /// sizes zeroed, with the real values only in the central directory.
    fn defer_sizes(path: &Path) {
        let mut bytes = std::fs::read(path).unwrap();
        let mut offset = 0;
        while offset + 4 <= bytes.len() {
            match &bytes[offset..offset + 4] {
                b"PK\x03\x04" => {
                    bytes[offset + 6] |= 0x08;
                    bytes[offset + 14..offset + 26].fill(0);
                },
                b"PK\x01\x02" => bytes[offset + 8] |= 0x08,
                _ => {},
            }
            offset += 1;
        }
        std::fs::write(path, bytes).unwrap();
    }

    #[tokio::test]
    async fn test_extracts_images_only() {
        let temp_dir = tempfile::tempdir().unwrap();
        let archive = temp_dir.path().join("ch1.cbz");
        write_zip(
            &archive,
            &[("001.jpg", b"one"), ("ComicInfo.xml", b"<xml/>"), ("sub/002.png", b"two")],
        );
        let dest = temp_dir.path().join("out");
        std::fs::create_dir(&dest).unwrap();
        let written = BuiltinExtractor.extract_format(ArchiveFormat::Zip, &archive, &dest).await.unwrap();
        assert_eq!(written, 2);
        assert!(dest.join("001.jpg").exists());
        assert!(dest.join("sub/002.png").exists());
        assert!(!dest.join("ComicInfo.xml").exists());
    }

    #[tokio::test]
    async fn test_data_descriptor_entries() {
        let temp_dir = tempfile::tempdir().unwrap();
        let archive = temp_dir.path().join("streamed.cbz");
        write_zip(&archive, &[("001.jpg", b"one"), ("002.jpg", b"two")]);
        defer_sizes(&archive);
        let mut reader = BufReader::new(File::open(&archive).unwrap());
        assert!(zip::read::read_zipfile_from_stream(&mut reader).is_err());

        let dest = temp_dir.path().join("out");
        std::fs::create_dir(&dest).unwrap();
        let written = BuiltinExtractor.extract_format(ArchiveFormat::Zip, &archive, &dest).await.unwrap();
        assert_eq!(written, 2);
        assert_eq!(std::fs::read(dest.join("001.jpg")).unwrap(), b"one");
        assert_eq!(std::fs::read(dest.join("002.jpg")).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_skips_escaping_entries() {
        let temp_dir = tempfile::tempdir().unwrap();
        let archive = temp_dir.path().join("evil.cbz");
        write_zip(&archive, &[("../escaped.jpg", b"bad"), ("001.jpg", b"ok")]);
        let dest = temp_dir.path().join("out");
        std::fs::create_dir(&dest).unwrap();
        let written = BuiltinExtractor.extract_format(ArchiveFormat::Zip, &archive, &dest).await.unwrap();
        assert_eq!(written, 1);
        assert!(!temp_dir.path().join("escaped.jpg").exists());
    }

    #[tokio::test]
    async fn test_corrupt_archive() {
        let temp_dir = tempfile::tempdir().unwrap();
        let archive = temp_dir.path().join("broken.cbz");
        let mut bytes = b"PK\x03\x04".to_vec();
        bytes.extend_from_slice(&[0xFF; 12]);
        std::fs::write(&archive, bytes).unwrap();
        let err = BuiltinExtractor.extract(&archive, temp_dir.path()).await.unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidArchive);
    }

    #[tokio::test]
    async fn test_tar_unsupported() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = BuiltinExtractor
            .extract_format(ArchiveFormat::Tar, &temp_dir.path().join("ch1.cbt"), temp_dir.path())
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }
}
