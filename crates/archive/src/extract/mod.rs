//! Archive extraction into a working directory.

mod builtin;
mod native;

pub use self::builtin::BuiltinExtractor;
pub use self::native::{NativeExtractor, Tool};
use crate::ArchiveFormat;
use crate::error::{Error, ErrorKind, Result};
use crate::format::SNIFF_LENGTH;
use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

pub type ExtractorHandle = Arc<dyn Extractor + Send + Sync>;

/// Unpacks one archive into an existing, empty directory.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Name used in log output.
    fn name(&self) -> &str;

    /// Extract `archive` into `dest`. On failure `dest` may be left partially
    /// populated; cleaning it up is the caller's job.
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;
}

/// Prefers a native tool when one that understands the archive is installed,
/// and falls back to the bundled zip reader otherwise.
pub struct AutoExtractor {
    native: Option<NativeExtractor>,
    builtin: BuiltinExtractor,
}
impl AutoExtractor {
    /// Look for native tools on `PATH` once, up front.
    pub fn discover() -> Self {
        Self { native: NativeExtractor::discover(), builtin: BuiltinExtractor }
    }

    /// Never shell out.
    pub fn builtin_only() -> Self {
        Self { native: None, builtin: BuiltinExtractor }
    }
}

#[async_trait]
impl Extractor for AutoExtractor {
    fn name(&self) -> &str {
        match &self.native {
            Some(native) => native.name(),
            None => self.builtin.name(),
        }
    }

    async fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        let format = detect(archive).await?;
        if let Some(native) = &self.native
            && native.supports(format)
        {
            return native.extract_format(format, archive, dest).await;
        }
        self.builtin.extract_format(format, archive, dest).await.map(|_| ())
    }
}

/// Work out the archive format from its extension, falling back to sniffing
/// the header for files with an unfamiliar (or no) extension.
pub(crate) async fn detect(archive: &Path) -> Result<ArchiveFormat> {
    if let Some(format) = ArchiveFormat::from_path(archive) {
        return Ok(format);
    }
    let file = tokio::fs::File::open(archive).await.map_err(|e| open_error(e, archive))?;
    let mut head = Vec::with_capacity(SNIFF_LENGTH);
    file.take(SNIFF_LENGTH as u64).read_to_end(&mut head).await.or_raise(|| ErrorKind::Io)?;
    ArchiveFormat::from_magic_bytes(&head)
        .ok_or_raise(|| ErrorKind::UnsupportedFormat(archive.display().to_string()))
}

pub(crate) fn open_error(err: std::io::Error, path: &Path) -> Error {
    let kind = match err.kind() {
        std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
        _ => ErrorKind::Io,
    };
    exn::Exn::from(err).raise(kind)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    /// Build a stored (uncompressed) zip with the given entries.
    pub(crate) fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, data) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    #[tokio::test]
    async fn test_detect_by_extension_and_magic() {
        let temp_dir = tempfile::tempdir().unwrap();
        let named = temp_dir.path().join("ch1.cbz");
        write_zip(&named, &[("001.jpg", b"jpg")]);
        assert_eq!(detect(&named).await.unwrap(), ArchiveFormat::Zip);
        // Same bytes, misleading name.
        let unnamed = temp_dir.path().join("ch1.bin");
        std::fs::copy(&named, &unnamed).unwrap();
        assert_eq!(detect(&unnamed).await.unwrap(), ArchiveFormat::Zip);
    }

    #[tokio::test]
    async fn test_detect_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = detect(&temp_dir.path().join("missing.bin")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_detect_unknown_contents() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("notes.bin");
        std::fs::write(&path, b"definitely not an archive").unwrap();
        let err = detect(&path).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_builtin_only_extracts_zip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let archive = temp_dir.path().join("ch1.cbz");
        write_zip(&archive, &[("001.jpg", b"one"), ("002.png", b"two")]);
        let dest = temp_dir.path().join("out");
        std::fs::create_dir(&dest).unwrap();
        let extractor = AutoExtractor::builtin_only();
        extractor.extract(&archive, &dest).await.unwrap();
        assert_eq!(std::fs::read(dest.join("002.png")).unwrap(), b"two");
    }
}
