use crate::ArchiveFormat;
use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::{path::Path, str::FromStr};

const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
// Empty archives only carry the end-of-central-directory record.
const ZIP_EMPTY_MAGIC: [u8; 4] = [0x50, 0x4B, 0x05, 0x06];
const TAR_MAGIC_OFFSET: usize = 257;
const TAR_MAGIC: &[u8] = b"ustar";

/// Enough of the file header to tell every supported format apart.
pub const SNIFF_LENGTH: usize = TAR_MAGIC_OFFSET + TAR_MAGIC.len();

impl Display for ArchiveFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ArchiveFormat {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zip" | "cbz" => Ok(ArchiveFormat::Zip),
            "tar" | "cbt" => Ok(ArchiveFormat::Tar),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(s.to_string())),
        }
    }
}

impl ArchiveFormat {
    /// Returns the short name (for displaying to user).
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
        }
    }

    /// Detect the format from a file extension.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }

    /// Detect the format from the first bytes of a file. Tar detection needs
    /// at least [`SNIFF_LENGTH`] bytes.
    #[must_use]
    pub fn from_magic_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&ZIP_MAGIC) || bytes.starts_with(&ZIP_EMPTY_MAGIC) {
            return Some(ArchiveFormat::Zip);
        }
        if bytes.get(TAR_MAGIC_OFFSET..SNIFF_LENGTH) == Some(TAR_MAGIC) {
            return Some(ArchiveFormat::Tar);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::ArchiveFormat;
    use rstest::rstest;

    #[rstest]
    #[case("Series/ch1.cbz", Some(ArchiveFormat::Zip))]
    #[case("Series/ch1.CBZ", Some(ArchiveFormat::Zip))]
    #[case("Series/ch1.zip", Some(ArchiveFormat::Zip))]
    #[case("Series/ch1.cbt", Some(ArchiveFormat::Tar))]
    #[case("Series/ch1.cbr", None)]
    #[case("Series/cover.jpg", None)]
    #[case("Series/noextension", None)]
    fn test_from_path(#[case] path: &str, #[case] expected: Option<ArchiveFormat>) {
        assert_eq!(ArchiveFormat::from_path(path), expected);
    }

    #[test]
    fn test_from_magic_bytes() {
        assert_eq!(ArchiveFormat::from_magic_bytes(b"PK\x03\x04rest"), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::from_magic_bytes(b"PK\x05\x06"), Some(ArchiveFormat::Zip));
        let mut tar = vec![0u8; 512];
        tar[257..262].copy_from_slice(b"ustar");
        assert_eq!(ArchiveFormat::from_magic_bytes(&tar), Some(ArchiveFormat::Tar));
        assert_eq!(ArchiveFormat::from_magic_bytes(b"Rar!\x1a\x07"), None);
        assert_eq!(ArchiveFormat::from_magic_bytes(b""), None);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("CBZ".parse::<ArchiveFormat>().unwrap(), ArchiveFormat::Zip);
        assert!("rar".parse::<ArchiveFormat>().is_err());
    }
}
