//! Page archive handling with automatic format detection.
//!
//! Comic archives are plain zip (`.cbz`) or tar (`.cbt`) files full of page
//! images. This crate provides:
//!
//! - **Format detection** from file extensions ([`ArchiveFormat::from_path`])
//!   or magic bytes ([`ArchiveFormat::from_magic_bytes`])
//! - **Extraction** behind the [`Extractor`] trait, either by shelling out to
//!   a native tool found on `PATH` ([`NativeExtractor`]) or with the bundled
//!   zip reader ([`BuiltinExtractor`]), combined by
//!   [`AutoExtractor`] which prefers the former.
//! - **Page filtering** by image extension ([`is_image`]).

pub mod error;
mod extract;
mod format;
mod image;

pub use crate::extract::{AutoExtractor, BuiltinExtractor, Extractor, ExtractorHandle, NativeExtractor, Tool};
pub use crate::image::{IMAGE_EXTENSIONS, is_image};

/// A supported archive container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// Zip container (.cbz, .zip)
    Zip,
    /// Tape archive (.cbt, .tar)
    Tar,
}
