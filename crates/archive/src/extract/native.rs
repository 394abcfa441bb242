use crate::ArchiveFormat;
use crate::error::{ErrorKind, Result};
use crate::extract::{Extractor, detect};
use async_trait::async_trait;
use exn::ResultExt;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::instrument;

/// An archive tool installed on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tool {
    /// Info-ZIP `unzip`.
    Unzip(PathBuf),
    /// libarchive's `bsdtar`, which reads zip as well as tar.
    Bsdtar(PathBuf),
    /// The system `tar`. On Windows this *is* bsdtar.
    Tar(PathBuf),
}
impl Tool {
    /// Every supported tool found on `PATH`, in order of preference.
    pub fn discover() -> Vec<Self> {
        let mut tools = Vec::new();
        if let Ok(path) = which::which("unzip") {
            tools.push(Self::Unzip(path));
        }
        if let Ok(path) = which::which("bsdtar") {
            tools.push(Self::Bsdtar(path));
        }
        if let Ok(path) = which::which("tar") {
            tools.push(Self::Tar(path));
        }
        match tools.is_empty() {
            true => tracing::info!("No native archive tools found in PATH; using builtin extraction"),
            false => tracing::debug!(tools = ?tools, "Discovered native archive tools"),
        }
        tools
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unzip(_) => "unzip",
            Self::Bsdtar(_) => "bsdtar",
            Self::Tar(_) => "tar",
        }
    }

    fn program(&self) -> &Path {
        match self {
            Self::Unzip(path) | Self::Bsdtar(path) | Self::Tar(path) => path,
        }
    }

    pub fn supports(&self, format: ArchiveFormat) -> bool {
        match self {
            Self::Unzip(_) => format == ArchiveFormat::Zip,
            Self::Bsdtar(_) => true,
            Self::Tar(_) => format == ArchiveFormat::Tar || cfg!(windows),
        }
    }

    fn args(&self, archive: &Path, dest: &Path) -> Vec<OsString> {
        match self {
            // Quiet, overwrite without prompting.
            Self::Unzip(_) => vec!["-qq".into(), "-o".into(), archive.into(), "-d".into(), dest.into()],
            Self::Bsdtar(_) | Self::Tar(_) => vec!["-xf".into(), archive.into(), "-C".into(), dest.into()],
        }
    }

    fn is_success(&self, code: i32) -> bool {
        match self {
            // 1 means warnings only; every file was still processed.
            Self::Unzip(_) => code == 0 || code == 1,
            Self::Bsdtar(_) | Self::Tar(_) => code == 0,
        }
    }
}

/// Extract by spawning a native tool.
pub struct NativeExtractor {
    tools: Vec<Tool>,
}
impl NativeExtractor {
    /// `None` when no supported tool is installed.
    pub fn discover() -> Option<Self> {
        let tools = Tool::discover();
        (!tools.is_empty()).then_some(Self { tools })
    }

    pub fn with_tools(tools: Vec<Tool>) -> Self {
        Self { tools }
    }

    pub fn supports(&self, format: ArchiveFormat) -> bool {
        self.tools.iter().any(|tool| tool.supports(format))
    }

    #[instrument(skip_all, fields(archive = %archive.display(), format = %format))]
    pub(crate) async fn extract_format(&self, format: ArchiveFormat, archive: &Path, dest: &Path) -> Result<()> {
        let Some(tool) = self.tools.iter().find(|tool| tool.supports(format)) else {
            exn::bail!(ErrorKind::UnsupportedFormat(format.to_string()));
        };
        let output = Command::new(tool.program())
            .args(tool.args(archive, dest))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .or_raise(|| ErrorKind::Io)?;
        match output.status.code() {
            Some(code) if tool.is_success(code) => Ok(()),
            Some(code) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                tracing::warn!(tool = tool.name(), code, stderr = %stderr.trim(), "Native extraction failed");
                exn::bail!(ErrorKind::ToolFailed(tool.name().to_string(), code))
            },
            None => exn::bail!(ErrorKind::ToolKilled(tool.name().to_string())),
        }
    }
}

#[async_trait]
impl Extractor for NativeExtractor {
    fn name(&self) -> &str {
        self.tools.first().map(Tool::name).unwrap_or("native")
    }

    async fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        let format = detect(archive).await?;
        self.extract_format(format, archive, dest).await
    }
}
