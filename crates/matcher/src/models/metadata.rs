use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// One named, independently refreshed metadata fragment.
///
/// An entity carries any number of these (page geometry read from the
/// archive, a remote catalog lookup, ...). They are folded into a single
/// effective [`MetadataData`] by the merger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataSource {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    /// Administrator pinned remote identifier; wins over `remote_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_remote_id: Option<String>,
    /// Unix timestamp (seconds) of the last refresh attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    #[serde(default)]
    pub data: MetadataData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SourceError>,
}
impl MetadataSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }
}

/// Find the source called `name`, appending an empty one if there is none.
pub fn source_mut<'a>(sources: &'a mut Vec<MetadataSource>, name: &str) -> &'a mut MetadataSource {
    let index = match sources.iter().position(|s| s.name == name) {
        Some(index) => index,
        None => {
            sources.push(MetadataSource::new(name));
            sources.len() - 1
        },
    };
    &mut sources[index]
}

/// The last failure recorded against a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceError {
    pub name: String,
    pub message: String,
}
impl SourceError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), message: message.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_status: Option<PubStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_year: Option<i32>,
    /// Alternate titles.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub titles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<PageInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_mode: Option<ReadingMode>,
}

/// Publication status as reported by a remote catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PubStatus {
    Ongoing,
    Completed,
    Hiatus,
    Cancelled,
}
impl PubStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PubStatus::Ongoing => "ongoing",
            PubStatus::Completed => "completed",
            PubStatus::Hiatus => "hiatus",
            PubStatus::Cancelled => "cancelled",
        }
    }
}
impl FromStr for PubStatus {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "ongoing" => Self::Ongoing,
            "completed" | "complete" => Self::Completed,
            "hiatus" => Self::Hiatus,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => exn::bail!(ErrorKind::ParseError {
                field: "pub_status",
                value: s.to_string(),
            }),
        })
    }
}
impl Display for PubStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// How a reader should present an item's pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingMode {
    /// One page at a time.
    Pages,
    /// Pages stitched into a single vertical strip (webtoons).
    Longstrip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_mut_appends_once() {
        let mut sources = vec![MetadataSource::new("file")];
        source_mut(&mut sources, "remote").remote_id = Some("abc".to_string());
        source_mut(&mut sources, "remote").updated_at = Some(1);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[1].remote_id.as_deref(), Some("abc"));
        assert_eq!(sources[1].updated_at, Some(1));
    }

    #[test]
    fn test_json_shape() {
        let mut source = MetadataSource::new("remote");
        source.data.authors = vec!["X".to_string()];
        source.data.pub_status = Some(PubStatus::Ongoing);
        source.error = Some(SourceError::new("ProviderError", "timed out"));
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "remote",
                "data": {"authors": ["X"], "pub_status": "ongoing"},
                "error": {"name": "ProviderError", "message": "timed out"},
            })
        );
        let back: MetadataSource = serde_json::from_value(json).unwrap();
        assert_eq!(back, source);
    }

    #[test]
    fn test_pub_status_parse() {
        assert_eq!("Completed".parse::<PubStatus>().unwrap(), PubStatus::Completed);
        assert_eq!("canceled".parse::<PubStatus>().unwrap(), PubStatus::Cancelled);
        assert!("abandoned".parse::<PubStatus>().is_err());
    }
}
