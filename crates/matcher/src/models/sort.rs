use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// `[volume, chapter]` ordering key for the items of one collection.
///
/// Items without a volume sort after every volumed item; items without a
/// chapter count as chapter zero. Compared lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    pub volume: f64,
    pub chapter: f64,
}
impl SortKey {
    pub const NO_VOLUME: f64 = 1_000_000.0;
    pub const NO_CHAPTER: f64 = 0.0;

    pub fn new(volume: Option<f64>, chapter: Option<f64>) -> Self {
        Self {
            volume: volume.unwrap_or(Self::NO_VOLUME),
            chapter: chapter.unwrap_or(Self::NO_CHAPTER),
        }
    }
}
impl Default for SortKey {
    fn default() -> Self {
        Self::new(None, None)
    }
}
impl Eq for SortKey {}
impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.volume.total_cmp(&other.volume).then(self.chapter.total_cmp(&other.chapter))
    }
}
impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Display for SortKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "[{}, {}]", self.volume, self.chapter)
    }
}
