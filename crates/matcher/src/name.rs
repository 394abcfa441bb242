//! Name heuristics shared by every content family.
//!
//! Directory and file names are the only identity a library has, so these
//! functions turn them into stable content URIs and `[volume, chapter]` sort
//! keys. The patterns are deliberately loose (`c5`, `Ch.5` and `chapter 5`
//! are all chapter five) and must stay stable across releases: changing
//! them changes every content URI in an existing catalog.

use crate::consts::{CHAPTER_REGEX, CLEAN_NAME_REGEX, NUMBER_REGEX, VOLUME_REGEX};
use crate::models::SortKey;
use regex::Regex;
use rslug::slugify;
use std::fmt::Write;

/// Separates a collection's content URI from an item's key.
pub const URI_SEPARATOR: char = ':';

/// Strip trailing annotation groups and whitespace.
///
/// ```
/// use folio_matcher::clean_name;
/// assert_eq!(clean_name("Example Vol. 2 (Group)"), "Example Vol. 2");
/// assert_eq!(clean_name("Foo [Digital] {HQ} "), "Foo");
/// // Only trailing groups are removed.
/// assert_eq!(clean_name("[Group] Foo"), "[Group] Foo");
/// ```
pub fn clean_name(name: &str) -> String {
    CLEAN_NAME_REGEX.replace_all(name, "").trim().to_string()
}

/// Lowercase URL-safe slug of an already cleaned name.
pub fn slug(name: &str) -> String {
    slugify!(&name.to_lowercase())
}

/// Content URI of a collection directory's base name.
///
/// Returns `None` when nothing slug-worthy is left after cleaning (a
/// directory named `[Scans]`, for example).
pub fn collection_uri(dir_name: &str) -> Option<String> {
    let slug = slug(&clean_name(dir_name));
    (!slug.is_empty()).then_some(slug)
}

/// Content URI of an item within a collection.
pub fn item_uri(collection_uri: &str, key: &str) -> String {
    format!("{collection_uri}{URI_SEPARATOR}{key}")
}

/// Strip the last segment from a content URI: the parent collection's URI
/// for an item, `None` for a URI without any namespace.
///
/// ```
/// use folio_matcher::parent_uri;
/// assert_eq!(parent_uri("example-vol-2:c1"), Some("example-vol-2"));
/// assert_eq!(parent_uri("example-vol-2"), None);
/// ```
pub fn parent_uri(uri: &str) -> Option<&str> {
    uri.rsplit_once(URI_SEPARATOR).map(|(parent, _)| parent)
}

/// Volume and chapter numbers recovered from a name.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NameData {
    pub volume: Option<f64>,
    pub chapter: Option<f64>,
}
impl NameData {
    /// Apply the volume pattern, then the chapter pattern; when neither
    /// matched, the first bare number in the name is taken as the chapter.
    pub fn parse(name: &str) -> Self {
        let volume = capture_number(&VOLUME_REGEX, name, 2);
        let mut chapter = capture_number(&CHAPTER_REGEX, name, 2);
        if chapter.is_none() && volume.is_none() {
            chapter = capture_number(&NUMBER_REGEX, name, 1);
        }
        Self { volume, chapter }
    }

    pub fn is_empty(&self) -> bool {
        self.volume.is_none() && self.chapter.is_none()
    }

    /// Item key used as the last content URI segment: `v2`, `c1` or `v2-c1`.
    pub fn key(&self) -> Option<String> {
        match (self.volume, self.chapter) {
            (Some(v), Some(c)) => Some(format!("v{v}-c{c}")),
            (Some(v), None) => Some(format!("v{v}")),
            (None, Some(c)) => Some(format!("c{c}")),
            (None, None) => None,
        }
    }

    /// `Volume 2`, `Chapter 1.5` or `Volume 2, Chapter 1`.
    pub fn display_name(&self) -> Option<String> {
        let mut name = String::new();
        if let Some(v) = self.volume {
            _ = write!(name, "Volume {v}");
        }
        if let Some(c) = self.chapter {
            if !name.is_empty() {
                name.push_str(", ");
            }
            _ = write!(name, "Chapter {c}");
        }
        (!name.is_empty()).then_some(name)
    }

    pub fn sort_key(&self) -> SortKey {
        SortKey::new(self.volume, self.chapter)
    }
}

fn capture_number(regex: &Regex, name: &str, group: usize) -> Option<f64> {
    regex.captures(name)?.get(group)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Foo [Digital]", "Foo [Scan]")]
    #[case("Foo (2019)", "Foo (Viz) [HQ]")]
    #[case("Foo {v2}", "Foo   ")]
    #[case("Example Vol. 2 (Group)", "Example Vol. 2 [Other Group]")]
    fn test_annotation_suffix_does_not_change_uri(#[case] a: &str, #[case] b: &str) {
        assert_eq!(collection_uri(a), collection_uri(b));
    }

    #[rstest]
    #[case("Example Vol. 2 (Group)", Some("example-vol-2"))]
    #[case("Foo [Digital]", Some("foo"))]
    #[case("One Piece", Some("one-piece"))]
    #[case("[Scans]", None)]
    fn test_collection_uri(#[case] dir: &str, #[case] expected: Option<&str>) {
        assert_eq!(collection_uri(dir).as_deref(), expected);
    }

    #[rstest]
    #[case("ch1", None, Some(1.0))]
    #[case("Chapter 12", None, Some(12.0))]
    #[case("c005", None, Some(5.0))]
    #[case("Vol. 3", Some(3.0), None)]
    #[case("v02", Some(2.0), None)]
    #[case("Series v01 c05", Some(1.0), Some(5.0))]
    #[case("Volume 2, Chapter 1.5", Some(2.0), Some(1.5))]
    // Bare numbers only count when nothing else matched.
    #[case("042", None, Some(42.0))]
    #[case("Series v3 extra 9", Some(3.0), None)]
    #[case("Extras", None, None)]
    fn test_parse(#[case] name: &str, #[case] volume: Option<f64>, #[case] chapter: Option<f64>) {
        assert_eq!(NameData::parse(name), NameData { volume, chapter });
    }

    #[rstest]
    #[case("ch1", [1_000_000.0, 1.0])]
    #[case("Chapter 7.5", [1_000_000.0, 7.5])]
    #[case("Vol. 4", [4.0, 0.0])]
    #[case("v2 c3", [2.0, 3.0])]
    fn test_sort_key(#[case] name: &str, #[case] expected: [f64; 2]) {
        let key = NameData::parse(name).sort_key();
        assert_eq!([key.volume, key.chapter], expected);
    }

    #[rstest]
    #[case(Some(2.0), None, "v2", "Volume 2")]
    #[case(None, Some(1.5), "c1.5", "Chapter 1.5")]
    #[case(Some(1.0), Some(10.0), "v1-c10", "Volume 1, Chapter 10")]
    fn test_key_and_display(
        #[case] volume: Option<f64>,
        #[case] chapter: Option<f64>,
        #[case] key: &str,
        #[case] display: &str,
    ) {
        let data = NameData { volume, chapter };
        assert_eq!(data.key().as_deref(), Some(key));
        assert_eq!(data.display_name().as_deref(), Some(display));
    }

    #[test]
    fn test_display_name_round_trips_through_parse() {
        // The update hook re-derives sort keys from display names.
        let data = NameData::parse("Series v01 c05");
        let again = NameData::parse(&data.display_name().unwrap());
        assert_eq!(data, again);
    }

    #[test]
    fn test_empty() {
        let data = NameData::parse("Omake");
        assert!(data.is_empty());
        assert_eq!(data.key(), None);
        assert_eq!(data.display_name(), None);
    }

    #[test]
    fn test_uri_helpers() {
        let uri = item_uri("example-vol-2", "c1");
        assert_eq!(uri, "example-vol-2:c1");
        assert_eq!(parent_uri(&uri), Some("example-vol-2"));
    }
}
