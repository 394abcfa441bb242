use std::path::Path;

/// File extensions (lowercase, without the dot) treated as page images.
pub const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "webp", "gif", "avif"];

/// Whether a path looks like a page image, judging by its extension.
#[must_use]
pub fn is_image(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("001.jpg", true)]
    #[case("pages/002.PNG", true)]
    #[case("003.jpeg", true)]
    #[case("004.webp", true)]
    #[case("ComicInfo.xml", false)]
    #[case("Thumbs.db", false)]
    #[case("jpg", false)]
    fn test_is_image(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_image(path), expected);
    }
}
