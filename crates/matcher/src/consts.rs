use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

/// Archive extensions that make a directory a comic collection (lowercase).
pub(crate) const COMIC_EXTENSIONS: [&str; 2] = ["cbz", "zip"];
/// Recognized collection cover images (compared case-insensitively).
pub(crate) const COVER_FILENAMES: [&str; 3] = ["cover.jpg", "cover.png", "cover.jpeg"];

// Trailing annotation groups (`[Digital]`, `(2019)`, `{HQ}`) and whitespace.
regex!(CLEAN_NAME_REGEX, r"((\[.+\])|(\(.+\))|(\{.+\})|\s)+$");
regex!(VOLUME_REGEX, r"(?i)(v|volume|vol)\.?\s*([0-9]+(\.[0-9])?)");
regex!(CHAPTER_REGEX, r"(?i)(c|chap|chapter)\.?\s*([0-9]+(\.[0-9])?)");
regex!(NUMBER_REGEX, r"([0-9]+(\.[0-9])?)");
