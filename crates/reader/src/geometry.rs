use crate::error::{ErrorKind, Result};
use crate::pages::PageSource;
use exn::ResultExt;
use folio_matcher::models::{MetadataData, PageInfo, ReadingMode};
use folio_storage::join_within;
use std::path::PathBuf;

/// Pages narrower than this (width / height) read as a vertical strip.
const LONGSTRIP_RATIO: f64 = 0.6;

/// Read the dimensions of every listed page of an item.
///
/// Pages whose header can't be decoded are left out. The result is the
/// metadata fragment stored as the item's `file` source: the page list and a
/// suggested reading mode.
#[tracing::instrument(skip(source))]
pub async fn page_metadata(source: &dyn PageSource, item_id: i64) -> Result<MetadataData> {
    let listing = source.pages(item_id).await?;
    let paths = listing
        .files
        .iter()
        .filter_map(|name| join_within(&listing.root, name).ok().map(|path| (name.clone(), path)))
        .collect::<Vec<(String, PathBuf)>>();
    let pages = tokio::task::spawn_blocking(move || {
        paths
            .into_iter()
            .filter_map(|(name, path)| match image::ImageReader::open(&path).and_then(|r| r.with_guessed_format()) {
                Ok(reader) => match reader.into_dimensions() {
                    Ok((width, height)) => Some(PageInfo { name, width, height }),
                    Err(err) => {
                        tracing::debug!(page = %name, error = %err, "Skipping unreadable page");
                        None
                    },
                },
                Err(err) => {
                    tracing::debug!(page = %name, error = %err, "Skipping unreadable page");
                    None
                },
            })
            .collect::<Vec<_>>()
    })
    .await
    .or_raise(|| ErrorKind::Io("page metadata task failed".to_string()))?;
    let suggested_mode = suggest_mode(&pages);
    Ok(MetadataData { pages: Some(pages), suggested_mode: Some(suggested_mode), ..Default::default() })
}

fn suggest_mode(pages: &[PageInfo]) -> ReadingMode {
    match pages.first() {
        Some(first) if pages.len() > 1 && first.height > 0 => {
            match f64::from(first.width) / f64::from(first.height) < LONGSTRIP_RATIO {
                true => ReadingMode::Longstrip,
                false => ReadingMode::Pages,
            }
        },
        _ => ReadingMode::Pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::Pages;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Arc;

    struct Fixed(Arc<Pages>);

    #[async_trait]
    impl PageSource for Fixed {
        async fn pages(&self, _item_id: i64) -> Result<Arc<Pages>> {
            Ok(Arc::clone(&self.0))
        }
    }

    fn png(dir: &Path, name: &str, width: u32, height: u32) -> String {
        image::RgbImage::new(width, height).save(dir.join(name)).unwrap();
        name.to_string()
    }

    fn page(width: u32, height: u32) -> PageInfo {
        PageInfo { name: String::new(), width, height }
    }

    #[tokio::test]
    async fn test_reads_dimensions_and_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = vec![png(dir.path(), "01.png", 80, 120), png(dir.path(), "02.png", 160, 120)];
        std::fs::write(dir.path().join("03.png"), b"not an image").unwrap();
        files.push("03.png".to_string());
        let source = Fixed(Arc::new(Pages { root: dir.path().to_path_buf(), files }));

        let data = page_metadata(&source, 1).await.unwrap();
        let pages = data.pages.unwrap();
        assert_eq!(pages, vec![
            PageInfo { name: "01.png".to_string(), width: 80, height: 120 },
            PageInfo { name: "02.png".to_string(), width: 160, height: 120 },
        ]);
        assert_eq!(data.suggested_mode, Some(ReadingMode::Pages));
    }

    #[test]
    fn test_suggest_mode() {
        assert_eq!(suggest_mode(&[]), ReadingMode::Pages);
        // A single tall page is just a tall page.
        assert_eq!(suggest_mode(&[page(100, 1000)]), ReadingMode::Pages);
        assert_eq!(suggest_mode(&[page(100, 1000), page(100, 1000)]), ReadingMode::Longstrip);
        assert_eq!(suggest_mode(&[page(60, 100), page(100, 1000)]), ReadingMode::Pages);
        assert_eq!(suggest_mode(&[page(59, 100), page(100, 100)]), ReadingMode::Longstrip);
    }
}
