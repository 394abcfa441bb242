use folio_matcher::models::{MetadataData, MetadataSource};

/// Fold metadata sources into the effective metadata of an entity.
///
/// Sources are consulted in order: the first source carrying a scalar field
/// wins it. Authors are unioned, ignoring case but keeping the first spelling
/// seen; alternate titles are unioned exactly.
pub fn merge_metadata(sources: &[MetadataSource]) -> MetadataData {
    let mut merged = MetadataData::default();
    for data in sources.iter().map(|source| &source.data) {
        merged.description = merged.description.or_else(|| data.description.clone());
        merged.pub_status = merged.pub_status.or(data.pub_status);
        merged.pub_year = merged.pub_year.or(data.pub_year);
        merged.pages = merged.pages.or_else(|| data.pages.clone());
        merged.suggested_mode = merged.suggested_mode.or(data.suggested_mode);
        for author in &data.authors {
            let folded = author.to_lowercase();
            if !merged.authors.iter().any(|known| known.to_lowercase() == folded) {
                merged.authors.push(author.clone());
            }
        }
        for title in &data.titles {
            if !merged.titles.contains(title) {
                merged.titles.push(title.clone());
            }
        }
    }
    merged
}

/// Copy every source of `from` into `into`, replacing same-named sources and
/// leaving the others alone.
pub(crate) fn sync_sources(into: &mut Vec<MetadataSource>, from: &[MetadataSource]) {
    for source in from {
        match into.iter_mut().find(|existing| existing.name == source.name) {
            Some(existing) => *existing = source.clone(),
            None => into.push(source.clone()),
        }
    }
}
