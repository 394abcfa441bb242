use super::{from_json, path_to_text, to_json};
use crate::error::{Error, ErrorKind, Result};
use exn::ResultExt;
use folio_matcher::MatcherFamily;
use folio_matcher::models::DataSource;
use std::path::PathBuf;

#[derive(sqlx::FromRow)]
pub(crate) struct DataSourceRow {
    pub id: i64,
    pub name: String,
    pub family: String,
    pub paths: String,
}
impl TryFrom<&DataSource> for DataSourceRow {
    type Error = Error;
    fn try_from(source: &DataSource) -> Result<Self> {
        let paths = source.paths.iter().map(|p| path_to_text(p, "data source path")).collect::<Result<Vec<_>>>()?;
        Ok(Self {
            id: source.id,
            name: source.name.clone(),
            family: source.family.to_string(),
            paths: to_json(&paths, "data source paths")?,
        })
    }
}
impl TryFrom<DataSourceRow> for DataSource {
    type Error = Error;
    fn try_from(row: DataSourceRow) -> Result<Self> {
        let paths: Vec<String> = from_json(&row.paths, "data source paths")?;
        Ok(Self {
            id: row.id,
            name: row.name,
            family: row.family.parse::<MatcherFamily>().or_raise(|| ErrorKind::InvalidData("matcher family"))?,
            paths: paths.into_iter().map(PathBuf::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_to_model() {
        let row = DataSourceRow {
            id: 3,
            name: "Comics".to_string(),
            family: "comic".to_string(),
            paths: r#"["/srv/comics","/mnt/more comics"]"#.to_string(),
        };
        let model = DataSource::try_from(row).unwrap();
        assert_eq!(model.family, MatcherFamily::Comic);
        assert_eq!(model.paths, vec![PathBuf::from("/srv/comics"), PathBuf::from("/mnt/more comics")]);
    }

    #[test]
    fn test_unknown_family_is_invalid() {
        let row = DataSourceRow { id: 1, name: "x".to_string(), family: "audio".to_string(), paths: "[]".to_string() };
        let err = DataSource::try_from(row).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData("matcher family")));
    }
}
