//! Layered configuration for folio.
//!
//! Sources are merged in increasing order of precedence:
//!
//! 1. built-in defaults,
//! 2. `folio.toml` then `folio.yaml` in the platform config directory,
//! 3. a file passed explicitly (`--config`), TOML, YAML or JSON by extension,
//! 4. `FOLIO_` environment variables, with `__` separating nested keys
//!    (`FOLIO_CACHE__TTL_SECS=60`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use folio_matcher::MatcherFamily;
use folio_matcher::models::DataSource;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "FOLIO_";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "folio")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite catalog file.
    pub database: PathBuf,
    pub cache: CacheSettings,
    pub rpc: RpcSettings,
    pub scan: ScanSettings,
    pub data_sources: Vec<DataSourceSettings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Archives are extracted into `<dir>/<item id>`.
    pub dir: PathBuf,
    pub ttl_secs: u64,
    pub max_entries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcSettings {
    /// Unix socket the coordinator listens on.
    pub socket: PathBuf,
    pub timeout_secs: u64,
    pub pages_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Read page geometry through the coordinator while scanning.
    pub page_metadata: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceSettings {
    pub name: String,
    #[serde(default)]
    pub family: MatcherFamily,
    pub paths: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let database = match project_dirs() {
            Some(dirs) => dirs.data_dir().join("folio.db"),
            None => std::env::temp_dir().join("folio").join("folio.db"),
        };
        Self {
            database,
            cache: CacheSettings::default(),
            rpc: RpcSettings::default(),
            scan: ScanSettings::default(),
            data_sources: Vec::new(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        let dir = match project_dirs() {
            Some(dirs) => dirs.cache_dir().join("archives"),
            None => std::env::temp_dir().join("folio").join("archives"),
        };
        Self { dir, ttl_secs: 300, max_entries: 100 }
    }
}

impl Default for RpcSettings {
    fn default() -> Self {
        let socket = match project_dirs() {
            Some(dirs) => dirs.runtime_dir().unwrap_or_else(|| dirs.cache_dir()).join("folio.sock"),
            None => std::env::temp_dir().join("folio.sock"),
        };
        Self { socket, timeout_secs: 30, pages_timeout_secs: 60 }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl RpcSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn pages_timeout(&self) -> Duration {
        Duration::from_secs(self.pages_timeout_secs)
    }
}

impl DataSourceSettings {
    /// The catalog model for this entry, not persisted yet.
    pub fn to_data_source(&self) -> DataSource {
        DataSource { id: 0, name: self.name.clone(), family: self.family, paths: self.paths.clone() }
    }
}

impl Config {
    /// Load and validate the configuration from every layer.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(dirs) = project_dirs() {
            figment = figment
                .merge(Toml::file(dirs.config_dir().join("folio.toml")))
                .merge(Yaml::file(dirs.config_dir().join("folio.yaml")));
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::MissingFile(path.to_path_buf()));
            }
            figment = Self::merge_file(figment, path);
        }
        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    fn merge_file(figment: Figment, path: &Path) -> Figment {
        match path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref() {
            Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
            Some("json") => figment.merge(Json::file(path)),
            _ => figment.merge(Toml::file(path)),
        }
    }

    /// Extract and validate a configuration from an assembled figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Invalid)?;
        config.validate()?;
        tracing::debug!(data_sources = config.data_sources.len(), "Configuration loaded");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let settings = [("database", &self.database), ("cache.dir", &self.cache.dir), ("rpc.socket", &self.rpc.socket)];
        if let Some((key, path)) = settings.into_iter().find(|(_, path)| path.is_relative()) {
            exn::bail!(ErrorKind::RelativeSetting { key, path: path.clone() });
        }
        let mut names = HashSet::new();
        for source in &self.data_sources {
            if !names.insert(source.name.as_str()) {
                exn::bail!(ErrorKind::DuplicateDataSource(source.name.clone()));
            }
            if source.paths.is_empty() {
                exn::bail!(ErrorKind::NoPaths(source.name.clone()));
            }
            if let Some(path) = source.paths.iter().find(|p| p.is_relative()) {
                exn::bail!(ErrorKind::RelativePath { name: source.name.clone(), path: path.clone() });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    fn load_in(jail: &Jail, file: &str) -> Result<Config> {
        Config::load(Some(&jail.directory().join(file)))
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_figment(Figment::from(Serialized::defaults(Config::default()))).unwrap();
        assert_eq!(config.cache.ttl(), Duration::from_secs(300));
        assert_eq!(config.cache.max_entries, 100);
        assert_eq!(config.rpc.timeout(), Duration::from_secs(30));
        assert_eq!(config.rpc.pages_timeout(), Duration::from_secs(60));
        assert!(!config.scan.page_metadata);
        assert!(config.data_sources.is_empty());
    }

    #[test]
    fn test_file_then_environment() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "folio.toml",
                r#"
                    database = "/srv/folio/catalog.db"

                    [cache]
                    ttl_secs = 120

                    [[data_sources]]
                    name = "comics"
                    paths = ["/srv/comics", "/mnt/comics"]
                "#,
            )?;
            jail.set_env("FOLIO_CACHE__TTL_SECS", "45");
            jail.set_env("FOLIO_SCAN__PAGE_METADATA", "true");

            let config = load_in(jail, "folio.toml").unwrap();
            assert_eq!(config.database, PathBuf::from("/srv/folio/catalog.db"));
            assert_eq!(config.cache.ttl_secs, 45);
            assert_eq!(config.cache.max_entries, 100);
            assert!(config.scan.page_metadata);

            let source = config.data_sources[0].to_data_source();
            assert_eq!(source.family, MatcherFamily::Comic);
            assert_eq!(source.paths.len(), 2);
            Ok(())
        });
    }

    #[test]
    fn test_yaml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "folio.yml",
                "rpc:\n  socket: /run/folio.sock\ndata_sources:\n  - name: manga\n    family: comic\n    paths: [/srv/manga]\n",
            )?;
            let config = load_in(jail, "folio.yml").unwrap();
            assert_eq!(config.rpc.socket, PathBuf::from("/run/folio.sock"));
            assert_eq!(config.data_sources[0].name, "manga");
            Ok(())
        });
    }

    #[rstest]
    #[case::relative(r#"[[data_sources]]
name = "comics"
paths = ["comics"]"#)]
    #[case::duplicate(r#"[[data_sources]]
name = "comics"
paths = ["/a"]
[[data_sources]]
name = "comics"
paths = ["/b"]"#)]
    #[case::empty(r#"[[data_sources]]
name = "comics"
paths = []"#)]
    #[case::unknown_family(r#"[[data_sources]]
name = "comics"
family = "audiobook"
paths = ["/a"]"#)]
    fn test_rejected(#[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file("folio.toml", contents)?;
            assert!(load_in(jail, "folio.toml").is_err());
            Ok(())
        });
    }

    #[test]
    fn test_relative_path_kind() {
        Jail::expect_with(|jail| {
            jail.create_file("folio.toml", "[[data_sources]]\nname = \"comics\"\npaths = [\"/ok\", \"rel\"]\n")?;
            let err = load_in(jail, "folio.toml").unwrap_err();
            assert!(matches!(&*err, ErrorKind::RelativePath { name, .. } if name == "comics"));
            Ok(())
        });
    }

    #[rstest]
    #[case::database("database = \"folio.db\"", "database")]
    #[case::cache("[cache]\ndir = \"cache\"", "cache.dir")]
    #[case::socket("[rpc]\nsocket = \"run/folio.sock\"", "rpc.socket")]
    fn test_relative_setting(#[case] contents: &str, #[case] expected: &str) {
        Jail::expect_with(|jail| {
            jail.create_file("folio.toml", contents)?;
            let err = load_in(jail, "folio.toml").unwrap_err();
            assert!(matches!(&*err, ErrorKind::RelativeSetting { key, .. } if *key == expected));
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::MissingFile(_)));
    }
}
