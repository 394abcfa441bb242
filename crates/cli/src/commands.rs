use crate::error::{ErrorKind, Result};
use crate::{Cli, Command};
use exn::ResultExt;
use folio_archive::AutoExtractor;
use folio_catalog::{Database, Repository};
use folio_config::Config;
use folio_library::Library;
use folio_reader::{ArchiveCache, CacheConfig, PageSource, RemotePages, register_pages};
use folio_rpc::{Client, Coordinator};
use folio_storage::backend::LocalBackend;
use std::sync::Arc;
use std::time::Duration;

/// Slowest the purger ticks, whatever the TTL.
const MAX_PURGE_INTERVAL: Duration = Duration::from_secs(60);

pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    if let Some(parent) = config.database.parent() {
        tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Catalog)?;
    }
    let db = Database::connect(&config.database).await.or_raise(|| ErrorKind::Catalog)?;
    let library = Library::new(Repository::from(&db), Arc::new(LocalBackend::new("local")));
    for source in &config.data_sources {
        library.ensure_data_source(&source.to_data_source()).await.or_raise(|| ErrorKind::Library)?;
    }

    let result = match cli.command {
        Command::Sources => sources(&library).await,
        Command::Scan { names } => scan(&config, library, names).await,
        Command::Coordinator => coordinator(&config, library.repository().clone()).await,
        Command::Pages { item_id, local, metadata } => pages(&config, library, item_id, local, metadata).await,
        Command::Search { query } => search(&library, &query.join(" ")).await,
    };
    db.close().await;
    result
}

async fn sources(library: &Library) -> Result<()> {
    let sources = library.repository().list_data_sources().await.or_raise(|| ErrorKind::Catalog)?;
    for source in sources {
        let paths = source.paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>();
        println!("{:>4}  {:<20} {:<8} {}", source.id, source.name, source.family, paths.join(", "));
    }
    Ok(())
}

async fn scan(config: &Config, library: Library, names: Vec<String>) -> Result<()> {
    let library = match config.scan.page_metadata {
        true => match connect(config).await {
            Ok(client) => library.with_page_source(Arc::new(RemotePages::remote(client, config.rpc.pages_timeout()))),
            Err(err) => {
                tracing::warn!(error = ?err, "Coordinator unreachable, scanning without page metadata");
                library
            },
        },
        false => library,
    };
    let names = match names.is_empty() {
        true => {
            let sources = library.repository().list_data_sources().await.or_raise(|| ErrorKind::Catalog)?;
            sources.into_iter().map(|source| source.name).collect()
        },
        false => names,
    };
    for name in names {
        let Some(source) = library.repository().get_data_source_by_name(&name).await.or_raise(|| ErrorKind::Catalog)?
        else {
            exn::bail!(ErrorKind::UnknownDataSource(name));
        };
        let report = library.scan(source.id).await.or_raise(|| ErrorKind::Library)?;
        println!("{name}:\n{report}\n");
    }
    Ok(())
}

async fn connect(config: &Config) -> Result<Client> {
    match tokio::time::timeout(config.rpc.timeout(), Client::connect(&config.rpc.socket)).await {
        Ok(connected) => connected.or_raise(|| ErrorKind::Coordinator),
        Err(_) => exn::bail!(ErrorKind::Coordinator),
    }
}

fn archive_cache(config: &Config, repo: Repository) -> ArchiveCache {
    let cache_config = CacheConfig::new(&config.cache.dir)
        .with_ttl(config.cache.ttl())
        .with_max_entries(config.cache.max_entries);
    ArchiveCache::new(cache_config, Arc::new(AutoExtractor::discover()), Arc::new(repo))
}

async fn coordinator(config: &Config, repo: Repository) -> Result<()> {
    tokio::fs::create_dir_all(&config.cache.dir).await.or_raise(|| ErrorKind::Pages)?;
    if let Some(parent) = config.rpc.socket.parent() {
        tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Coordinator)?;
    }
    let cache = archive_cache(config, repo);
    let mut coordinator = Coordinator::new();
    register_pages(&mut coordinator, cache.clone());

    let every = (config.cache.ttl() / 2).clamp(Duration::from_secs(1), MAX_PURGE_INTERVAL);
    let purger = tokio::spawn(cache.clone().run_purger(every));
    let result = tokio::select! {
        served = coordinator.listen(&config.rpc.socket) => served.or_raise(|| ErrorKind::Coordinator),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
            Ok(())
        },
    };
    purger.abort();
    _ = tokio::fs::remove_file(&config.rpc.socket).await;
    result
}

async fn pages(config: &Config, library: Library, item_id: i64, local: bool, metadata: bool) -> Result<()> {
    let source = match local {
        true => {
            tokio::fs::create_dir_all(&config.cache.dir).await.or_raise(|| ErrorKind::Pages)?;
            RemotePages::local(archive_cache(config, library.repository().clone()))
        },
        false => {
            let client = connect(config).await?;
            RemotePages::remote(client, config.rpc.pages_timeout())
        },
    };

    if metadata {
        let library = library.with_page_source(Arc::new(source));
        let data = library.refresh_item_pages(item_id).await.or_raise(|| ErrorKind::Library)?;
        for page in data.pages.iter().flatten() {
            println!("{}\t{}x{}", page.name, page.width, page.height);
        }
        if let Some(mode) = data.suggested_mode {
            println!("suggested mode: {mode:?}");
        }
        return Ok(());
    }

    let pages = source.pages(item_id).await.or_raise(|| ErrorKind::Pages)?;
    println!("{}", pages.root.display());
    for file in &pages.files {
        println!("  {file}");
    }
    Ok(())
}

async fn search(library: &Library, query: &str) -> Result<()> {
    library.rebuild_search_index().await.or_raise(|| ErrorKind::Library)?;
    for id in library.search(query) {
        if let Some(collection) = library.repository().get_collection(id).await.or_raise(|| ErrorKind::Catalog)? {
            println!("{:>6}  {}", collection.id, collection.display_name());
        }
    }
    Ok(())
}
