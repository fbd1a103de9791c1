use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use kbseed::config::SyncConfig;
use kbseed::dataset::{ActionLinkDataset, ContentDataset, Loaded};
use kbseed::store::Collection;
use kbseed::sync::bulk::DeleteScope;
use kbseed::sync::featured::sync_featured;
use kbseed::sync::run::{clear, seed};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "kbseed=info,docstore_core=info,warn";

#[derive(Debug, Parser)]
#[command(author, version, about = "Seed and clean up knowledge-base content")]
struct Cli {
    /// Locale to write (overrides LOCALE)
    #[arg(long, global = true)]
    locale: Option<String>,
    /// Locale that owns base-only fields (overrides BASE_LOCALE)
    #[arg(long, global = true)]
    base_locale: Option<String>,
    /// Directory holding the JSON datasets (overrides KBSEED_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
enum Command {
    /// Upsert categories and articles
    SeedArticles,
    /// Upsert action links
    SeedActionLinks,
    /// Align the featured flag of published articles with the dataset
    SyncFeatured,
    /// Delete content
    Clear {
        /// Only delete the active locale's variants
        #[arg(long)]
        locale_only: bool,
        /// Skip the re-list after deleting
        #[arg(long)]
        no_verify: bool,
        /// Restrict to these collections (default: all)
        #[arg(long = "collection", value_enum)]
        collections: Vec<CollectionArg>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CollectionArg {
    Articles,
    ActionLinks,
    Categories,
}

impl From<CollectionArg> for Collection {
    fn from(arg: CollectionArg) -> Self {
        match arg {
            CollectionArg::Articles => Collection::Articles,
            CollectionArg::ActionLinks => Collection::ActionLinks,
            CollectionArg::Categories => Collection::Categories,
        }
    }
}

/// Entries go before categories so nothing is left pointing at a deleted
/// category.
fn clear_order(selected: &[CollectionArg]) -> Vec<Collection> {
    let selected: Vec<Collection> = selected.iter().copied().map(Collection::from).collect();
    Collection::ALL
        .into_iter()
        .filter(|collection| selected.is_empty() || selected.contains(collection))
        .collect()
}

fn log_dataset<T>(dataset: &Loaded<T>, requested: &str) {
    info!(
        path = %dataset.path.display(),
        dataset_locale = %dataset.locale,
        fallback = dataset.fell_back(requested),
        "loaded dataset"
    );
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let config = SyncConfig::from_env()?
        .with_locale(cli.locale)?
        .with_base_locale(cli.base_locale)?
        .with_data_dir(cli.data_dir);
    let locales = config.locales();
    info!(
        base_url = %config.base_url,
        locale = %locales.locale,
        base_locale = %locales.base_locale,
        data_dir = %config.data_dir.display(),
        "starting"
    );

    match cli.command {
        Command::SeedArticles => {
            let dataset = ContentDataset::load(&config.data_dir, &locales.locale)
                .context("failed to load article dataset")?;
            log_dataset(&dataset, &locales.locale);
            let store = config.connect().await?;
            seed(
                &store,
                &dataset.data.articles,
                &dataset.data.categories,
                &locales,
            )
            .await;
        }
        Command::SeedActionLinks => {
            let links = ActionLinkDataset::load(&config.data_dir, &locales.locale)
                .context("failed to load action link dataset")?;
            log_dataset(&links, &locales.locale);
            let categories = match ContentDataset::load(&config.data_dir, &locales.locale) {
                Ok(content) => content.data.categories,
                Err(err) => {
                    warn!("no category definitions available: {err}");
                    Vec::new()
                }
            };
            let store = config.connect().await?;
            seed(&store, &links.data.action_links, &categories, &locales).await;
        }
        Command::SyncFeatured => {
            let dataset = ContentDataset::load(&config.data_dir, &locales.locale)
                .context("failed to load article dataset")?;
            log_dataset(&dataset, &locales.locale);
            let store = config.connect().await?;
            sync_featured(&store, &dataset.data.articles, &locales.locale)
                .await
                .context("failed to list published articles")?;
        }
        Command::Clear {
            locale_only,
            no_verify,
            collections,
        } => {
            let scope = if locale_only {
                DeleteScope::Locale(locales.locale.clone())
            } else {
                DeleteScope::WholeDocument
            };
            let store = config.connect().await?;
            let results = clear(&store, &clear_order(&collections), &scope, !no_verify).await;
            for result in &results {
                match &result.summary {
                    Some(summary) => info!(
                        collection = result.collection.as_str(),
                        deleted = summary.deleted,
                        failed = summary.failed,
                        remaining = ?summary.remaining,
                        "cleared"
                    ),
                    None => warn!(collection = result.collection.as_str(), "not cleared"),
                }
            }
        }
    }
    Ok(())
}
