use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};

use womencypedia_cms::query::{parse_sort, Filter, Populate};
use womencypedia_cms::{logging, metrics, CmsClient, CmsConfig, ContentQuery, Normalizer, NormalizerConfig};

#[derive(Parser)]
#[command(name = "womencypedia-cms")]
#[command(about = "Fetch and normalize Womencypedia content from the Strapi CMS")]
#[command(version)]
struct Cli {
    /// TOML config file; CMS_* environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Locale to request (e.g. en, fr)
    #[arg(long, global = true)]
    locale: Option<String>,

    /// Print Prometheus metrics to stderr when done
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List a collection type
    List {
        content_type: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        page_size: Option<u32>,
        /// field or field:asc|desc, repeatable
        #[arg(long)]
        sort: Vec<String>,
        /// field=value or field~value, repeatable
        #[arg(long)]
        filter: Vec<String>,
        /// Comma-separated relations to populate instead of '*'
        #[arg(long)]
        populate: Option<String>,
    },
    /// Fetch one entry by id or documentId
    Get { content_type: String, id: String },
    /// Fetch a single type such as 'homepage'
    Single { name: String },
    /// Case-insensitive search on one field
    Search {
        content_type: String,
        term: String,
        #[arg(long, default_value = "name")]
        field: String,
    },
    /// Normalize a saved response body without touching the network
    Normalize { file: PathBuf },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn base_query(locale: Option<&str>) -> ContentQuery {
    match locale {
        Some(locale) => ContentQuery::new().locale(locale),
        None => ContentQuery::new(),
    }
}

async fn run(cli: Cli, config: CmsConfig) -> anyhow::Result<()> {
    let query = base_query(cli.locale.as_deref());

    match cli.command {
        Commands::Normalize { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let normalizer = Normalizer::new(NormalizerConfig::from(&config));
            let result = normalizer.normalize_envelope(serde_json::from_str(&raw)?)?;
            print_json(&result)?;
        }
        Commands::List {
            content_type,
            page,
            page_size,
            sort,
            filter,
            populate,
        } => {
            let mut query = query.page(page);
            if let Some(size) = page_size {
                query = query.page_size(size);
            }
            if let Some(fields) = populate {
                query = query.populate(Populate::Fields(
                    fields.split(',').map(|s| s.trim().to_string()).collect(),
                ));
            }
            for arg in &sort {
                let (field, order) = parse_sort(arg)?;
                query = query.sort(field, order);
            }
            for arg in &filter {
                query.filters.push(arg.parse::<Filter>()?);
            }
            let client = CmsClient::from_config(config)?;
            print_json(&client.list(&content_type, &query).await?)?;
        }
        Commands::Get { content_type, id } => {
            let client = CmsClient::from_config(config)?;
            print_json(&client.get(&content_type, &id).await?)?;
        }
        Commands::Single { name } => {
            let client = CmsClient::from_config(config)?;
            print_json(&client.single_type(&name, &query).await?)?;
        }
        Commands::Search {
            content_type,
            term,
            field,
        } => {
            let client = CmsClient::from_config(config)?;
            print_json(&client.search(&content_type, &field, &term, &query).await?)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = CmsConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let _guard = logging::init_logging(config.log_dir.as_deref());

    let metrics_handle = if cli.metrics {
        Some(metrics::init().map_err(anyhow::Error::msg)?)
    } else {
        None
    };

    info!("Using CMS at {}", config.base_url);
    let outcome = run(cli, config).await;
    if let Err(e) = &outcome {
        error!("Command failed: {:#}", e);
    }

    if let Some(handle) = metrics_handle {
        eprintln!("{}", handle.render());
    }
    outcome
}
