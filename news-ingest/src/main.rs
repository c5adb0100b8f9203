use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use news_ingest::rss_utils::url::extract_domain;
use news_ingest::sources::google_news::{DEFAULT_HOURS_BACK, DEFAULT_MAX_HEADLINES};
use news_ingest::normalizer::normalize_entries;
use news_ingest::{AppConfig, BatchAggregator, Exporter, Fetcher, GoogleNewsSource, TimestampMode};
use std::env;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_CONFIG_FILE: &str = "news-ingest.toml";

#[derive(Parser, Debug)]
#[command(name = "news-ingest", about = "Fetch, normalize and export news feeds")]
struct Args {
    /// Path to a TOML config file (default: $NEWS_INGEST_CONFIG or ./news-ingest.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level or filter directive (overridden by RUST_LOG)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registry feeds
    Feeds {
        #[arg(long)]
        category: Option<String>,
    },
    /// Fetch a single feed and print its items as JSON
    Fetch { url: String },
    /// Fetch a registry category and export the result
    Aggregate {
        #[arg(long)]
        category: Option<String>,
        /// Process only the first N feeds
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, value_enum, default_value = "csv")]
        format: OutputFormat,
        /// Markdown file name (only valid with --format markdown)
        #[arg(long)]
        output: Option<String>,
    },
    /// Search Google News for recent articles
    Search {
        query: String,
        #[arg(long, default_value_t = DEFAULT_HOURS_BACK)]
        hours_back: u32,
        #[arg(long, default_value = "en")]
        language: String,
        #[arg(long, default_value = "US")]
        country: String,
    },
    /// Google News top headlines
    Headlines {
        #[arg(long, default_value = "en")]
        language: String,
        #[arg(long, default_value = "US")]
        country: String,
        #[arg(long, default_value_t = DEFAULT_MAX_HEADLINES)]
        max_items: usize,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Markdown,
    Json,
}

impl Args {
    fn validate(&self) -> Result<()> {
        if let Command::Aggregate {
            format,
            output: Some(_),
            ..
        } = &self.command
        {
            if *format != OutputFormat::Markdown {
                bail!("--output only applies to --format markdown");
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    args.validate()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let config = load_config(args.config).await?;

    match args.command {
        Command::Feeds { category } => {
            let registry = config.registry()?;
            let urls = registry.list_feeds(category.as_deref())?;
            for url in urls {
                let domain = extract_domain(&url).unwrap_or_default();
                println!("{:<28} {}", domain, url);
            }
        }
        Command::Fetch { url } => {
            let fetcher = Fetcher::new(config.fetch.clone())?;
            let entries = fetcher.fetch_feed(&url).await?;
            let (items, skipped) = normalize_entries(&entries, TimestampMode::Plain);
            info!("{} items from {} ({} entries skipped)", items.len(), url, skipped);
            print_json(&items)?;
        }
        Command::Aggregate {
            category,
            limit,
            format,
            output,
        } => {
            let registry = config.registry()?;
            let urls = registry.list_feeds(category.as_deref())?;
            let fetcher = Fetcher::new(config.fetch.clone())?;
            let aggregator =
                BatchAggregator::new(fetcher).with_max_concurrency(config.aggregate.max_concurrency);

            let report = aggregator.aggregate_report(&urls, limit).await;
            for failed in report.failed_feeds() {
                error!(
                    "Feed failed: {} ({})",
                    failed.url,
                    failed.error.as_deref().unwrap_or("unknown error")
                );
            }

            let exporter = Exporter::from_config(&config.export);
            let category_name = category.as_deref().unwrap_or("all");
            match format {
                OutputFormat::Csv => {
                    let path = exporter.export_tabular(&report.items, category_name)?;
                    println!("{}", path.display());
                }
                OutputFormat::Markdown => {
                    let path = exporter.export_markdown(&report.items, output.as_deref())?;
                    println!("{}", path.display());
                }
                OutputFormat::Json => print_json(&report)?,
            }
        }
        Command::Search {
            query,
            hours_back,
            language,
            country,
        } => {
            let google = GoogleNewsSource::new(Fetcher::new(config.fetch.clone())?)
                .with_edition(&language, &country);
            let items = google.search(&query, hours_back, Utc::now()).await?;
            print_json(&items)?;
        }
        Command::Headlines {
            language,
            country,
            max_items,
        } => {
            let google = GoogleNewsSource::new(Fetcher::new(config.fetch.clone())?)
                .with_edition(&language, &country);
            let items = google.top_headlines(max_items).await?;
            print_json(&items)?;
        }
    }

    Ok(())
}

async fn load_config(explicit: Option<PathBuf>) -> Result<AppConfig> {
    let path = match explicit {
        Some(path) => Some(path),
        None => env::var_os("NEWS_INGEST_CONFIG")
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists())),
    };

    match path {
        Some(path) => {
            let config = AppConfig::from_file(&path)
                .await
                .with_context(|| format!("loading configuration from {}", path.display()))?;
            info!(path = %path.display(), "configuration loaded");
            Ok(config)
        }
        None => {
            info!("no configuration file, using defaults");
            Ok(AppConfig::default())
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{}", json);
    Ok(())
}
