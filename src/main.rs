use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use dialoguer::Input;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use thread_harvest::browser::{BrowserSession, ChromiumSession};
use thread_harvest::config::Config;
use thread_harvest::crawler::query::parse_date;
use thread_harvest::crawler::{CrawlProgress, CrawlRequest, SearchCrawler};
use thread_harvest::export::{write_csv, Summary};
use thread_harvest::language::{AcceptAll, LanguageFilter, WhatlangFilter};

/// Collect posts and replies for a topic from the search feed.
#[derive(Debug, Parser)]
#[command(name = "thread-harvest", version, about)]
struct Args {
    /// Search topic. Prompted for when omitted.
    #[arg(long, short)]
    topic: Option<String>,

    /// First day of the date range (YYYY-MM-DD).
    #[arg(long, alias = "start_date")]
    start_date: Option<String>,

    /// Last day of the date range (YYYY-MM-DD).
    #[arg(long, alias = "end_date")]
    end_date: Option<String>,

    /// CSV output path.
    #[arg(long, short, default_value = "twitter_data.csv")]
    output: PathBuf,

    /// Maximum number of root posts.
    #[arg(long, default_value_t = 120)]
    limit: usize,

    /// Maximum number of replies per root post.
    #[arg(long, alias = "replies_limit", default_value_t = 20)]
    replies_limit: usize,

    /// Run the browser without a window.
    #[arg(long, env = "HEADLESS")]
    headless: bool,

    /// Keep only posts in the configured target language.
    #[arg(long, aliases = ["english_only", "language-filter"])]
    english_only: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        eprintln!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    let args = Args::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let topic = match args.topic {
        Some(topic) => topic,
        None => Input::<String>::new()
            .with_prompt("Enter the topic to search for")
            .interact_text()
            .context("Failed to read topic")?,
    };
    let since = date_arg(args.start_date, "Enter start date (YYYY-MM-DD)")?;
    let until = date_arg(args.end_date, "Enter end date (YYYY-MM-DD)")?;

    let request = CrawlRequest {
        topic,
        since,
        until,
        post_limit: args.limit,
        replies_limit: args.replies_limit,
        language_filter: args.english_only,
    };
    request.validate().context("Invalid search parameters")?;

    let detector = WhatlangFilter::from_code(&config.target_language);
    let filter: Box<dyn LanguageFilter> = match detector {
        Some(filter) => Box::new(filter),
        None if request.language_filter => anyhow::bail!(
            "Language filtering is not supported for '{}'",
            config.target_language
        ),
        None => Box::new(AcceptAll),
    };

    info!(
        topic = %request.topic,
        since = %request.since,
        until = %request.until,
        headless = args.headless,
        "Starting thread-harvest"
    );

    let crawler = SearchCrawler::new(config.clone(), filter)
        .context("Failed to build crawler")?
        .with_progress(CrawlProgress::new(request.post_limit));

    let mut session = ChromiumSession::launch(&config, args.headless)
        .await
        .context("Failed to launch browser")?;

    let result = crawler.crawl(&mut session, &request).await;
    session.shutdown().await;
    let outcome = result.context("Crawl failed")?;

    if outcome.records.is_empty() {
        warn!("No posts collected");
    }

    write_csv(&args.output, &outcome.records)?;
    println!("\nData saved to {}", args.output.display());
    println!("\n{}", Summary::from_records(&outcome.records));

    info!(
        feed_replies_skipped = outcome.stats.feed_replies_skipped,
        language_rejected = outcome.stats.language_rejected,
        missing_id = outcome.stats.missing_id,
        threads_visited = outcome.stats.threads_visited,
        "Done"
    );

    Ok(())
}

/// Use `value` when given, otherwise prompt until a valid date is entered.
fn date_arg(value: Option<String>, prompt: &str) -> Result<NaiveDate> {
    if let Some(value) = value {
        return parse_date(&value).with_context(|| format!("Invalid date '{value}'"));
    }

    let input = Input::<String>::new()
        .with_prompt(prompt)
        .validate_with(|s: &String| -> Result<(), String> {
            parse_date(s).map(|_| ()).map_err(|e| e.to_string())
        })
        .interact_text()
        .context("Failed to read date")?;
    parse_date(&input).with_context(|| format!("Invalid date '{input}'"))
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,thread_harvest=debug"));

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}
