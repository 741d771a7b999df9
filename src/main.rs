mod db;
mod fetch;
mod parser;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use tracing::info;

#[derive(Parser)]
#[command(name = "douban_scraper", about = "Douban Top 250 movie scraper")]
struct Cli {
    /// Path to the SQLite database file
    #[arg(short = 'd', long, default_value = "data/douban.sqlite3")]
    database: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the ranking pages, parse them and upsert into the database
    Scrape {
        /// Max entries to scrape
        #[arg(short = 'n', long, default_value = "100")]
        limit: u32,
        /// Delay in seconds between page requests
        #[arg(long, default_value = "0.5")]
        delay: f64,
    },
    /// Show row counts per table
    Stats,
    /// List stored movies ordered by rank
    Top {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "25")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    if let Some(parent) = cli.database.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = db::connect(&cli.database)?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Scrape { limit, delay } => {
            let summary = scrape(&conn, limit, delay).await?;
            println!(
                "Parsed {} of {} list items ({} skipped).",
                summary.parsed, summary.seen, summary.skipped
            );
            println!(
                "Stored {} movies in {}",
                summary.stored,
                cli.database.display()
            );
        }
        Commands::Stats => {
            let s = db::get_stats(&conn)?;
            println!("Movies:    {}", s.movies);
            println!("Regions:   {}", s.regions);
            println!("Genres:    {}", s.genres);
            println!("Directors: {}", s.directors);
            println!("Actors:    {}", s.actors);
        }
        Commands::Top { limit } => {
            let rows = db::fetch_top(&conn, limit)?;
            if rows.is_empty() {
                println!("No movies stored. Run 'scrape' first.");
                return Ok(());
            }

            println!(
                "{:>4} | {:<24} | {:<4} | {:>6} | {:>9} | {:<28}",
                "#", "Title", "Year", "Rating", "Votes", "Quote"
            );
            println!("{}", "-".repeat(90));
            for r in &rows {
                let year = r.year.map(|y| y.to_string()).unwrap_or_else(|| "-".into());
                println!(
                    "{:>4} | {:<24} | {:<4} | {:>6.1} | {:>9} | {:<28}",
                    r.rank,
                    truncate(&r.title, 24),
                    year,
                    r.rating,
                    r.rating_count,
                    truncate(r.quote.as_deref().unwrap_or(""), 28)
                );
            }
            println!("\n{} movies", rows.len());
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    Ok(())
}

struct ScrapeSummary {
    seen: usize,
    parsed: usize,
    skipped: usize,
    stored: usize,
}

/// Fetch pages sequentially, parse each, then upsert the whole run as one
/// batch. Stops early when a page comes back without any list items.
async fn scrape(conn: &Connection, limit: u32, delay: f64) -> Result<ScrapeSummary> {
    let client = fetch::client()?;
    let starts: Vec<u32> = (0..limit).step_by(fetch::PAGE_SIZE as usize).collect();

    let pb = ProgressBar::new(starts.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} pages")?
            .progress_chars("=> "),
    );

    let mut movies = Vec::new();
    let mut seen = 0usize;
    let mut skipped = 0usize;

    for (i, start) in starts.iter().enumerate() {
        let html = fetch::fetch_page(&client, *start).await?;
        let page = parser::parse_document(&html);
        if page.fragments_seen() == 0 {
            info!("Empty page at start={}, stopping early", start);
            break;
        }

        seen += page.fragments_seen();
        skipped += page.skipped.len();
        movies.extend(page.movies);
        pb.inc(1);

        if delay > 0.0 && i + 1 < starts.len() {
            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
        }
    }
    pb.finish_and_clear();

    movies.truncate(limit as usize);
    info!("Parsed {} movies, upserting batch", movies.len());
    db::upsert_movies(conn, &movies)?;

    Ok(ScrapeSummary {
        seen,
        parsed: seen - skipped,
        skipped,
        stored: movies.len(),
    })
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
