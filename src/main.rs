mod db;
mod export;
mod index;
mod parser;
mod scraper;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;

use scraper::FetchConfig;

#[derive(Parser)]
#[command(name = "mwb_scraper", about = "Weekly meeting program extractor for the jw.org activity guide")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest week links from an index page and populate the queue
    Init {
        /// Index page listing the available weeks
        url: String,
    },
    /// Fetch unvisited week pages
    Fetch {
        /// Max pages to fetch (default: all unvisited)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Parse fetched pages into schedule records
    Process {
        /// Max pages to process (default: all unprocessed)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Fetch + process in one pipeline
    Run {
        /// Max pages to fetch+process
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Export parsed weeks as a spreadsheet-shaped table
    Export {
        /// Output file; the extension picks the format unless --format is given
        #[arg(short, long, default_value = "data/reuniones.csv")]
        output: PathBuf,
        #[arg(long, value_enum)]
        format: Option<ExportFormat>,
    },
    /// Parsed weeks overview table
    Overview {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Show queue and parsing statistics
    Stats,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Csv,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { url } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let links = index::fetch_week_links(&url, &FetchConfig::default()).await?;
            if links.is_empty() {
                println!("No week links found on the index page.");
                return Ok(());
            }
            println!("Available weeks:");
            for (i, link) in links.iter().enumerate() {
                println!("  {:>2}. {}", i + 1, link.title);
            }
            let inserted = db::insert_weeks(&conn, &links)?;
            println!(
                "\nInserted {} new week URLs ({} total found)",
                inserted,
                links.len()
            );
            Ok(())
        }
        Commands::Fetch { limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let pages = db::fetch_unvisited(&conn, limit)?;
            if pages.is_empty() {
                println!("No unvisited weeks. Run 'init' first or all weeks are fetched.");
                return Ok(());
            }
            println!("Fetching {} pages (streaming to DB)...", pages.len());
            let stats =
                scraper::fetch_pages_streaming(&conn, pages, &FetchConfig::default()).await?;
            println!(
                "Done: {} fetched ({} ok, {} errors).",
                stats.total, stats.ok, stats.errors
            );
            Ok(())
        }
        Commands::Process { limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let pages = db::fetch_unprocessed(&conn, limit)?;
            if pages.is_empty() {
                println!("No unprocessed pages. Run 'fetch' first.");
                return Ok(());
            }
            println!("Processing {} pages...", pages.len());
            let counts = process_pages(&conn, &pages)?;
            counts.print();
            Ok(())
        }
        Commands::Run { limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let pages = db::fetch_unvisited(&conn, limit)?;
            if pages.is_empty() {
                println!("No unvisited weeks. Run 'init' first.");
                return Ok(());
            }

            // Phase 1: Fetch (streaming to DB)
            let t_fetch = Instant::now();
            println!("Pipeline: fetching {} pages (streaming to DB)...", pages.len());
            let stats =
                scraper::fetch_pages_streaming(&conn, pages, &FetchConfig::default()).await?;
            println!(
                "Fetched {} pages ({} ok, {} errors) in {:.1}s",
                stats.total,
                stats.ok,
                stats.errors,
                t_fetch.elapsed().as_secs_f64()
            );

            // Phase 2: Process
            let t_process = Instant::now();
            let unprocessed = db::fetch_unprocessed(&conn, None)?;
            if unprocessed.is_empty() {
                println!("Nothing to process (all fetched pages had errors).");
                return Ok(());
            }
            println!("Processing {} pages...", unprocessed.len());
            let counts = process_pages(&conn, &unprocessed)?;
            println!("Processed in {:.1}s", t_process.elapsed().as_secs_f64());
            counts.print();
            Ok(())
        }
        Commands::Export { output, format } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let rows = db::fetch_schedules(&conn, None)?;
            if rows.is_empty() {
                println!("No parsed weeks to export. Run 'process' first.");
                return Ok(());
            }
            let format = format.unwrap_or_else(|| {
                match output.extension().and_then(|e| e.to_str()) {
                    Some("json") => ExportFormat::Json,
                    _ => ExportFormat::Csv,
                }
            });
            if let Some(dir) = output.parent() {
                std::fs::create_dir_all(dir)?;
            }
            match format {
                ExportFormat::Csv => export::write_csv(&output, &rows)?,
                ExportFormat::Json => export::write_json(&output, &rows)?,
            }
            println!("Exported {} weeks to {}", rows.len(), output.display());
            Ok(())
        }
        Commands::Overview { limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let rows = db::fetch_schedules(&conn, Some(limit))?;
            if rows.is_empty() {
                println!("No parsed weeks found.");
                return Ok(());
            }

            // Compact, readable table
            println!(
                "{:>3} | {:<28} | {:<20} | {:>6} | {:>5}",
                "#", "Semana", "Lectura", "Partes", "Corte"
            );
            println!("{}", "-".repeat(75));

            for (i, r) in rows.iter().enumerate() {
                let week = truncate(&r.title, 28);
                let scripture = truncate(&r.scripture, 20);
                println!(
                    "{:>3} | {:<28} | {:<20} | {:>6} | {:>5}",
                    i + 1,
                    week,
                    scripture,
                    r.segments.len(),
                    r.cutoff
                );
            }

            println!("\n{} weeks", rows.len());
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Total:     {}", s.total);
            println!("Visited:   {}", s.visited);
            println!("Unvisited: {}", s.unvisited);
            println!("Fetched:   {}", s.fetched);
            println!("Errors:    {}", s.errors);
            println!("Parsed:    {}", s.parsed);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

struct ProcessCounts {
    parsed: usize,
    failed: usize,
    segments: usize,
}

impl ProcessCounts {
    fn print(&self) {
        println!(
            "Saved {} weeks ({} segments), {} failed.",
            self.parsed, self.segments, self.failed,
        );
    }
}

fn process_pages(
    conn: &rusqlite::Connection,
    pages: &[db::FetchedPage],
) -> anyhow::Result<ProcessCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(pages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut counts = ProcessCounts {
        parsed: 0,
        failed: 0,
        segments: 0,
    };

    for chunk in pages.chunks(500) {
        let records: Vec<_> = chunk
            .par_iter()
            .map(|page| {
                if page.text.trim().is_empty() {
                    None
                } else {
                    Some(parser::parse_schedule(&page.text))
                }
            })
            .collect();

        let mut rows = Vec::new();
        for (page, record) in chunk.iter().zip(records) {
            match record {
                Some(record) => {
                    counts.segments += record.segment_count();
                    rows.push(db::ScheduleRow {
                        page_data_id: page.page_data_id,
                        url: page.url.clone(),
                        title: page.title.clone(),
                        record,
                    });
                }
                None => {
                    warn!("No usable text for {}", page.title);
                    counts.failed += 1;
                }
            }
        }

        counts.parsed += rows.len();
        db::save_schedules(conn, &rows)?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(counts)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
