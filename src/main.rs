use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clipmatch::config::MatchConfig;
use clipmatch::dedup::Deduplicator;
use clipmatch::extract::{extract_entries, format_timestamp};
use clipmatch::models::{CatalogSong, Classification, MatchResult, Resolution};
use clipmatch::packager::{BatchTarget, Packager};
use clipmatch::pipeline::{run_matching, Uploader};
use clipmatch::progress::{format_duration, Progress};
use clipmatch::store::SqliteStore;
use clipmatch::video::{extract_video_id, timestamped_url, video_key};

#[derive(Parser)]
#[command(name = "clipmatch")]
#[command(about = "Import karaoke clips from timestamp comments into a song catalog")]
struct Cli {
    /// Hide progress bars and print periodic progress lines instead
    #[arg(long, global = true)]
    log_only: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the timestamp entries found in a comment as JSON
    Parse {
        /// Comment text file, or - for stdin
        comments: PathBuf,
    },
    /// Match comment entries against the catalog and show the classification
    Match {
        comments: PathBuf,
        #[command(flatten)]
        catalog: CatalogArgs,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print full results as JSON
        #[arg(long)]
        json: bool,
        /// Video the comment belongs to; adds a jump link per entry
        #[arg(long)]
        video_url: Option<String>,
        /// Print matching statistics to stderr
        #[arg(long)]
        stats: bool,
    },
    /// Full import: match, apply review decisions, dedup and insert clips
    Import(ImportArgs),
    /// Create the database schema, optionally loading a catalog JSON file
    InitDb {
        db: PathBuf,
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

#[derive(Args)]
struct CatalogArgs {
    /// Catalog database
    #[arg(long, conflicts_with = "catalog")]
    db: Option<PathBuf>,
    /// Catalog as a JSON array of songs
    #[arg(long)]
    catalog: Option<PathBuf>,
}

#[derive(Args)]
struct ImportArgs {
    comments: PathBuf,

    #[arg(long)]
    db: PathBuf,

    #[arg(long)]
    video_url: String,

    /// Broadcast date, YYYY-MM-DD
    #[arg(long)]
    date: String,

    /// Description for every clip; defaults to an attribution line per entry
    #[arg(long)]
    description: Option<String>,

    /// JSON array of review decisions: [{"index": 1, "resolution": {"song": "id"}}]
    #[arg(long)]
    decisions: Option<PathBuf>,

    #[arg(long)]
    config: Option<PathBuf>,

    /// Build the batch but insert nothing
    #[arg(long)]
    dry_run: bool,

    /// Write matching statistics JSON to this file
    #[arg(long)]
    stats: Option<PathBuf>,
}

/// Operator decision for one entry, as stored in a decisions file.
#[derive(Deserialize)]
struct Decision {
    index: usize,
    resolution: Resolution,
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read comments from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<MatchConfig> {
    match path {
        Some(path) => Ok(MatchConfig::load(path)?),
        None => Ok(MatchConfig::default()),
    }
}

fn load_catalog(args: &CatalogArgs) -> Result<Vec<CatalogSong>> {
    match (&args.db, &args.catalog) {
        (Some(db), _) => SqliteStore::open(db)?.load_catalog(),
        (None, Some(path)) => {
            let json = read_input(path)?;
            serde_json::from_str(&json).with_context(|| format!("Bad catalog JSON in {}", path.display()))
        }
        (None, None) => bail!("Either --db or --catalog is required"),
    }
}

fn print_results(results: &[MatchResult], video_id: Option<&str>) {
    for (index, result) in results.iter().enumerate() {
        let entry = &result.entry;
        let length = entry
            .duration()
            .map(|d| format!(" ({})", format_timestamp(d)))
            .unwrap_or_default();
        println!(
            "#{:<3} {:>8}{}  {} - {}  [{}]",
            index,
            format_timestamp(entry.start_seconds),
            length,
            entry.artist,
            entry.title,
            result.classification.label()
        );
        if let Some(video_id) = video_id {
            println!("       {}", timestamped_url(video_id, entry.start_seconds));
        }
        let candidates: &[_] = match &result.classification {
            Classification::AutoMatched(c) => std::slice::from_ref(c),
            Classification::NeedsReview(cands) => cands.as_slice(),
            Classification::Unmatched => &[],
        };
        for c in candidates {
            println!(
                "       {:.3}  {} - {} ({}; {})",
                c.overall_similarity,
                c.artist,
                c.title,
                c.song_id,
                c.reason.describe()
            );
        }
    }
}

fn apply_decisions(
    packager: &mut Packager,
    store: &SqliteStore,
    path: &Path,
    progress: &Progress,
) -> Result<usize> {
    let decisions: Vec<Decision> = serde_json::from_str(&read_input(path)?)
        .with_context(|| format!("Bad decisions JSON in {}", path.display()))?;

    let pb = progress.bar(decisions.len() as u64, "Applying review decisions");
    let mut applied = 0;
    for (i, decision) in decisions.into_iter().enumerate() {
        if let Resolution::Song(song_id) = &decision.resolution {
            if !store.song_exists(song_id)? {
                bail!("Decision for entry {} names unknown song {:?}", decision.index, song_id);
            }
        }
        // A decision on an auto-matched entry overrides it
        if packager.matched_song(decision.index).is_some() {
            packager.retract(decision.index)?;
        }
        packager
            .resolve(decision.index, decision.resolution)
            .with_context(|| format!("Decision for entry {}", decision.index))?;
        applied += 1;
        pb.inc(1);
        progress.log("decisions", (i + 1) as u64, pb.length().unwrap_or(0), 50);
    }
    pb.finish_with_message(format!("Applied {} review decisions", applied));
    Ok(applied)
}

fn run_import(args: ImportArgs, progress: Progress) -> Result<()> {
    let start = Instant::now();
    let config = load_config(args.config.as_deref())?;
    let sung_date = NaiveDate::parse_from_str(&args.date, "%Y-%m-%d")
        .with_context(|| format!("Invalid --date {:?}, expected YYYY-MM-DD", args.date))?;
    let text = read_input(&args.comments)?;

    let store = SqliteStore::open(&args.db)?;
    let catalog = store.load_catalog()?;
    log::info!("loaded {} catalog songs from {}", catalog.len(), args.db.display());

    let spinner = progress.spinner("Matching entries");
    let (results, stats) = run_matching(&text, &catalog, &config);
    spinner.finish_with_message(format!("Matched {} entries", results.len()));
    if let Some(path) = &args.stats {
        stats.write_to_file(path)?;
    }

    let mut packager = Packager::new(results);
    if packager.is_empty() {
        log::warn!("no timestamp entries found in {}", args.comments.display());
    }
    if let Some(path) = &args.decisions {
        apply_decisions(&mut packager, &store, path, &progress)?;
    }
    let pending = packager.pending_reviews().len();
    if pending > 0 {
        log::warn!(
            "{} of {} entries still need review and are left out of this batch",
            pending,
            packager.len()
        );
    }

    let existing = match video_key(&args.video_url) {
        Some(video_id) => store.load_existing_clips(&video_id)?,
        None => vec![],
    };
    let dedup = Deduplicator::new(&existing, config.dedup_window_secs);
    let target = BatchTarget {
        video_url: args.video_url,
        sung_date,
        description: args.description,
    };
    let batch = packager.prepare(&target, &dedup);

    let report = if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&batch.records)?);
        batch.abandon("dry run")
    } else {
        let uploader = Uploader::spawn(store);
        let report = uploader.submit(batch).context("Uploader stopped before replying")?;
        if uploader.shutdown().is_err() {
            bail!("Uploader thread panicked");
        }
        report
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    log::info!("import finished in {}", format_duration(start.elapsed()));
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let progress = Progress::new(cli.log_only);

    match cli.command {
        Command::Parse { comments } => {
            let entries = extract_entries(&read_input(&comments)?);
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        Command::Match {
            comments,
            catalog,
            config,
            json,
            video_url,
            stats,
        } => {
            let config = load_config(config.as_deref())?;
            let catalog = load_catalog(&catalog)?;
            let text = read_input(&comments)?;

            let spinner = progress.spinner("Matching entries");
            let (results, match_stats) = run_matching(&text, &catalog, &config);
            spinner.finish_and_clear();

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                let video_id = video_url.as_deref().and_then(extract_video_id);
                print_results(&results, video_id.as_deref());
            }
            if stats {
                match_stats.log_phase("match");
            }
        }
        Command::Import(args) => run_import(args, progress)?,
        Command::InitDb { db, catalog } => {
            let mut store = SqliteStore::open(&db)?;
            if let Some(path) = catalog {
                let count = store.import_catalog_json(&read_input(&path)?)?;
                println!("Imported {} songs into {}", count, db.display());
            } else {
                println!("Initialized {}", db.display());
            }
        }
    }

    Ok(())
}
