//! Simulate a candidate threshold config against real comments
//! Usage: cargo run --release --bin simulate -- <catalog_db> <config.toml> <comments>...

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use std::path::Path;

use clipmatch::config::MatchConfig;
use clipmatch::extract::format_timestamp;
use clipmatch::models::{Classification, MatchingStats};
use clipmatch::pipeline::run_matching;
use clipmatch::store::SqliteStore;

fn top_song(classification: &Classification) -> Option<&str> {
    match classification {
        Classification::AutoMatched(c) => Some(&c.song_id),
        Classification::NeedsReview(cands) => cands.first().map(|c| c.song_id.as_str()),
        Classification::Unmatched => None,
    }
}

fn print_stats(name: &str, stats: &MatchingStats) {
    println!(
        "{:<10} auto {:>5}  review {:>5}  unmatched {:>5}  ({:.1}% auto)",
        name,
        stats.auto_matched,
        stats.needs_review,
        stats.unmatched,
        stats.auto_match_rate()
    );
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: simulate <catalog_db> <config.toml> <comments>...");
        std::process::exit(1);
    }

    let catalog = SqliteStore::open(Path::new(&args[1]))?.load_catalog()?;
    let baseline = MatchConfig::default();
    let candidate = MatchConfig::load(Path::new(&args[2]))?;
    eprintln!("Loaded {} catalog songs", catalog.len());

    let mut base_total = MatchingStats::default();
    let mut cand_total = MatchingStats::default();
    // (old label, new label) -> count
    let mut transitions: FxHashMap<(&'static str, &'static str), u64> = FxHashMap::default();
    let mut top_changed = 0u64;
    let mut examples: Vec<String> = Vec::new();

    for path in &args[3..] {
        let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
        let (base_results, base_stats) = run_matching(&text, &catalog, &baseline);
        let (cand_results, cand_stats) = run_matching(&text, &catalog, &candidate);

        for (total, run) in [(&mut base_total, &base_stats), (&mut cand_total, &cand_stats)] {
            total.entries_parsed += run.entries_parsed;
            total.auto_matched += run.auto_matched;
            total.needs_review += run.needs_review;
            total.unmatched += run.unmatched;
        }

        for (old, new) in base_results.iter().zip(&cand_results) {
            let key = (old.classification.label(), new.classification.label());
            *transitions.entry(key).or_default() += 1;

            if top_song(&old.classification) != top_song(&new.classification) {
                top_changed += 1;
            }
            if key.0 != key.1 && examples.len() < 30 {
                examples.push(format!(
                    "[{} -> {}] {} {} - {}",
                    key.0,
                    key.1,
                    format_timestamp(old.entry.start_seconds),
                    old.entry.artist,
                    old.entry.title
                ));
            }
        }
    }

    println!("\n=== SIMULATION RESULTS ===\n");
    println!("Entries: {}", base_total.entries_parsed);
    print_stats("baseline", &base_total);
    print_stats("candidate", &cand_total);
    println!("Top candidate changed: {}", top_changed);

    println!("\n=== TRANSITIONS ===\n");
    let mut rows: Vec<_> = transitions.into_iter().filter(|((a, b), _)| a != b).collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1));
    for ((old, new), count) in &rows {
        println!("{:<13} -> {:<13} {:>7}", old, new, count);
    }

    println!("\n=== EXAMPLES ===\n");
    for line in &examples {
        println!("{}", line);
    }

    Ok(())
}
