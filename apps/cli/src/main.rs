//! Command line front end for the fetch pipeline
//!
//! Resolves the monthly archives currently in the bucket, fetches them in
//! parallel into an existing folder and pulls the city boundary alongside.
//! The process exits non-zero when any file or the boundary could not be
//! fetched, so scripted runs can tell a partial sync from a clean one.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use fetcher::{
    BoundaryOutcome, ConsoleProgressReporter, FetchConfig, Fetcher, IntoProgressCallback,
    SyncOptions, human_size,
};

#[derive(Parser, Debug)]
#[command(version, about = "Fetch monthly ride archives and the city boundary")]
struct Cli {
    /// Existing folder the files are materialized into
    #[arg(short, long, default_value = "data")]
    out: PathBuf,

    /// Months to fetch, as a range "1-3" or a list "1,7,12" (default: all)
    #[arg(short, long)]
    months: Option<String>,

    /// Re-fetch files that already exist
    #[arg(long)]
    overwrite: bool,

    /// Number of parallel downloads
    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    /// Print per-file progress
    #[arg(short, long)]
    verbose: bool,
}

/// Parse the `--months` grammar into a window filter.
///
/// Comma-separated terms, each a single month or an `a-b` range, so
/// `"1-3"`, `"1,7,12"` and `"1,3-5"` all work. Values outside 1..=12 are
/// dropped rather than rejected and a backwards range contributes
/// nothing; when no months survive, no filter is applied at all.
fn parse_months(raw: &str) -> anyhow::Result<Option<BTreeSet<u32>>> {
    let mut months = BTreeSet::new();
    for term in raw.split(',') {
        let term = term.trim();
        if term.is_empty() {
            continue;
        }
        if let Some((start, end)) = term.split_once('-') {
            let start: u32 = start
                .trim()
                .parse()
                .with_context(|| format!("bad start of month range '{term}'"))?;
            let end: u32 = end
                .trim()
                .parse()
                .with_context(|| format!("bad end of month range '{term}'"))?;
            months.extend(start..=end);
        } else {
            let month: u32 = term
                .parse()
                .with_context(|| format!("bad month '{term}'"))?;
            months.insert(month);
        }
    }

    months.retain(|m| (1..=12).contains(m));
    if months.is_empty() {
        Ok(None)
    } else {
        Ok(Some(months))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if !cli.out.is_dir() {
        bail!(
            "output folder '{}' does not exist; create it first",
            cli.out.display()
        );
    }

    let months = match &cli.months {
        Some(raw) => parse_months(raw)?,
        None => None,
    };

    let workers = cli.workers.max(1);
    let fetcher = Fetcher::new(FetchConfig::default())?;
    println!(
        "Syncing {} {} into {} ({} workers{})",
        fetcher.config().year,
        fetcher.config().dataset,
        cli.out.display(),
        workers,
        if cli.overwrite { ", overwrite" } else { "" }
    );
    if let Some(ref filter) = months {
        let listed: Vec<String> = filter.iter().map(|m| m.to_string()).collect();
        println!("Months: {}", listed.join(", "));
    }

    let options = SyncOptions::new(&cli.out)
        .with_months(months)
        .with_overwrite(cli.overwrite)
        .with_concurrency(workers);
    let progress = ConsoleProgressReporter::new(cli.verbose).into_callback();

    let outcome = fetcher.sync(&options, Some(progress)).await?;

    println!();
    println!("Resolved {} monthly archives in the bucket", outcome.resolved);
    println!(
        "{} files: {} fetched, {} skipped, {} failed ({} transferred)",
        outcome.report.len(),
        outcome.report.succeeded(),
        outcome.report.skipped(),
        outcome.report.failed(),
        human_size(outcome.report.bytes_transferred()),
    );
    for failure in outcome.report.failures() {
        match failure.error {
            Some(ref detail) => eprintln!("  failed: {}: {}", failure.request.locator.url, detail),
            None => eprintln!("  failed: {}", failure.request.locator.url),
        }
    }

    let boundary_failed = match outcome.boundary {
        Ok(BoundaryOutcome::Fetched { size, fallback }) => {
            if fallback {
                println!("Boundary fetched from fallback endpoint ({})", human_size(size));
            } else {
                println!("Boundary fetched ({})", human_size(size));
            }
            false
        }
        Ok(BoundaryOutcome::Skipped { size }) => {
            println!("Boundary already present ({})", human_size(size));
            false
        }
        Err(e) => {
            eprintln!("Boundary fetch failed: {e}");
            true
        }
    };

    if outcome.report.failed() > 0 || boundary_failed {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_lists() {
        let months = parse_months("1,7,12").unwrap();
        assert_eq!(months, Some([1, 7, 12].into_iter().collect()));
    }

    #[test]
    fn parses_ranges() {
        let months = parse_months("1-3").unwrap();
        assert_eq!(months, Some([1, 2, 3].into_iter().collect()));
    }

    #[test]
    fn single_month_is_a_list_of_one() {
        let months = parse_months("9").unwrap();
        assert_eq!(months, Some([9].into_iter().collect()));
    }

    #[test]
    fn parses_mixed_lists_and_ranges() {
        let months = parse_months("1,3-5").unwrap();
        assert_eq!(months, Some([1, 3, 4, 5].into_iter().collect()));

        let months = parse_months("2-3,7,10-11").unwrap();
        assert_eq!(months, Some([2, 3, 7, 10, 11].into_iter().collect()));
    }

    #[test]
    fn backwards_range_contributes_nothing() {
        assert_eq!(parse_months("3-1").unwrap(), None);
        let months = parse_months("7,3-1").unwrap();
        assert_eq!(months, Some([7].into_iter().collect()));
    }

    #[test]
    fn blank_terms_are_ignored() {
        let months = parse_months("1,,2").unwrap();
        assert_eq!(months, Some([1, 2].into_iter().collect()));
    }

    #[test]
    fn out_of_range_values_are_dropped() {
        let months = parse_months("0,5,13").unwrap();
        assert_eq!(months, Some([5].into_iter().collect()));
    }

    #[test]
    fn nothing_in_range_means_no_filter() {
        assert_eq!(parse_months("14-20").unwrap(), None);
        assert_eq!(parse_months("").unwrap(), None);
        assert_eq!(parse_months("   ").unwrap(), None);
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert!(parse_months("january").is_err());
        assert!(parse_months("1-").is_err());
        assert!(parse_months("-5").is_err());
        assert!(parse_months("1,x,2").is_err());
    }
}
