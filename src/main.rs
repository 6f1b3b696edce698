//! CLI entrypoint for `credsift`.
//!
//! Parses command-line arguments, validates input files, parses each dump
//! through the library engine (optionally in parallel, with mmap above a size
//! threshold), prints a terminal summary, optionally answers a filter lookup,
//! and writes CSV/JSONL/TXT exports when an output directory is provided.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use credsift::{
    engine::Engine,
    export::{save_failures_txt, save_items_jsonl, save_records_csv},
    io::DEFAULT_MMAP_THRESHOLD_BYTES,
    lookup::{Filter, lookup},
    report::render_summary_with_top,
};
use log::{LevelFilter, error, warn};

#[derive(Parser, Debug)]
#[command(
    name = "credsift",
    version,
    about = "Leaked credential dump normalizer"
)]
struct Args {
    /// Path to the credential dump file(s)
    #[arg(short = 'c', long = "credfile", required = true)]
    credfiles: Vec<PathBuf>,

    /// Path to the output directory
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Print parsed credentials matching an email or domain as JSON
    #[arg(long = "filter")]
    filter: Option<String>,

    /// Override mmap threshold in bytes. If zero, disable mmap.
    #[arg(long = "mmap-threshold", default_value_t = DEFAULT_MMAP_THRESHOLD_BYTES)]
    mmap_threshold: u64,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,

    /// Parse input files in parallel
    #[arg(long = "parallel")]
    parallel: bool,

    /// Log every line that failed to parse
    #[arg(long = "log-failures")]
    log_failures: bool,

    /// Limit number of entries in "Top Reused Secrets"
    #[arg(long = "top", default_value_t = 10)]
    top_limit: usize,

    /// Control color output (auto, always, never)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Suppress summary output (still writes exports if -o is provided)
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

fn verify_inputs(args: &Args) -> Result<()> {
    if args.credfiles.is_empty() {
        bail!("no credential files provided (-c/--credfile)");
    }
    for p in &args.credfiles {
        if !p.exists() {
            bail!("credential file not found: {}", p.display());
        }
    }
    Ok(())
}

fn write_exports(engine: &Engine, outdir: &Path) -> i32 {
    if let Err(e) = fs::create_dir_all(outdir) {
        error!(
            "failed to create output directory {}: {}",
            outdir.display(),
            e
        );
        return 4;
    }
    let ts = chrono::Local::now().format("%Y.%m.%d_%H.%M.%S");
    let csv = outdir.join(format!("credsift_records_{}.csv", ts));
    let jsonl = outdir.join(format!("credsift_items_{}.jsonl", ts));
    let failures = outdir.join(format!("credsift_failures_{}.txt", ts));
    if let Err(e) = save_records_csv(engine, &csv) {
        error!("failed to write {}: {:#}", csv.display(), e);
        return 5;
    }
    if let Err(e) = save_items_jsonl(engine, &jsonl) {
        error!("failed to write {}: {:#}", jsonl.display(), e);
        return 6;
    }
    if engine.failure_count() > 0 {
        if let Err(e) = save_failures_txt(engine, &failures) {
            warn!("failed to write {}: {:#}", failures.display(), e);
        }
    }
    0
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose);
    match args.color {
        ColorChoice::Always => {
            colored::control::set_override(true);
        }
        ColorChoice::Never => {
            colored::control::set_override(false);
        }
        ColorChoice::Auto => {}
    }
    if let Err(e) = verify_inputs(&args) {
        error!("{}", e);
        std::process::exit(2);
    }
    let filter = match args.filter.as_deref().map(Filter::parse).transpose() {
        Ok(f) => f,
        Err(e) => {
            error!("invalid --filter: {}", e);
            std::process::exit(7);
        }
    };

    let mut engine = Engine::new();
    let threshold = if args.mmap_threshold == 0 {
        u64::MAX
    } else {
        args.mmap_threshold
    };
    let load_res = if args.parallel {
        engine.load_from_file_paths_parallel_with_threshold(&args.credfiles, threshold)
    } else {
        engine.load_from_file_paths_with_threshold(&args.credfiles, threshold)
    };
    if let Err(e) = load_res {
        error!("failed to load inputs: {}", e);
        std::process::exit(3);
    }

    if args.log_failures {
        for run in &engine.runs {
            for failure in &run.result.failures {
                warn!("{}: {}", run.source, failure);
            }
        }
    }

    if !args.quiet {
        println!("{}", render_summary_with_top(&engine, args.top_limit));
    }

    if let Some(filter) = filter {
        let resp = lookup(engine.records(), &filter);
        match serde_json::to_string_pretty(&resp) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("failed to encode lookup response: {}", e);
                std::process::exit(8);
            }
        }
    }

    if let Some(outdir) = args.output {
        let code = write_exports(&engine, &outdir);
        if code != 0 {
            std::process::exit(code);
        }
    }
}
