use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use ccbf_core::{
    check_words,
    consts::{DEFAULT_FALSE_POSITIVE_RATE, DEFAULT_FILTER_PATH},
    build_filter_file, load_filter_file, Bloom,
};

#[derive(Parser)]
#[command(name = "ccspell", version, about = "Spell checker backed by a bloom filter")]
struct Cli {
    /// Log progress to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Build a filter file from a line-delimited word list
    Build {
        words: PathBuf,
        #[arg(long, default_value = DEFAULT_FILTER_PATH)]
        output: PathBuf,
        #[arg(long, default_value_t = DEFAULT_FALSE_POSITIVE_RATE)]
        fp_rate: f64,
    },

    /// Report which words are not in the filter
    Check {
        #[arg(long, default_value = DEFAULT_FILTER_PATH)]
        filter: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
        #[arg(required = true)]
        words: Vec<String>,
    },

    /// Show filter parameters and occupancy
    Info {
        #[arg(long, default_value = DEFAULT_FILTER_PATH)]
        filter: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Serialize)]
struct FilterInfo {
    hash_count: u32,
    bit_count: u32,
    set_bits: usize,
    fill_ratio: f64,
    estimated_fpr: f64,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_filter(path: &Path) -> Result<Bloom> {
    load_filter_file(path).with_context(|| format!("loading filter {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.cmd {
        Cmd::Build { words, output, fp_rate } => {
            if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
            }
            let report = build_filter_file(&words, &output, fp_rate)
                .with_context(|| format!("building {} from {}", output.display(), words.display()))?;
            println!("no.of words: {}", report.words);
            println!(
                "wrote {} (k={}, m={}, expected fpr≈{:.4})",
                report.path.display(),
                report.hash_count,
                report.bit_count,
                report.expected_fpr
            );
        }
        Cmd::Check { filter, json, words } => {
            let bloom = open_filter(&filter)?;
            let checks = check_words(&bloom, &words);
            if json {
                println!("{}", serde_json::to_string_pretty(&checks)?);
            } else {
                let mut out = String::from("These words are spelt wrong:");
                for c in checks.iter().filter(|c| !c.present) {
                    out.push_str(&format!("\n {}", c.word));
                }
                println!("{out}");
            }
        }
        Cmd::Info { filter, json } => {
            let bloom = open_filter(&filter)?;
            let info = FilterInfo {
                hash_count: bloom.hash_count(),
                bit_count: bloom.bit_count(),
                set_bits: bloom.count_ones(),
                fill_ratio: bloom.fill_ratio(),
                estimated_fpr: bloom.estimated_fpr(),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("filter   : {}", filter.display());
                println!("hashes   : {}", info.hash_count);
                println!("bits     : {}", info.bit_count);
                println!("set      : {}  fill≈{:.2}", info.set_bits, info.fill_ratio);
                println!("fpr(est) : {:.4}", info.estimated_fpr);
            }
        }
    }
    Ok(())
}
