//! Sensitive-Word CLI
//!
//! CLI tool for checking, scanning and masking text against word lists.

mod bench;
mod dictionary;

use std::io::{self, BufRead, BufWriter, Write};

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use sw_compiler::Variant;
use sw_core::codec::DEFAULT_MAX_CHARS;
use sw_core::config::DEFAULT_CACHE_CAPACITY;
use sw_core::{FilterConfig, IgnorableSet, WordFilter};

#[derive(Parser)]
#[command(name = "sw-cli")]
#[command(about = "Sensitive-word detection and masking tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct FilterArgs {
    /// Dictionary files, one word per line
    #[arg(short, long = "dict", required = true)]
    dict: Vec<String>,

    /// Automaton representation (compact or double-array)
    #[arg(long, default_value_t = Variant::Compact)]
    variant: Variant,

    /// Distinct UTF-16 code units the dictionary may use
    #[arg(long, default_value_t = DEFAULT_MAX_CHARS)]
    max_chars: usize,

    /// Memoized failure transitions kept by the compact variant (0 disables)
    #[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY)]
    cache_capacity: usize,

    /// Extra characters skipped by `check`, on top of the defaults
    #[arg(long)]
    ignore: Option<String>,
}

impl FilterArgs {
    fn config(&self) -> FilterConfig {
        let mut ignorable = IgnorableSet::default();
        if let Some(extra) = &self.ignore {
            for unit in extra.encode_utf16() {
                ignorable.insert(unit);
            }
        }
        FilterConfig::default()
            .with_max_chars(self.max_chars)
            .with_cache_capacity(self.cache_capacity)
            .with_ignorable(ignorable)
    }

    fn load(&self) -> Result<(Box<dyn WordFilter>, Vec<String>, dictionary::LoadStats), String> {
        dictionary::load_filter(&self.dict, self.variant, &self.config())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print whether each input line contains a dictionary word
    Check {
        #[command(flatten)]
        filter: FilterArgs,

        /// Text to check (reads lines from stdin when omitted)
        text: Option<String>,
    },

    /// Print every dictionary word found in each input line as JSON
    Scan {
        #[command(flatten)]
        filter: FilterArgs,

        /// Text to scan (reads lines from stdin when omitted)
        text: Option<String>,
    },

    /// Print each input line with dictionary words masked
    Mask {
        #[command(flatten)]
        filter: FilterArgs,

        /// Mask character
        #[arg(short, long, default_value_t = '*')]
        mask: char,

        /// Text to mask (reads lines from stdin when omitted)
        text: Option<String>,
    },

    /// Dump dictionary and automaton info
    Info {
        #[command(flatten)]
        filter: FilterArgs,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Measure multi-threaded `check` throughput on synthetic text
    Bench {
        #[command(flatten)]
        filter: FilterArgs,

        /// Worker threads
        #[arg(long, default_value_t = 4)]
        threads: usize,

        /// Distinct synthetic texts
        #[arg(long, default_value_t = 10_000)]
        texts: usize,

        /// Run time in seconds
        #[arg(long, default_value_t = 5.0)]
        seconds: f64,

        /// Seed for text generation
        #[arg(long, default_value_t = bench::DEFAULT_SEED)]
        seed: u32,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { filter, text } => cmd_check(&filter, text),
        Commands::Scan { filter, text } => cmd_scan(&filter, text),
        Commands::Mask { filter, mask, text } => cmd_mask(&filter, mask, text),
        Commands::Info { filter, json } => cmd_info(&filter, json),
        Commands::Bench {
            filter,
            threads,
            texts,
            seconds,
            seed,
            json,
        } => cmd_bench(
            &filter,
            bench::BenchOptions {
                variant: filter.variant.to_string(),
                threads,
                texts,
                seconds,
                seed,
                json,
            },
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Run `f` on `text`, or on every stdin line when no text was given.
fn for_each_input(
    text: Option<String>,
    mut f: impl FnMut(&str, &mut dyn Write) -> io::Result<()>,
) -> Result<(), String> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match text {
        Some(text) => f(&text, &mut out).map_err(|e| format!("Failed to write output: {}", e))?,
        None => {
            for line in io::stdin().lock().lines() {
                let line = line.map_err(|e| format!("Failed to read stdin: {}", e))?;
                f(&line, &mut out).map_err(|e| format!("Failed to write output: {}", e))?;
            }
        }
    }

    out.flush().map_err(|e| format!("Failed to write output: {}", e))
}

fn cmd_check(args: &FilterArgs, text: Option<String>) -> Result<(), String> {
    let (filter, _, _) = args.load()?;
    for_each_input(text, |line, out| writeln!(out, "{}", filter.contains(line)))
}

fn cmd_scan(args: &FilterArgs, text: Option<String>) -> Result<(), String> {
    let (filter, _, _) = args.load()?;
    for_each_input(text, |line, out| {
        let found = filter.match_all(line);
        let json = serde_json::to_string(&found).map_err(io::Error::other)?;
        writeln!(out, "{json}")
    })
}

fn cmd_mask(args: &FilterArgs, mask: char, text: Option<String>) -> Result<(), String> {
    let (filter, _, _) = args.load()?;
    for_each_input(text, |line, out| writeln!(out, "{}", filter.replace(line, mask)))
}

#[derive(Serialize)]
struct InfoReport {
    files: usize,
    lines: usize,
    words_before: usize,
    words_after: usize,
    words_deduped: usize,
    variant: &'static str,
    patterns: usize,
    states: usize,
    chars: usize,
    capacity: Option<usize>,
    heap_bytes: Option<usize>,
    read_only: bool,
    load_ms: f64,
    build_ms: f64,
}

fn cmd_info(args: &FilterArgs, json: bool) -> Result<(), String> {
    let (filter, _, stats) = args.load()?;
    let info = filter.info();

    let report = InfoReport {
        files: stats.files,
        lines: stats.lines,
        words_before: stats.words_before,
        words_after: stats.words_after,
        words_deduped: stats.words_deduped,
        variant: info.variant,
        patterns: info.pattern_count,
        states: info.state_count,
        chars: info.char_count,
        capacity: info.capacity,
        heap_bytes: info.heap_bytes,
        read_only: info.read_only,
        load_ms: stats.load_ms,
        build_ms: stats.build_ms,
    };

    if json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Failed to serialize info: {}", e))?;
        println!("{json}");
        return Ok(());
    }

    println!("Dictionary:");
    println!("  Files:       {}", report.files);
    println!("  Lines:       {}", report.lines);
    println!(
        "  Words:       {} -> {} (dedupe removed {})",
        report.words_before, report.words_after, report.words_deduped
    );
    println!();
    println!("Automaton:");
    println!("  Variant:     {}", report.variant);
    println!("  Patterns:    {}", report.patterns);
    println!("  States:      {}", report.states);
    println!("  Chars:       {}", report.chars);
    if let Some(capacity) = report.capacity {
        println!("  Capacity:    {} cells", capacity);
    }
    if let Some(heap_bytes) = report.heap_bytes {
        println!("  Memory:      {:.1} KiB", heap_bytes as f64 / 1024.0);
    }
    println!("  Read-only:   {}", report.read_only);
    println!(
        "  Time:        {:.1}ms (load: {:.1}ms, build: {:.1}ms)",
        report.load_ms + report.build_ms,
        report.load_ms,
        report.build_ms
    );

    Ok(())
}

fn cmd_bench(args: &FilterArgs, opts: bench::BenchOptions) -> Result<(), String> {
    let (filter, words, _) = args.load()?;
    let result = bench::run(filter.as_ref(), &words, &opts);
    filter.shutdown();
    result
}
