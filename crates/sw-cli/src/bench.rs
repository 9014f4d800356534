use std::cmp::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use sw_core::WordFilter;

pub const DEFAULT_SEED: u32 = 0x5eed;

/// Operations per latency sample; single calls are too fast to time alone.
const SAMPLE_BATCH_OPS: usize = 64;

pub struct BenchOptions {
    pub variant: String,
    pub threads: usize,
    pub texts: usize,
    pub seconds: f64,
    pub seed: u32,
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct BenchReport {
    pub variant: String,
    pub threads: usize,
    pub texts: usize,
    pub queries: u64,
    pub chars: u64,
    pub elapsed_s: f64,
    pub qps: u64,
    pub chars_per_sec: u64,
    pub p50_us: f64,
    pub p95_us: f64,
    pub p99_us: f64,
    pub matched_pct: f64,
    pub engine: EngineStats,
}

#[derive(Debug, Serialize)]
pub struct EngineStats {
    pub query_count: u64,
    pub total_time_ns: u64,
    pub avg_time_ns: f64,
}

#[derive(Default)]
struct ThreadResult {
    queries: u64,
    chars: u64,
    matched: u64,
    samples_us: Vec<f64>,
}

pub fn run(filter: &dyn WordFilter, words: &[String], opts: &BenchOptions) -> Result<(), String> {
    if opts.threads == 0 {
        return Err("--threads must be at least 1".to_string());
    }
    if opts.seconds <= 0.0 {
        return Err("--seconds must be positive".to_string());
    }

    let texts = generate_texts(opts.texts.max(1), words, opts.seed);
    let duration = Duration::from_secs_f64(opts.seconds);

    if !opts.json {
        println!("============================================================");
        println!("Sensitive-Word Benchmark ({})", opts.variant);
        println!("============================================================");
        println!("Dictionary: {} words", words.len());
        println!("Texts:      {} (seed {})", texts.len(), opts.seed);
        println!("Threads:    {}", opts.threads);
        println!("Duration:   {:.1}s", opts.seconds);
        println!("Warmup...");
    }
    warmup(filter, &texts);

    let start = Instant::now();
    let results: Vec<ThreadResult> = thread::scope(|scope| {
        let handles: Vec<_> = (0..opts.threads)
            .map(|t| {
                let texts = &texts;
                scope.spawn(move || run_thread(filter, texts, t, start + duration))
            })
            .collect();
        handles
            .into_iter()
            .filter_map(|h| h.join().ok())
            .collect()
    });
    let elapsed_s = start.elapsed().as_secs_f64();

    let report = summarize(opts, filter, &texts, results, elapsed_s);
    if opts.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Failed to serialize report: {}", e))?;
        println!("{json}");
    } else {
        println!("{}", format_report(&report));
    }
    Ok(())
}

fn run_thread(filter: &dyn WordFilter, texts: &[String], offset: usize, deadline: Instant) -> ThreadResult {
    let mut result = ThreadResult::default();
    let mut i = offset * 7919;
    let mut batch_ops = 0usize;
    let mut batch_start = Instant::now();

    loop {
        let text = &texts[i % texts.len()];
        if filter.contains(text) {
            result.matched += 1;
        }
        result.queries += 1;
        result.chars += text.chars().count() as u64;
        i += 1;

        batch_ops += 1;
        if batch_ops == SAMPLE_BATCH_OPS {
            let now = Instant::now();
            let us_per_op = (now - batch_start).as_secs_f64() * 1_000_000.0 / SAMPLE_BATCH_OPS as f64;
            result.samples_us.push(us_per_op);
            batch_ops = 0;
            batch_start = now;
            if now >= deadline {
                break;
            }
        }
    }

    filter.flush_stats();
    result
}

fn summarize(
    opts: &BenchOptions,
    filter: &dyn WordFilter,
    texts: &[String],
    results: Vec<ThreadResult>,
    elapsed_s: f64,
) -> BenchReport {
    let mut samples_us = Vec::new();
    let mut queries = 0u64;
    let mut chars = 0u64;
    let mut matched = 0u64;
    for result in results {
        queries += result.queries;
        chars += result.chars;
        matched += result.matched;
        samples_us.extend(result.samples_us);
    }
    samples_us.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let stats = filter.stats();
    BenchReport {
        variant: opts.variant.clone(),
        threads: opts.threads,
        texts: texts.len(),
        queries,
        chars,
        elapsed_s,
        qps: if elapsed_s > 0.0 { (queries as f64 / elapsed_s) as u64 } else { 0 },
        chars_per_sec: if elapsed_s > 0.0 { (chars as f64 / elapsed_s) as u64 } else { 0 },
        p50_us: percentile(&samples_us, 0.50),
        p95_us: percentile(&samples_us, 0.95),
        p99_us: percentile(&samples_us, 0.99),
        matched_pct: if queries > 0 { (matched as f64 / queries as f64) * 100.0 } else { 0.0 },
        engine: EngineStats {
            query_count: stats.query_count,
            total_time_ns: stats.total_time_ns,
            avg_time_ns: stats.avg_time_ns,
        },
    }
}

fn format_report(report: &BenchReport) -> String {
    format!(
        "Results:\n  Queries:    {}\n  Elapsed:    {:.2}s\n  Throughput: {} queries/sec\n  Chars:      {} chars/sec\n  P50:        {:.2} us\n  P95:        {:.2} us\n  P99:        {:.2} us\n  Matched:    {:.1}%\nEngine telemetry:\n  Queries:    {}\n  Avg:        {:.0} ns",
        report.queries,
        report.elapsed_s,
        report.qps,
        report.chars_per_sec,
        report.p50_us,
        report.p95_us,
        report.p99_us,
        report.matched_pct,
        report.engine.query_count,
        report.engine.avg_time_ns,
    )
}

fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let idx = ((values.len() as f64) * p).ceil() as usize;
    let idx = idx.saturating_sub(1).min(values.len() - 1);
    values[idx]
}

fn warmup(filter: &dyn WordFilter, texts: &[String]) {
    for text in texts.iter().take(1000) {
        let _ = filter.contains(text);
    }
}

// =============================================================================
// Text Generation
// =============================================================================

fn create_rng(seed: u32) -> impl FnMut() -> f64 {
    let mut state = seed;
    move || {
        state = state.wrapping_mul(1664525).wrapping_add(1013904223);
        (state as f64) / (u32::MAX as f64)
    }
}

fn pick<'a, T>(items: &'a [T], rand: &mut impl FnMut() -> f64) -> &'a T {
    let idx = (rand() * items.len() as f64).floor() as usize;
    &items[idx.min(items.len() - 1)]
}

fn rand_int(rand: &mut impl FnMut() -> f64, min: usize, max: usize) -> usize {
    let span = max.saturating_sub(min) + 1;
    min + ((rand() * span as f64) as usize).min(span - 1)
}

/// Sentences of filler words; roughly a third carry a dictionary word.
fn generate_texts(count: usize, words: &[String], seed: u32) -> Vec<String> {
    const FILLER: &[&str] = &[
        "the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog", "今天", "天气", "很好",
        "我们", "一起", "去", "公园", "hello", "world", "message", "content", "review", ",", ".",
    ];

    let mut rand = create_rng(seed);
    (0..count)
        .map(|_| {
            let len = rand_int(&mut rand, 4, 40);
            let mut parts: Vec<&str> = (0..len).map(|_| *pick(FILLER, &mut rand)).collect();
            if !words.is_empty() && rand() < 0.33 {
                let at = rand_int(&mut rand, 0, parts.len());
                parts.insert(at, pick(words, &mut rand).as_str());
            }
            parts.join(" ")
        })
        .collect()
}
