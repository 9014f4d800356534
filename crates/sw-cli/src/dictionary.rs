use std::fs;
use std::path::Path;
use std::time::Instant;

use log::info;
use sw_compiler::{build_filter, optimize_words, parse_dictionary, Variant};
use sw_core::{FilterConfig, WordFilter};

#[derive(Debug, Clone)]
pub struct LoadStats {
    pub files: usize,
    pub lines: usize,
    pub words_before: usize,
    pub words_after: usize,
    pub words_deduped: usize,
    pub load_ms: f64,
    pub build_ms: f64,
}

/// Read and merge word lists, dropping repeats across files.
pub fn load_words(inputs: &[String]) -> Result<(Vec<String>, LoadStats), String> {
    if inputs.is_empty() {
        return Err("No dictionary files specified".to_string());
    }

    let start = Instant::now();
    let mut all_words = Vec::new();
    let mut total_lines = 0usize;

    for (list_id, path) in inputs.iter().enumerate() {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read '{}': {}", path, e))?;

        let line_count = content.lines().count();
        total_lines += line_count;

        let words = parse_dictionary(&content);
        info!(
            "[{}] {} - {} lines, {} words",
            list_id,
            Path::new(path).file_name().unwrap_or_default().to_string_lossy(),
            line_count,
            words.len()
        );

        all_words.extend(words);
    }

    let optimize_stats = optimize_words(&mut all_words);

    let stats = LoadStats {
        files: inputs.len(),
        lines: total_lines,
        words_before: optimize_stats.before,
        words_after: optimize_stats.after,
        words_deduped: optimize_stats.deduped,
        load_ms: start.elapsed().as_secs_f64() * 1000.0,
        build_ms: 0.0,
    };

    Ok((all_words, stats))
}

/// Load word lists and build a filter over them.
pub fn load_filter(
    inputs: &[String],
    variant: Variant,
    config: &FilterConfig,
) -> Result<(Box<dyn WordFilter>, Vec<String>, LoadStats), String> {
    let (words, mut stats) = load_words(inputs)?;

    let build_start = Instant::now();
    let filter = build_filter(words.clone(), variant, config)
        .map_err(|e| format!("Failed to build {} filter: {}", variant, e))?;
    stats.build_ms = build_start.elapsed().as_secs_f64() * 1000.0;

    Ok((filter, words, stats))
}
