//! Benchmarks for the two filter variants.
//!
//! Both filters share one synthetic dictionary; texts mix clean and dirty
//! lines so the scan loop sees misses, failure-chain walks and matches.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use sw_core::{DoubleArrayFilter, FilterConfig, SensitiveWordFilter, WordFilter};

fn generate_words(count: usize) -> Vec<String> {
    let stems = ["spam", "scam", "违禁", "敏感词", "bad", "abuse"];
    (0..count)
        .map(|i| format!("{}{}", stems[i % stems.len()], i / stems.len()))
        .collect()
}

fn generate_texts(count: usize, words: &[String]) -> Vec<String> {
    (0..count)
        .map(|i| {
            if i % 3 == 0 {
                format!("this line mentions {} once, near the end", words[(i * 7) % words.len()])
            } else {
                format!("an ordinary sentence about nothing in particular number {i}")
            }
        })
        .collect()
}

fn build_filters(words: &[String]) -> Vec<(&'static str, Box<dyn WordFilter>)> {
    let config = FilterConfig::default().with_telemetry(false);
    vec![
        (
            "compact",
            Box::new(SensitiveWordFilter::new(words, &config).unwrap()) as Box<dyn WordFilter>,
        ),
        (
            "double_array",
            Box::new(DoubleArrayFilter::new(words, &config).unwrap()),
        ),
    ]
}

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");
    for size in [1_000, 10_000] {
        let words = generate_words(size);
        let config = FilterConfig::default();
        group.bench_with_input(BenchmarkId::new("compact", size), &words, |b, words| {
            b.iter(|| SensitiveWordFilter::new(black_box(words.as_slice()), &config).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("double_array", size), &words, |b, words| {
            b.iter(|| DoubleArrayFilter::new(black_box(words.as_slice()), &config).unwrap())
        });
    }
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let words = generate_words(10_000);
    let texts = generate_texts(1_000, &words);
    let bytes: usize = texts.iter().map(String::len).sum();

    let mut group = c.benchmark_group("queries");
    group.throughput(Throughput::Bytes(bytes as u64));
    for (name, filter) in build_filters(&words) {
        group.bench_function(BenchmarkId::new("contains", name), |b| {
            b.iter(|| texts.iter().filter(|t| filter.contains(black_box(t))).count())
        });
        group.bench_function(BenchmarkId::new("match_all", name), |b| {
            b.iter(|| texts.iter().map(|t| filter.match_all(black_box(t)).len()).sum::<usize>())
        });
        group.bench_function(BenchmarkId::new("replace", name), |b| {
            b.iter(|| {
                for text in &texts {
                    black_box(filter.replace(black_box(text), '*'));
                }
            })
        });
        group.bench_function(BenchmarkId::new("batch_replace", name), |b| {
            b.iter(|| black_box(filter.batch_replace(&texts, '*')))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_construction, bench_queries);
criterion_main!(benches);
