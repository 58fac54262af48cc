use criterion::{black_box, criterion_group, criterion_main, Criterion};
use reg_thompson::compile;

const PATTERNS: &[&str] = &[
    "a(a|b)",
    "(a|b)*abb",
    "((ab|cd)+e?)*f",
    "(a1|b2|c3|d4|e5)+(x|y)?z*",
];

fn criterion_benchmark_compile(c: &mut Criterion) {
    c.bench_function("compile thompson nfa", |b| {
        b.iter(|| {
            for pattern in PATTERNS {
                compile(black_box(pattern)).unwrap();
            }
        })
    });
    c.bench_function("compile regex crate baseline", |b| {
        b.iter(|| {
            for pattern in PATTERNS {
                regex::Regex::new(black_box(pattern)).unwrap();
            }
        })
    });
}

criterion_group!(benches, criterion_benchmark_compile);
criterion_main!(benches);
