use calo_core::{DepositionProfile, Section};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn make_deposits(n: usize) -> Vec<f64> {
    // Deterministic, roughly shower-shaped, with a few negative entries to clip.
    (0..n).map(|i| ((i as f64) * 0.37).sin() * 0.8 + 0.2).collect()
}

fn bench_profile_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("core_profile");

    for n in [16usize, 64, 256] {
        let raw = make_deposits(n);
        group.bench_with_input(BenchmarkId::new("new_and_totals", n), &n, |b, &nn| {
            b.iter(|| {
                let p = DepositionProfile::new(raw.clone(), nn / 2, 10.0).unwrap();
                black_box(p.section_total(Section::Ecal) + p.section_total(Section::Hcal))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_profile_construction);
criterion_main!(benches);
