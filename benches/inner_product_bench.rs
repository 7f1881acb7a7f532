use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use dense_layer::KernelVariant;
use dense_layer::matrix::naive::sgemv_naive;
use std::hint::black_box;

fn bench_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("sgemv");

    for &size in &[256usize, 1024, 2048] {
        let (m, n) = (size, size);
        let x: Vec<f32> = (0..n).map(|i| (i % 100) as f32 * 0.01).collect();
        let w: Vec<f32> = (0..m * n).map(|i| (i % 100) as f32 * 0.01 - 0.5).collect();
        let b = vec![0.1f32; m];
        let mut y = vec![0.0f32; m];

        group.bench_with_input(BenchmarkId::new("naive", size), &size, |bench, _| {
            bench.iter(|| sgemv_naive(black_box(&x), black_box(&w), Some(&b[..]), &mut y, true))
        });

        for variant in [KernelVariant::DirectBiasRelu, KernelVariant::TransposeBiasRelu] {
            let kernel = variant.kernel();
            for threads in [1usize, 4] {
                let id = BenchmarkId::new(format!("{}/{}T", variant, threads), size);
                group.bench_with_input(id, &size, |bench, _| {
                    bench.iter(|| kernel(n, m, black_box(&x), black_box(&w), &mut y, threads, &b))
                });
            }
        }
    }

    group.finish();
}

criterion_group!(benches, bench_kernels);
criterion_main!(benches);
