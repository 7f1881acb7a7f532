//! Benchmark runner for the inner product kernels.

use dense_layer::matrix::naive::sgemv_naive;
use dense_layer::{Blob, InnerProductLayer, KernelVariant, Layer, LayerParameter, RuntimeParameter};
use std::time::Instant;

fn main() {
    env_logger::init();

    println!("=== Inner Product Kernel Benchmark ===\n");

    let sizes = [256, 1024, 4096];
    let iterations = 20;
    let threads = [1, 4];
    let mut all_results = Vec::new();

    #[cfg(target_arch = "x86_64")]
    println!(
        "CPU Features: AVX2={}, FMA={}\n",
        is_x86_feature_detected!("avx2"),
        is_x86_feature_detected!("fma")
    );

    for &size in &sizes {
        println!("Weights: {}×{}", size, size);
        println!("{}", "-".repeat(50));

        let (m, n) = (size, size);
        let x: Vec<f32> = (0..n).map(|i| (i % 100) as f32 * 0.01).collect();
        let w: Vec<f32> = (0..m * n).map(|i| (i % 100) as f32 * 0.01 - 0.5).collect();
        let b: Vec<f32> = vec![0.1; m];

        let mut results: Vec<(String, (f64, f64))> = vec![(
            "Naive".to_string(),
            bench_fn(m, n, iterations, |y| sgemv_naive(&x, &w, Some(&b[..]), y, true)),
        )];

        for variant in [KernelVariant::DirectBiasRelu, KernelVariant::TransposeBiasRelu] {
            for &t in &threads {
                let kernel = variant.kernel();
                results.push((
                    format!("{} ({}T)", variant, t),
                    bench_fn(m, n, iterations, |y| kernel(n, m, &x, &w, y, t, &b)),
                ));
            }
        }

        results.push((
            "Layer forward".to_string(),
            bench_layer(m, n, iterations, w.clone(), b.clone(), &x).unwrap_or_else(|err| {
                eprintln!("layer setup failed: {}", err);
                (f64::NAN, f64::NAN)
            }),
        ));

        let baseline_time = results[0].1.0;
        for (i, (name, (time_ms, gflops))) in results.iter().enumerate() {
            let speedup = baseline_time / time_ms;
            println!(
                "{}. {:26} {:8.3} ms  {:6.2} GFLOPS  ({:.1}×)",
                i + 1,
                name,
                time_ms,
                gflops,
                speedup
            );
        }
        println!();

        all_results.push((size, results));
    }

    print_summary_table(&all_results);
}

/// Time `f` writing into an `m`-element output.
fn bench_fn<F>(m: usize, n: usize, iterations: usize, mut f: F) -> (f64, f64)
where
    F: FnMut(&mut [f32]),
{
    // Warmup
    let mut y = vec![0.0; m];
    f(&mut y);

    let start = Instant::now();
    for _ in 0..iterations {
        f(&mut y);
    }
    let avg = start.elapsed().as_secs_f64() / iterations as f64;
    let gflops = 2.0 * (m * n) as f64 / avg / 1e9;
    (avg * 1000.0, gflops)
}

/// Time a full layer forward pass, kernel picked by `init`.
fn bench_layer(
    m: usize,
    n: usize,
    iterations: usize,
    w: Vec<f32>,
    b: Vec<f32>,
    x: &[f32],
) -> dense_layer::Result<(f64, f64)> {
    let weights = vec![Blob::matrix(m, n, w), Blob::vector(b)];
    let runtime = RuntimeParameter::default();
    let param = LayerParameter::inner_product("bench", true);
    let input = Blob::vector(x.to_vec());

    let mut layer = InnerProductLayer::new(&param, &weights, &runtime)?;
    let mut output = layer.generate_top_blobs(&input)?;
    layer.init()?;

    // Surface shape errors once; the timed loop then only repeats a checked call
    layer.forward(&input, &mut output)?;

    Ok(bench_fn(m, n, iterations, |_| {
        if let Err(err) = layer.forward(&input, &mut output) {
            log::error!("forward failed mid-benchmark: {}", err);
        }
    }))
}

#[allow(clippy::type_complexity)]
fn print_summary_table(all_results: &[(usize, Vec<(String, (f64, f64))>)]) {
    println!("\n{}", "=".repeat(90));
    println!("SUMMARY");
    println!("{}", "=".repeat(90));

    println!(
        "\n{:<28} {:>14} {:>14} {:>14} {:>12}",
        "Method", "256×256", "1024×1024", "4096×4096", "Speedup"
    );
    println!("{}", "-".repeat(90));

    let num_methods = all_results[0].1.len();

    for method_idx in 0..num_methods {
        let method_name = &all_results[0].1[method_idx].0;

        let mut gflops_list = Vec::new();
        let mut speedups = Vec::new();

        for (_, results) in all_results {
            let (time_ms, gflops) = results[method_idx].1;
            let baseline_time = results[0].1.0;
            gflops_list.push(gflops);
            speedups.push(baseline_time / time_ms);
        }

        let avg_speedup: f64 = speedups.iter().sum::<f64>() / speedups.len() as f64;

        println!(
            "{:<28} {:>10.2} GF  {:>10.2} GF  {:>10.2} GF  {:>10.1}×",
            method_name, gflops_list[0], gflops_list[1], gflops_list[2], avg_speedup
        );
    }

    println!("{}", "=".repeat(90));
    println!("\nGF = GFLOPS (billion floating point operations per second)");
    println!("Speedup relative to Naive. Higher is better.\n");
}
