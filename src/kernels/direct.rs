//! Direct fully-connected kernel: one dot product per output row.

use super::for_each_row_chunk;

/// Computes `output = act(W·input + bias)` without any layout assumptions.
///
/// Works for any `input_size`/`output_size`, so it is the fallback when
/// the dimensions aren't multiples of 8. Bias add and ReLU are compile-time
/// switches applied to each output as it is produced.
///
/// # Panics
///
/// Panics if the slice sizes don't match `input_size`/`output_size`.
pub fn fully_connected_inference_direct<const BIAS: bool, const RELU: bool>(
    input_size: usize,
    output_size: usize,
    input: &[f32],
    weights: &[f32],
    output: &mut [f32],
    num_threads: usize,
    bias: &[f32],
) {
    assert_eq!(input.len(), input_size, "input: expected {} elements", input_size);
    assert_eq!(
        weights.len(),
        input_size * output_size,
        "weights: expected {}x{}={} elements",
        output_size,
        input_size,
        input_size * output_size
    );
    assert_eq!(output.len(), output_size, "output: expected {} elements", output_size);
    if BIAS {
        assert_eq!(bias.len(), output_size, "bias: expected {} elements", output_size);
    }

    for_each_row_chunk(output, input_size, 1, num_threads, |first_row, rows| {
        direct_rows::<BIAS, RELU>(first_row, input, weights, bias, rows);
    });
}

fn direct_rows<const BIAS: bool, const RELU: bool>(
    first_row: usize,
    input: &[f32],
    weights: &[f32],
    bias: &[f32],
    rows: &mut [f32],
) {
    let n = input.len();

    for (r, y) in rows.iter_mut().enumerate() {
        let j = first_row + r;
        let w_row = &weights[j * n..(j + 1) * n];

        let mut sum: f32 = w_row.iter().zip(input).map(|(w, x)| w * x).sum();
        if BIAS {
            sum += bias[j];
        }
        if RELU {
            sum = sum.max(0.0);
        }
        *y = sum;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::naive::sgemv_naive;

    fn check<const BIAS: bool, const RELU: bool>(n: usize, m: usize, threads: usize) {
        let x: Vec<f32> = (0..n).map(|i| ((i % 7) as f32) - 3.0).collect();
        let w: Vec<f32> = (0..m * n).map(|i| ((i % 11) as f32) * 0.25 - 1.0).collect();
        let b: Vec<f32> = (0..m).map(|i| (i % 5) as f32 - 2.0).collect();

        let mut expected = vec![0.0; m];
        sgemv_naive(&x, &w, BIAS.then_some(&b[..]), &mut expected, RELU);

        let mut got = vec![f32::NAN; m];
        fully_connected_inference_direct::<BIAS, RELU>(n, m, &x, &w, &mut got, threads, &b);

        for j in 0..m {
            assert!(
                (expected[j] - got[j]).abs() < 1e-3,
                "{}x{} bias={} relu={}: mismatch at {}: expected {}, got {}",
                m,
                n,
                BIAS,
                RELU,
                j,
                expected[j],
                got[j]
            );
        }
    }

    #[test]
    fn test_direct_odd_sizes() {
        for (n, m) in [(1, 1), (15, 10), (7, 3), (33, 17)] {
            check::<false, false>(n, m, 1);
            check::<true, false>(n, m, 1);
            check::<false, true>(n, m, 1);
            check::<true, true>(n, m, 1);
        }
    }

    #[test]
    fn test_direct_threaded() {
        check::<true, true>(1023, 515, 4);
        check::<false, false>(1023, 515, 3);
    }

    #[test]
    fn test_direct_ignores_bias_when_disabled() {
        let x = [1.0, 1.0];
        let w = [1.0, 2.0, 3.0, 4.0];
        let mut y = [0.0; 2];
        fully_connected_inference_direct::<false, false>(2, 2, &x, &w, &mut y, 1, &[]);
        assert_eq!(y, [3.0, 7.0]);
    }

    #[test]
    #[should_panic(expected = "bias: expected 2 elements")]
    fn test_direct_rejects_short_bias() {
        let mut y = [0.0; 2];
        fully_connected_inference_direct::<true, false>(2, 2, &[1.0; 2], &[1.0; 4], &mut y, 1, &[1.0]);
    }
}
