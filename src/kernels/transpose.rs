//! 8-row blocked fully-connected kernel.
//!
//! Output rows are processed eight at a time: eight accumulators walk the
//! input in steps of eight lanes, then a transpose-and-add reduction turns
//! them into eight outputs at once. That reduction is where bias and ReLU
//! are folded in, so the output vector is written exactly once.
//!
//! Weights are read in their original row-major layout.

use super::{ALIGNMENT, for_each_row_chunk};

/// Computes `output = act(W·input + bias)` for 8-aligned shapes.
///
/// Uses AVX2+FMA when the CPU has it, otherwise a portable 8-lane loop
/// the compiler can vectorize.
///
/// # Panics
///
/// Panics if `input_size` or `output_size` isn't a multiple of 8, or if
/// the slice sizes don't match them.
pub fn fully_connected_transpose_inference<const BIAS: bool, const RELU: bool>(
    input_size: usize,
    output_size: usize,
    input: &[f32],
    weights: &[f32],
    output: &mut [f32],
    num_threads: usize,
    bias: &[f32],
) {
    assert!(
        input_size % ALIGNMENT == 0 && output_size % ALIGNMENT == 0,
        "transpose kernel needs 8-aligned sizes, got {}x{}",
        output_size,
        input_size
    );
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

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            for_each_row_chunk(output, input_size, ALIGNMENT, num_threads, |first_row, rows| {
                for (b, block) in rows.chunks_exact_mut(ALIGNMENT).enumerate() {
                    let j = first_row + b * ALIGNMENT;
                    // SAFETY: features checked above; sizes asserted on entry.
                    unsafe {
                        block_8_avx2::<BIAS, RELU>(input, weights, bias, j, block);
                    }
                }
            });
            return;
        }
    }

    for_each_row_chunk(output, input_size, ALIGNMENT, num_threads, |first_row, rows| {
        for (b, block) in rows.chunks_exact_mut(ALIGNMENT).enumerate() {
            let j = first_row + b * ALIGNMENT;
            block_8_portable::<BIAS, RELU>(input, weights, bias, j, block);
        }
    });
}

/// Rows `j..j+8` of the output, portable version.
fn block_8_portable<const BIAS: bool, const RELU: bool>(
    input: &[f32],
    weights: &[f32],
    bias: &[f32],
    j: usize,
    out: &mut [f32],
) {
    let n = input.len();
    let mut acc = [[0.0f32; ALIGNMENT]; ALIGNMENT];

    for (p, x) in input.chunks_exact(ALIGNMENT).enumerate() {
        for (r, lanes) in acc.iter_mut().enumerate() {
            let w = &weights[(j + r) * n + p * ALIGNMENT..][..ALIGNMENT];
            for l in 0..ALIGNMENT {
                lanes[l] += w[l] * x[l];
            }
        }
    }

    for (r, y) in out.iter_mut().enumerate() {
        let mut sum: f32 = acc[r].iter().sum();
        if BIAS {
            sum += bias[j + r];
        }
        if RELU {
            sum = sum.max(0.0);
        }
        *y = sum;
    }
}

/// Rows `j..j+8` of the output with AVX2+FMA.
///
/// # Safety
///
/// Caller must ensure:
/// - CPU supports AVX2 and FMA
/// - `input.len()` is a multiple of 8
/// - `weights` holds rows `j..j+8` of length `input.len()`
/// - `out` holds 8 floats and, when `BIAS`, `bias` holds `j + 8` floats
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma")]
#[allow(unsafe_op_in_unsafe_fn)]
unsafe fn block_8_avx2<const BIAS: bool, const RELU: bool>(
    input: &[f32],
    weights: &[f32],
    bias: &[f32],
    j: usize,
    out: &mut [f32],
) {
    use std::arch::x86_64::*;

    let n = input.len();
    let x_ptr = input.as_ptr();
    let w = weights.as_ptr().add(j * n);

    let mut c0 = _mm256_setzero_ps();
    let mut c1 = _mm256_setzero_ps();
    let mut c2 = _mm256_setzero_ps();
    let mut c3 = _mm256_setzero_ps();
    let mut c4 = _mm256_setzero_ps();
    let mut c5 = _mm256_setzero_ps();
    let mut c6 = _mm256_setzero_ps();
    let mut c7 = _mm256_setzero_ps();

    for p in (0..n).step_by(ALIGNMENT) {
        let x = _mm256_loadu_ps(x_ptr.add(p));

        c0 = _mm256_fmadd_ps(_mm256_loadu_ps(w.add(p)), x, c0);
        c1 = _mm256_fmadd_ps(_mm256_loadu_ps(w.add(n + p)), x, c1);
        c2 = _mm256_fmadd_ps(_mm256_loadu_ps(w.add(2 * n + p)), x, c2);
        c3 = _mm256_fmadd_ps(_mm256_loadu_ps(w.add(3 * n + p)), x, c3);
        c4 = _mm256_fmadd_ps(_mm256_loadu_ps(w.add(4 * n + p)), x, c4);
        c5 = _mm256_fmadd_ps(_mm256_loadu_ps(w.add(5 * n + p)), x, c5);
        c6 = _mm256_fmadd_ps(_mm256_loadu_ps(w.add(6 * n + p)), x, c6);
        c7 = _mm256_fmadd_ps(_mm256_loadu_ps(w.add(7 * n + p)), x, c7);
    }

    // Pairwise adds leave row r's partial sums in lane r of each half
    let t0 = _mm256_hadd_ps(c0, c1);
    let t1 = _mm256_hadd_ps(c2, c3);
    let t2 = _mm256_hadd_ps(c4, c5);
    let t3 = _mm256_hadd_ps(c6, c7);
    let u0 = _mm256_hadd_ps(t0, t1);
    let u1 = _mm256_hadd_ps(t2, t3);
    let mut y = _mm256_add_ps(
        _mm256_permute2f128_ps(u0, u1, 0x20),
        _mm256_permute2f128_ps(u0, u1, 0x31),
    );

    if BIAS {
        y = _mm256_add_ps(y, _mm256_loadu_ps(bias.as_ptr().add(j)));
    }
    if RELU {
        y = _mm256_max_ps(y, _mm256_setzero_ps());
    }

    _mm256_storeu_ps(out.as_mut_ptr(), y);
}
