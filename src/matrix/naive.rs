/// Reference matrix-vector product: `y = W·x (+ b) (clamped at 0)`.
///
/// This is the textbook loop: one dot product per output row, bias and
/// ReLU applied afterwards as separate passes. The fused kernels are
/// checked against it.
///
/// Use this as a correctness baseline, not for performance.
///
/// # Arguments
///
/// * `input` - Input vector x (length `input_size`)
/// * `weights` - Weight matrix W (`output_size × input_size`), row-major
/// * `bias` - Optional bias b (length `output_size`)
/// * `output` - Output vector y (length `output_size`), overwritten
/// * `relu` - Clamp negative outputs to zero
pub fn sgemv_naive(
    input: &[f32],
    weights: &[f32],
    bias: Option<&[f32]>,
    output: &mut [f32],
    relu: bool,
) {
    let input_size = input.len();
    for (j, out) in output.iter_mut().enumerate() {
        let mut sum = 0.0f32;
        for p in 0..input_size {
            sum += input[p] * weights[j * input_size + p];
        }
        *out = sum;
    }

    if let Some(bias) = bias {
        for (out, b) in output.iter_mut().zip(bias) {
            *out += b;
        }
    }

    if relu {
        for out in output.iter_mut() {
            *out = out.max(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sgemv_naive_2x3() {
        let x = [1.0, 2.0, 3.0];
        let w = [1.0, 0.0, -1.0, 2.0, 2.0, 2.0];
        let mut y = [0.0; 2];

        sgemv_naive(&x, &w, None, &mut y, false);
        assert_eq!(y, [-2.0, 12.0]);

        sgemv_naive(&x, &w, Some(&[1.0, -20.0]), &mut y, true);
        assert_eq!(y, [0.0, 0.0]);

        sgemv_naive(&x, &w, Some(&[3.0, 1.0]), &mut y, true);
        assert_eq!(y, [1.0, 13.0]);
    }
}
