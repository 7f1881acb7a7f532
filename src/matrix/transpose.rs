/// Transpose a matrix: dst = src^T
///
/// Converts from row-major (rows × cols) to row-major (cols × rows).
/// After transpose, what was column j of src becomes row j of dst.
///
/// # Arguments
///
/// * `src` - Source matrix (rows × cols), row-major
/// * `rows` - Number of rows in src
/// * `cols` - Number of columns in src
/// * `dst` - Destination matrix (cols × rows), row-major
///
/// # Example
///
/// ```
/// use dense_layer::matrix::transpose::matrix_transpose;
///
/// let src = vec![1.0, 2.0, 3.0,   // 2×3 matrix
///                4.0, 5.0, 6.0];
/// let mut dst = vec![0.0; 6];      // will be 3×2
///
/// matrix_transpose(&src, 2, 3, &mut dst);
///
/// assert_eq!(dst, vec![1.0, 4.0,   // 3×2 matrix
///                      2.0, 5.0,
///                      3.0, 6.0]);
/// ```
pub fn matrix_transpose(src: &[f32], rows: usize, cols: usize, dst: &mut [f32]) {
    for i in 0..rows {
        for j in 0..cols {
            dst[j * rows + i] = src[i * cols + j];
        }
    }
}

/// Rows per block in the block-transposed weight layout.
pub const BLOCK_ROWS: usize = 8;

/// Block-transpose a weight matrix into scratch.
///
/// Splits `weights` (`num_blocks * 8` rows × `row_len` columns) into
/// 8-row tiles and transposes each tile into `scratch`, which holds one
/// tile (`8 * row_len` floats). Every tile lands in the same scratch
/// region, so after the call it holds the transpose of the last tile.
/// The weights themselves are never written.
///
/// # Panics
///
/// Panics if `weights` has fewer than `num_blocks * 8 * row_len`
/// elements or `scratch` has fewer than `8 * row_len`.
pub fn transpose_blocks(weights: &[f32], num_blocks: usize, row_len: usize, scratch: &mut [f32]) {
    let tile = BLOCK_ROWS * row_len;
    if tile == 0 {
        return;
    }
    assert!(
        weights.len() >= num_blocks * tile,
        "weights: expected at least {} elements, got {}",
        num_blocks * tile,
        weights.len()
    );
    assert!(
        scratch.len() >= tile,
        "scratch: expected at least {} elements, got {}",
        tile,
        scratch.len()
    );

    for block in weights.chunks_exact(tile).take(num_blocks) {
        matrix_transpose(block, BLOCK_ROWS, row_len, &mut scratch[..tile]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transpose_square() {
        let src: Vec<f32> = (0..9).map(|i| i as f32).collect();
        let mut dst = vec![0.0; 9];
        matrix_transpose(&src, 3, 3, &mut dst);
        assert_eq!(dst, vec![0.0, 3.0, 6.0, 1.0, 4.0, 7.0, 2.0, 5.0, 8.0]);
    }

    #[test]
    fn test_transpose_blocks_single_block() {
        let row_len = 4;
        let weights: Vec<f32> = (0..8 * row_len).map(|i| i as f32).collect();
        let mut scratch = vec![0.0; 8 * row_len];

        transpose_blocks(&weights, 1, row_len, &mut scratch);

        for r in 0..8 {
            for c in 0..row_len {
                assert_eq!(scratch[c * 8 + r], weights[r * row_len + c]);
            }
        }
    }

    #[test]
    fn test_transpose_blocks_last_block_wins() {
        let row_len = 8;
        let weights: Vec<f32> = (0..3 * 8 * row_len).map(|i| i as f32).collect();
        let original = weights.clone();
        let mut scratch = vec![0.0; 8 * row_len];

        transpose_blocks(&weights, 3, row_len, &mut scratch);

        let last = &weights[2 * 8 * row_len..];
        let mut expected = vec![0.0; 8 * row_len];
        matrix_transpose(last, 8, row_len, &mut expected);
        assert_eq!(scratch, expected);
        assert_eq!(weights, original);
    }

    #[test]
    fn test_transpose_blocks_zero_blocks() {
        let mut scratch = vec![7.0; 8];
        transpose_blocks(&[], 0, 1, &mut scratch);
        assert!(scratch.iter().all(|&v| v == 7.0));
    }
}
