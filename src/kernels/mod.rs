//! Fused matrix-vector kernels for the inner product layer.
//!
//! Every kernel computes `y[j] = act(W[j]·x + b[j])` for a row-major
//! `output_size × input_size` weight matrix, with the bias add and ReLU
//! clamp folded into the same pass over the output. The eight
//! specializations come from two families crossed with the bias and
//! ReLU switches:
//!
//! - `transpose`: 8-row blocks, AVX2+FMA when available. Needs both
//!   dimensions to be multiples of 8.
//! - `direct`: plain row-by-row dot products, any shape.
//!
//! A [`KernelVariant`] is resolved once when a layer is initialized and
//! then called through the uniform [`SgemvKernel`] signature.

pub mod direct;
pub mod transpose;

use std::fmt;
use std::thread;

use direct::fully_connected_inference_direct;
use transpose::fully_connected_transpose_inference;

/// Uniform call surface shared by all eight kernels.
///
/// Arguments: `input_size`, `output_size`, `input` (length `input_size`),
/// `weights` (`output_size × input_size`, row-major), `output` (length
/// `output_size`, overwritten), `num_threads`, `bias` (length
/// `output_size`, ignored by the bias-free variants).
pub type SgemvKernel = fn(usize, usize, &[f32], &[f32], &mut [f32], usize, &[f32]);

/// Lane width the transpose family is built around.
pub const ALIGNMENT: usize = 8;

/// One of the eight kernel specializations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelVariant {
    TransposeBiasRelu,
    TransposeBias,
    TransposeRelu,
    Transpose,
    DirectBiasRelu,
    DirectBias,
    DirectRelu,
    Direct,
}

impl KernelVariant {
    /// All variants, transpose family first.
    pub const ALL: [KernelVariant; 8] = [
        KernelVariant::TransposeBiasRelu,
        KernelVariant::TransposeBias,
        KernelVariant::TransposeRelu,
        KernelVariant::Transpose,
        KernelVariant::DirectBiasRelu,
        KernelVariant::DirectBias,
        KernelVariant::DirectRelu,
        KernelVariant::Direct,
    ];

    /// Resolves the variant for an `(aligned, bias, relu)` key.
    pub const fn select(aligned: bool, bias: bool, relu: bool) -> Self {
        match (aligned, bias, relu) {
            (true, true, true) => KernelVariant::TransposeBiasRelu,
            (true, true, false) => KernelVariant::TransposeBias,
            (true, false, true) => KernelVariant::TransposeRelu,
            (true, false, false) => KernelVariant::Transpose,
            (false, true, true) => KernelVariant::DirectBiasRelu,
            (false, true, false) => KernelVariant::DirectBias,
            (false, false, true) => KernelVariant::DirectRelu,
            (false, false, false) => KernelVariant::Direct,
        }
    }

    /// Resolves the variant for concrete vector lengths.
    pub const fn for_shape(input_size: usize, output_size: usize, bias: bool, relu: bool) -> Self {
        Self::select(is_aligned(input_size, output_size), bias, relu)
    }

    pub const fn is_aligned(self) -> bool {
        matches!(
            self,
            KernelVariant::TransposeBiasRelu
                | KernelVariant::TransposeBias
                | KernelVariant::TransposeRelu
                | KernelVariant::Transpose
        )
    }

    pub const fn has_bias(self) -> bool {
        matches!(
            self,
            KernelVariant::TransposeBiasRelu
                | KernelVariant::TransposeBias
                | KernelVariant::DirectBiasRelu
                | KernelVariant::DirectBias
        )
    }

    pub const fn has_relu(self) -> bool {
        matches!(
            self,
            KernelVariant::TransposeBiasRelu
                | KernelVariant::TransposeRelu
                | KernelVariant::DirectBiasRelu
                | KernelVariant::DirectRelu
        )
    }

    /// The kernel function implementing this variant.
    pub fn kernel(self) -> SgemvKernel {
        match self {
            KernelVariant::TransposeBiasRelu => fully_connected_transpose_inference::<true, true>,
            KernelVariant::TransposeBias => fully_connected_transpose_inference::<true, false>,
            KernelVariant::TransposeRelu => fully_connected_transpose_inference::<false, true>,
            KernelVariant::Transpose => fully_connected_transpose_inference::<false, false>,
            KernelVariant::DirectBiasRelu => fully_connected_inference_direct::<true, true>,
            KernelVariant::DirectBias => fully_connected_inference_direct::<true, false>,
            KernelVariant::DirectRelu => fully_connected_inference_direct::<false, true>,
            KernelVariant::Direct => fully_connected_inference_direct::<false, false>,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            KernelVariant::TransposeBiasRelu => "transpose+bias+relu",
            KernelVariant::TransposeBias => "transpose+bias",
            KernelVariant::TransposeRelu => "transpose+relu",
            KernelVariant::Transpose => "transpose",
            KernelVariant::DirectBiasRelu => "direct+bias+relu",
            KernelVariant::DirectBias => "direct+bias",
            KernelVariant::DirectRelu => "direct+relu",
            KernelVariant::Direct => "direct",
        }
    }
}

impl fmt::Display for KernelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Both vector lengths are multiples of [`ALIGNMENT`].
pub const fn is_aligned(input_size: usize, output_size: usize) -> bool {
    input_size % ALIGNMENT == 0 && output_size % ALIGNMENT == 0
}

/// Minimum output rows handed to one worker.
const MIN_ROWS_PER_THREAD: usize = 16;

/// Splits `output` into row ranges and runs `work(first_row, rows)` on each.
///
/// Ranges are multiples of `row_align` rows (except possibly the last).
/// Returns only after every range is done.
pub(crate) fn for_each_row_chunk<F>(
    output: &mut [f32],
    input_size: usize,
    row_align: usize,
    num_threads: usize,
    work: F,
) where
    F: Fn(usize, &mut [f32]) + Sync,
{
    let rows = output.len();
    let threads = choose_thread_count(rows, input_size, num_threads);

    if threads <= 1 {
        work(0, output);
        return;
    }

    let rows_per_thread = rows.div_ceil(threads).next_multiple_of(row_align);
    let work = &work;

    thread::scope(|s| {
        for (tid, chunk) in output.chunks_mut(rows_per_thread).enumerate() {
            s.spawn(move || work(tid * rows_per_thread, chunk));
        }
    });
}

/// Thread count for an `rows × cols` product.
///
/// Small problems stay on one thread because spawn overhead dominates.
fn choose_thread_count(rows: usize, cols: usize, max_threads: usize) -> usize {
    let flops = 2.0 * (rows * cols) as f64;

    const SINGLE_THREAD_THRESHOLD: f64 = 1_000_000.0;

    let optimal_threads = if flops < SINGLE_THREAD_THRESHOLD {
        1
    } else {
        max_threads
    };

    let threads_by_rows = (rows / MIN_ROWS_PER_THREAD).max(1);

    optimal_threads.min(threads_by_rows).min(max_threads).max(1)
}
