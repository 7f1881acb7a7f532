//! Fully-connected (inner product) layer.

use log::{debug, trace};

use super::{Layer, RELU_TYPE};
use crate::blob::Blob;
use crate::error::{LayerError, Result};
use crate::kernels::{ALIGNMENT, KernelVariant, SgemvKernel, is_aligned};
use crate::matrix::transpose::transpose_blocks;
use crate::param::{LayerParameter, RuntimeParameter};

/// Type identity reported by [`InnerProductLayer`].
pub const INNER_PRODUCT_TYPE: &str = "InnerProduct";

/// Dense layer computing `y = act(W·x + b)` over a flattened input.
///
/// Weight and bias storage is borrowed from the weight store for the
/// layer's whole lifetime; the layer never copies it. The output is
/// always a flat `1 × output_channels × 1 × 1` blob.
#[derive(Debug)]
pub struct InnerProductLayer<'w> {
    name: String,
    runtime: &'w RuntimeParameter,

    kernel_data: &'w [f32],
    bias_data: Option<&'w [f32]>,
    kernel_cols: usize,

    input_channels: usize,
    input_width: usize,
    input_height: usize,
    input_size: usize,
    output_channels: usize,
    output_size: usize,
    bound: bool,

    bias_term: bool,
    fuse_relu: bool,
    sgemv: Option<(KernelVariant, SgemvKernel)>,
}

impl<'w> InnerProductLayer<'w> {
    /// Builds the layer over `weight_blobs`: `[0]` is the
    /// `output_channels × input_channels` weight matrix, `[1]` the bias
    /// vector when `bias_term` is set.
    pub fn new(
        param: &LayerParameter,
        weight_blobs: &'w [Blob],
        runtime: &'w RuntimeParameter,
    ) -> Result<Self> {
        let bias_term = param.bias_term();

        let weights = weight_blobs.first().ok_or(LayerError::MissingWeights)?;
        let output_channels = weights.num();
        let kernel_cols = weights.channels() * weights.height() * weights.width();
        if weights.data().len() != output_channels * kernel_cols {
            return Err(LayerError::WeightShape {
                rows: output_channels,
                cols: kernel_cols,
                found: weights.data().len(),
            });
        }

        let bias_data = if bias_term {
            let bias = weight_blobs.get(1).ok_or(LayerError::MissingBias {
                found: weight_blobs.len(),
            })?;
            if bias.data().len() != output_channels {
                return Err(LayerError::BiasShape {
                    expected: output_channels,
                    found: bias.data().len(),
                });
            }
            Some(bias.data())
        } else {
            None
        };

        debug!(
            "{}: inner product {}x{}, bias={}",
            param.name, output_channels, kernel_cols, bias_term
        );

        Ok(Self {
            name: param.name.clone(),
            runtime,
            kernel_data: weights.data(),
            bias_data,
            kernel_cols,
            input_channels: weights.channels(),
            input_width: 0,
            input_height: 0,
            input_size: 0,
            output_channels,
            output_size: 0,
            bound: false,
            bias_term,
            fuse_relu: false,
            sgemv: None,
        })
    }

    fn bind_input(&mut self, bottom: &Blob) -> Result<()> {
        let input_size = bottom.data_size();
        if input_size != self.kernel_cols {
            return Err(LayerError::InputShape {
                expected: self.kernel_cols,
                found: input_size,
            });
        }
        self.input_width = bottom.width();
        self.input_height = bottom.height();
        self.input_channels = bottom.channels();
        self.input_size = input_size;
        self.bound = true;
        Ok(())
    }

    /// Kernel chosen by [`Layer::init`], `None` before that.
    pub fn variant(&self) -> Option<KernelVariant> {
        self.sgemv.map(|(variant, _)| variant)
    }

    /// Whether `init` has picked a kernel.
    pub fn is_initialized(&self) -> bool {
        self.sgemv.is_some()
    }

    /// Whether the bias blob is added.
    pub fn bias_term(&self) -> bool {
        self.bias_term
    }

    /// Whether a following ReLU was fused in.
    pub fn fuse_relu(&self) -> bool {
        self.fuse_relu
    }

    /// Channels of the bound input blob.
    pub fn input_channels(&self) -> usize {
        self.input_channels
    }

    /// Width of the bound input blob.
    pub fn input_width(&self) -> usize {
        self.input_width
    }

    /// Height of the bound input blob.
    pub fn input_height(&self) -> usize {
        self.input_height
    }

    /// Element count of the bound input, equal to the weight columns.
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Output channel count, the weight matrix rows.
    pub fn output_channels(&self) -> usize {
        self.output_channels
    }

    /// Element count of the top blob.
    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// Borrowed weight matrix, row-major `output_channels × input_size`.
    pub fn weights(&self) -> &'w [f32] {
        self.kernel_data
    }
}

impl Layer for InnerProductLayer<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &str {
        INNER_PRODUCT_TYPE
    }

    fn generate_top_blobs(&mut self, bottom: &Blob) -> Result<Blob> {
        self.bind_input(bottom)?;
        let mut top = Blob::new(1, self.output_channels, 1, 1);
        top.alloc();
        self.output_size = top.data_size();
        Ok(top)
    }

    /// Runs the weight preprocessing and picks the kernel.
    ///
    /// Aligned shapes get their weights block-transposed into an arena
    /// scratch buffer. The buffer goes back to the pool before `init`
    /// returns, on every path, and the kernels keep reading the original
    /// row-major weights.
    fn init(&mut self) -> Result<()> {
        if !self.bound {
            return Err(LayerError::Unbound);
        }

        let pool = self.runtime.mempool();
        let mut buffer = pool.alloc(self.input_size * ALIGNMENT)?;
        let aligned = is_aligned(self.input_size, self.output_size);
        if aligned {
            transpose_blocks(
                self.kernel_data,
                self.output_size / ALIGNMENT,
                self.input_size,
                &mut buffer,
            );
            debug!(
                "{}: block-transposed {} weight tiles",
                self.name,
                self.output_size / ALIGNMENT
            );
        }
        pool.free(buffer)?;

        let variant = KernelVariant::select(aligned, self.bias_term, self.fuse_relu);
        self.sgemv = Some((variant, variant.kernel()));
        debug!(
            "{}: selected {} kernel for {}x{}",
            self.name, variant, self.output_size, self.input_size
        );
        Ok(())
    }

    /// Fails with a shape error, leaving `top` untouched, if `bottom` or
    /// `top` don't hold `input_size`/`output_size` elements.
    fn forward(&self, bottom: &Blob, top: &mut Blob) -> Result<()> {
        let (variant, sgemv) = self.sgemv.ok_or(LayerError::NotInitialized)?;
        if bottom.data().len() != self.input_size {
            return Err(LayerError::InputShape {
                expected: self.input_size,
                found: bottom.data().len(),
            });
        }
        if top.data().len() != self.output_size {
            return Err(LayerError::OutputShape {
                expected: self.output_size,
                found: top.data().len(),
            });
        }
        let num_threads = self.runtime.num_threads();
        trace!(
            "{}: forward {} {}x{} on {} threads",
            self.name, variant, self.output_size, self.input_size, num_threads
        );

        sgemv(
            self.input_size,
            self.output_size,
            bottom.data(),
            self.kernel_data,
            top.data_mut(),
            num_threads,
            self.bias_data.unwrap_or(&[]),
        );
        Ok(())
    }

    fn forward_reshape(&mut self, bottom: &Blob, top: &mut Blob) -> Result<()> {
        if self.sgemv.is_none() {
            return Err(LayerError::NotInitialized);
        }
        self.bind_input(bottom)?;
        top.reshape_with_realloc(1, self.output_channels, 1, 1);
        self.output_size = top.data_size();
        self.forward(bottom, top)
    }

    fn fuse(&mut self, next: &dyn Layer) -> Result<bool> {
        if self.sgemv.is_some() {
            return Err(LayerError::FuseAfterInit);
        }
        if next.type_name() == RELU_TYPE {
            debug!("{}: fused {} ({})", self.name, next.name(), RELU_TYPE);
            self.fuse_relu = true;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
