//! Layer interface used by the graph executor.
//!
//! The executor owns the blobs and drives each layer through a fixed
//! lifecycle:
//!
//! 1. construct from a [`LayerParameter`](crate::param::LayerParameter)
//!    and the layer's weight blobs
//! 2. [`Layer::generate_top_blobs`] to bind the input shape
//! 3. optionally [`Layer::fuse`] with the following layer
//! 4. [`Layer::init`] once
//! 5. [`Layer::forward`] / [`Layer::forward_reshape`] once per inference pass

pub mod inner_product;

use crate::blob::Blob;
use crate::error::Result;

/// Type identity of the ReLU activation layer, the only fusion peer
/// the inner product layer accepts.
pub const RELU_TYPE: &str = "ReLU";

/// A compute operator in the execution graph.
pub trait Layer {
    /// Instance name from the model description.
    fn name(&self) -> &str;

    /// Operator type identity, e.g. `"InnerProduct"`.
    fn type_name(&self) -> &str;

    /// Whether this layer may be absorbed into the layer before it.
    fn fusible(&self) -> bool {
        false
    }

    /// Binds the input shape and returns a freshly allocated output blob.
    fn generate_top_blobs(&mut self, bottom: &Blob) -> Result<Blob>;

    /// One-time setup after shapes are bound and fusion is settled.
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Computes `top` from `bottom` using the shapes bound so far.
    fn forward(&self, bottom: &Blob, top: &mut Blob) -> Result<()>;

    /// Re-binds shapes from `bottom`, resizes `top`, then runs [`Layer::forward`].
    fn forward_reshape(&mut self, bottom: &Blob, top: &mut Blob) -> Result<()>;

    /// Tries to absorb `next` into this layer.
    ///
    /// Returns `Ok(true)` when the executor should drop `next` from the
    /// graph, `Ok(false)` when no fusion happened.
    fn fuse(&mut self, _next: &dyn Layer) -> Result<bool> {
        Ok(false)
    }
}
