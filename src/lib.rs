//! Fully-connected (inner product) layer for CPU inference.
//!
//! The layer computes `y = act(W·x + b)` for a flattened input `x`, where
//! the bias add and a ReLU absorbed from the next layer are folded into
//! the matrix-vector kernel itself. Eight kernel specializations exist
//! (8-aligned or direct, with or without bias, with or without ReLU);
//! one is picked when the layer is initialized and used for every
//! forward pass after that.
//!
//! ## Usage
//!
//! ```
//! use dense_layer::{Blob, InnerProductLayer, Layer, LayerParameter, RuntimeParameter};
//!
//! let weights = vec![
//!     Blob::matrix(2, 3, vec![1.0, 0.0, -1.0,
//!                             2.0, 2.0, 2.0]),
//!     Blob::vector(vec![0.5, -1.0]),
//! ];
//! let runtime = RuntimeParameter::default();
//! let param = LayerParameter::inner_product("fc1", true);
//!
//! let mut fc = InnerProductLayer::new(&param, &weights, &runtime).unwrap();
//! let input = Blob::vector(vec![1.0, 2.0, 3.0]);
//! let mut output = fc.generate_top_blobs(&input).unwrap();
//! fc.init().unwrap();
//! fc.forward(&input, &mut output).unwrap();
//!
//! assert_eq!(output.data(), &[-1.5, 11.0]);
//! ```
//!
//! ## What's inside
//!
//! - 8-row blocked kernel (AVX2+FMA, portable fallback) for aligned shapes
//! - Direct kernel for everything else
//! - Row-partitioned multi-threading, adaptive to problem size
//! - Scratch arena with guaranteed release for init-time preprocessing

pub mod blob;
pub mod error;
pub mod kernels;
pub mod layer;
pub mod matrix;
pub mod mempool;
pub mod param;

pub use blob::Blob;
pub use error::{LayerError, MemPoolError, Result};
pub use kernels::{KernelVariant, SgemvKernel};
pub use layer::Layer;
pub use layer::inner_product::InnerProductLayer;
pub use mempool::MemPool;
pub use param::{InnerProductParameter, LayerParameter, RuntimeParameter};
