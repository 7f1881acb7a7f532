//! Layer and runtime configuration.

use std::num::NonZeroUsize;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::mempool::MemPool;

/// Inner-product specific settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InnerProductParameter {
    #[serde(default)]
    pub bias_term: bool,
}

/// Static description of one layer in a model.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LayerParameter {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub layer_type: String,
    #[serde(default)]
    pub inner_product_param: Option<InnerProductParameter>,
}

impl LayerParameter {
    /// Inner-product layer description with the given bias setting.
    pub fn inner_product(name: impl Into<String>, bias_term: bool) -> Self {
        Self {
            name: name.into(),
            layer_type: "InnerProduct".to_string(),
            inner_product_param: Some(InnerProductParameter { bias_term }),
        }
    }

    /// `bias_term` from the inner-product settings, false when absent.
    pub fn bias_term(&self) -> bool {
        self.inner_product_param
            .map(|p| p.bias_term)
            .unwrap_or(false)
    }
}

/// Per-engine resources shared by every layer.
#[derive(Debug)]
pub struct RuntimeParameter {
    num_threads: usize,
    mempool: MemPool,
}

impl RuntimeParameter {
    pub fn new(num_threads: usize, mempool: MemPool) -> Self {
        Self {
            num_threads: num_threads.max(1),
            mempool,
        }
    }

    /// Worker threads a forward pass may use, at least 1.
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Scratch pool shared by layers during `init`.
    pub fn mempool(&self) -> &MemPool {
        &self.mempool
    }
}

impl Default for RuntimeParameter {
    fn default() -> Self {
        let threads = thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self::new(threads, MemPool::new())
    }
}
