//! Adapter catalog entity (spec §3.1, §3.3).
//!
//! An `Adapter` describes one LoRA weight file available to the generator.
//! The catalog is read-only from the coordinator's perspective; it is
//! populated out-of-band (config file or admin tooling) by `loraflow-adapters`.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a LoRA adapter.
    pub struct AdapterId("adp-");
}

/// One LoRA adapter entry in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adapter {
    pub id: AdapterId,
    pub name: String,
    pub version: String,
    pub file_path: String,
    /// Applied strength when this adapter is composed into a prompt.
    pub weight: f64,
    /// Inactive adapters are excluded from selection but kept for history.
    pub active: bool,
    /// Stable tie-break / display order.
    pub ordinal: u32,
    /// Words the adapter's training data associates with its concept;
    /// appended to the composed prompt (spec §4.G).
    pub trigger_words: Vec<String>,
}

impl Adapter {
    pub fn default_weight() -> f64 {
        1.0
    }
}

crate::builder! {
    pub struct AdapterBuilder => Adapter {
        into {
            name: String = "example-lora",
            version: String = "1.0",
            file_path: String = "/models/loras/example.safetensors",
        }
        set {
            weight: f64 = 1.0,
            active: bool = true,
            ordinal: u32 = 0,
            trigger_words: Vec<String> = Vec::new(),
        }
        computed {
            id: AdapterId = AdapterId::new(),
        }
    }
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
mod tests;
