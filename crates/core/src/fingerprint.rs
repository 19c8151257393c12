//! Content-addressed cache keys for the Recommendation Cache (spec §4.H).

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the recommendation was computed for: a specific target adapter (for
/// "more like this") or a free-text prompt (for "suggest adapters for this
/// prompt"). Never both — these are mutually exclusive query shapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintKind {
    ByAdapter,
    ByPrompt,
}

/// A single, hashable key identifying one recommendation query. Two queries
/// that would compute the same result must produce an equal fingerprint
/// (spec §4.H single-flight / cache-key requirement).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecommendationFingerprint {
    pub kind: FingerprintKind,
    /// Either the target adapter id, or a stable hash of the normalized
    /// prompt text — never the raw prompt, to keep the key small and avoid
    /// leaking prompt contents into log lines keyed on this fingerprint.
    pub target_id_or_prompt_hash: String,
    pub k: u32,
    /// Adapter weights rounded to 2 decimal places, so that
    /// cosmetically distinct but practically identical queries share a
    /// cache entry.
    pub weights_rounded: Vec<(String, i64)>,
    /// Sorted, deduplicated flags that affect recommendation content
    /// (e.g. "include_inactive").
    pub flags: Vec<String>,
}

impl RecommendationFingerprint {
    pub fn by_adapter(adapter_id: impl Into<String>, k: u32) -> Self {
        Self {
            kind: FingerprintKind::ByAdapter,
            target_id_or_prompt_hash: adapter_id.into(),
            k,
            weights_rounded: Vec::new(),
            flags: Vec::new(),
        }
    }

    pub fn by_prompt(prompt: &str, k: u32) -> Self {
        Self {
            kind: FingerprintKind::ByPrompt,
            target_id_or_prompt_hash: Self::hash_prompt(prompt),
            k,
            weights_rounded: Vec::new(),
            flags: Vec::new(),
        }
    }

    pub fn with_weights(mut self, weights: &[(String, f64)]) -> Self {
        let mut rounded: Vec<(String, i64)> = weights
            .iter()
            .map(|(name, w)| (name.clone(), (w * 100.0).round() as i64))
            .collect();
        rounded.sort();
        self.weights_rounded = rounded;
        self
    }

    pub fn with_flags(mut self, flags: &[&str]) -> Self {
        let mut flags: Vec<String> = flags.iter().map(|f| f.to_string()).collect();
        flags.sort();
        flags.dedup();
        self.flags = flags;
        self
    }

    /// A short, stable, non-reversible digest of normalized prompt text.
    /// Normalization (lowercase + collapsed whitespace) means prompts that
    /// differ only cosmetically share a cache entry.
    fn hash_prompt(prompt: &str) -> String {
        let normalized: String = prompt
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        std::hash::Hash::hash(&normalized, &mut hasher);
        format!("{:016x}", std::hash::Hasher::finish(&hasher))
    }
}

impl fmt::Display for RecommendationFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}:{}:{}",
            self.kind, self.target_id_or_prompt_hash, self.k
        )
    }
}

#[cfg(test)]
#[path = "fingerprint_tests.rs"]
mod tests;
