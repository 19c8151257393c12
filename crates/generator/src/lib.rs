//! The Generator Client and Status Normalizer (spec §4.B, §4.C): the only
//! code in the workspace that talks to the external image generator over
//! HTTP, and the single place external status vocabulary is mapped onto
//! [`loraflow_core::CanonicalStatus`].

mod client;
mod error;
mod normalize;

pub use client::{GenerationRequest, GenerationStatus, Generator, GeneratorClient};
pub use error::GeneratorError;
pub use normalize::{normalize, Normalized};
