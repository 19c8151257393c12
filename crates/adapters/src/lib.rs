//! Read-only adapter catalog (spec §3.3, §4.G collaborator).
//!
//! The coordinator consults this registry to resolve `AdapterId`s named in a
//! generation request into full [`Adapter`] records (weight, trigger words,
//! file path). The catalog itself is populated out-of-band — from a TOML
//! file at startup, or by test code — never by the request path.

mod catalog;

pub use catalog::{AdapterCatalog, CatalogError};
