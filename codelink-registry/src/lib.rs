//! Reference data and lexical matching for the billing code registry.
//!
//! This crate is the leaf of the engine: it owns the standardized SBS code
//! registry, the fixed-price bundle catalog, and the hashed-token similarity
//! engine the normalizer ranks candidates with. Everything here is pure
//! reference data plus deterministic math; no I/O beyond the CSV loaders.

pub mod bundles;
pub mod registry;
pub mod similarity;
pub mod thresholds;

pub use bundles::{load_bundles, Bundle};
pub use registry::{load_registry, RegistryEntry, SbsRegistry};
pub use similarity::{cosine_similarity, find_candidates, token_vector, tokenize};
