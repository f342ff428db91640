// plait-common/src/lib.rs
pub mod config;
pub mod error;
pub mod manifest;
pub mod model;

// Re-export key types
pub use config::Config;
pub use error::{PlaitError, Result};
pub use model::{Cardinality, Claim, DeclFlags, Declaration, Edge, TagMatchPolicy, TagSet, TypeToken};
