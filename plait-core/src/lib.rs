// plait-core/src/lib.rs
pub mod claims;
pub mod extension;
pub mod plan;
pub mod registry;
pub mod report;
pub mod resolve;

// Re-export key types
pub use extension::{Extension, Synthesized, TemplateLibrary};
pub use plan::{Component, Plan, Role};
pub use registry::{Access, Candidate, Registry};
pub use report::{PlanDocument, RootEntry, RootStatus};
pub use resolve::{Resolution, Resolver, RootOutcome};
