//! Serializable view of a finished resolution pass: the plan entries plus
//! one status per root request. This is the document the emission back end
//! consumes.

use plait_common::model::edge::Edge;
use plait_common::model::tags::TagSet;
use serde::Serialize;

use crate::plan::Component;
use crate::resolve::Resolution;

#[derive(Debug, Clone, Serialize)]
pub struct PlanDocument {
    pub components: Vec<Component>,
    pub roots: Vec<RootEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RootEntry {
    pub requested: String,
    pub tags: TagSet,
    #[serde(flatten)]
    pub status: RootStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RootStatus {
    Satisfied { edge: Edge },
    Failed { error: String },
}

impl Resolution {
    pub fn document(&self) -> PlanDocument {
        PlanDocument {
            components: self.plan.components().to_vec(),
            roots: self
                .roots
                .iter()
                .map(|outcome| RootEntry {
                    requested: outcome.claim.requested.to_string(),
                    tags: outcome.claim.tags.clone(),
                    status: match &outcome.result {
                        Ok(edge) => RootStatus::Satisfied { edge: edge.clone() },
                        Err(e) => RootStatus::Failed {
                            error: e.to_string(),
                        },
                    },
                })
                .collect(),
        }
    }

    /// Every failure from the pass, root failures first, in request order.
    pub fn failure_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .failed_roots()
            .map(|outcome| {
                let error = outcome
                    .result
                    .as_ref()
                    .err()
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                format!("root {}: {error}", outcome.claim)
            })
            .collect();
        lines.extend(self.diagnostics.iter().map(|e| e.to_string()));
        lines
    }
}
