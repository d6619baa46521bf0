//! Gating centrality: how many clock genes gate each target

use gating_core::{Error, Result};
use gating_correction::Hypothesis;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Default number of gating clock genes that makes a target a critical node
pub const DEFAULT_CRITICAL_THRESHOLD: usize = 4;

/// Fan-in of FDR-significant clock genes for one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatingCentrality {
    pub target_gene: String,
    /// Distinct clock genes significant after FDR in at least one unit, sorted
    pub clock_genes: Vec<String>,
    pub gating_count: usize,
    pub is_critical_node: bool,
}

/// Centrality of every target that appears in `hypotheses`, ordered by target
pub fn gating_centrality(
    hypotheses: &[Hypothesis],
    threshold: usize,
) -> Result<Vec<GatingCentrality>> {
    if threshold == 0 {
        return Err(Error::InvalidParameter(
            "critical node threshold must be positive".to_string(),
        ));
    }

    let mut fan_in: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for h in hypotheses {
        let clocks = fan_in.entry(h.target_gene.as_str()).or_default();
        if h.significant_after_fdr {
            clocks.insert(h.clock_gene.as_str());
        }
    }

    Ok(fan_in
        .into_iter()
        .map(|(target, clocks)| GatingCentrality {
            target_gene: target.to_string(),
            gating_count: clocks.len(),
            is_critical_node: clocks.len() >= threshold,
            clock_genes: clocks.into_iter().map(str::to_string).collect(),
        })
        .collect())
}

/// Targets flagged as critical nodes
pub fn critical_nodes(centrality: &[GatingCentrality]) -> Vec<&GatingCentrality> {
    centrality.iter().filter(|c| c.is_critical_node).collect()
}
