//! # Cross-Unit Consensus
//!
//! Combines per-unit [`Hypothesis`](gating_correction::Hypothesis) records
//! for the same (target, clock) pair into a confidence tier, and counts for
//! each target how many clock genes gate it. Per-unit discovery rates and
//! gene rankings summarize the same records by unit and by gene. All of
//! these are pure functions of the hypothesis set.

pub mod centrality;
pub mod consensus;
pub mod rankings;

pub use centrality::{critical_nodes, gating_centrality, GatingCentrality, DEFAULT_CRITICAL_THRESHOLD};
pub use consensus::{
    aggregate, ConfidenceTier, ConsensusPair, ConsensusSummary, EFFECT_SIZE_CAP,
    LOW_TIER_MIN_EFFECT,
};
pub use rankings::{discovery_rates, top_genes, GeneRanking, GeneRole, UnitDiscoveryRate};
