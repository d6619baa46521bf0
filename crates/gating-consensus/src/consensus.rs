//! Consensus of one (target, clock) pair across units

use gating_correction::Hypothesis;
use ordered_float::OrderedFloat;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Stand-in for an infinite f² when averaging effect sizes
pub const EFFECT_SIZE_CAP: f64 = 1e6;

/// Mean f² at or above which a single-unit finding counts as LOW rather
/// than EXPLORATORY
pub const LOW_TIER_MIN_EFFECT: f64 = 0.15;

/// Confidence tier of a pair, strongest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
    Exploratory,
}

impl ConfidenceTier {
    /// Apply the tier rules in order; `None` when nothing was significant
    pub fn assign(fdr_significant: usize, significant: usize, mean_effect: f64) -> Option<Self> {
        match fdr_significant {
            n if n >= 3 => Some(Self::High),
            2 => Some(Self::Medium),
            1 if mean_effect >= LOW_TIER_MIN_EFFECT => Some(Self::Low),
            1 => Some(Self::Exploratory),
            _ if significant > 0 => Some(Self::Exploratory),
            _ => None,
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Exploratory => "EXPLORATORY",
        };
        write!(f, "{s}")
    }
}

/// Aggregate of one (target, clock) pair over the units it was tested in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsensusPair {
    pub target_gene: String,
    pub clock_gene: String,
    /// Units in which the pair was tested, sorted
    pub units: Vec<String>,
    pub units_analyzed: usize,
    pub significant_units: usize,
    pub fdr_significant_units: usize,
    pub mean_p_value: f64,
    pub mean_effect_size: f64,
    pub consensus_score: f64,
    pub confidence_tier: Option<ConfidenceTier>,
}

fn capped_effect(f_squared: f64) -> f64 {
    if f_squared.is_finite() {
        f_squared
    } else {
        EFFECT_SIZE_CAP
    }
}

/// Group hypotheses by (target, clock) and tier each group.
///
/// The result is ordered by (target, clock) and does not depend on the
/// order of `hypotheses`.
pub fn aggregate(hypotheses: &[Hypothesis]) -> Vec<ConsensusPair> {
    let mut groups: BTreeMap<(&str, &str), Vec<&Hypothesis>> = BTreeMap::new();
    for h in hypotheses {
        groups
            .entry((h.target_gene.as_str(), h.clock_gene.as_str()))
            .or_default()
            .push(h);
    }

    let pairs: Vec<ConsensusPair> = groups
        .into_iter()
        .map(|((target, clock), mut group)| {
            group.sort_by_key(|&h| {
                (
                    h.unit.as_str(),
                    OrderedFloat(h.p_value),
                    OrderedFloat(h.effect_size.f_squared),
                )
            });
            let n = group.len();
            let significant = group.iter().filter(|h| h.significant).count();
            let fdr_significant = group.iter().filter(|h| h.significant_after_fdr).count();
            let mean_p_value = group.iter().map(|h| h.p_value).sum::<f64>() / n as f64;
            let mean_effect_size = group
                .iter()
                .map(|h| capped_effect(h.effect_size.f_squared))
                .sum::<f64>()
                / n as f64;

            let mut units: Vec<String> = group.iter().map(|h| h.unit.clone()).collect();
            units.dedup();

            ConsensusPair {
                target_gene: target.to_string(),
                clock_gene: clock.to_string(),
                units,
                units_analyzed: n,
                significant_units: significant,
                fdr_significant_units: fdr_significant,
                mean_p_value,
                mean_effect_size,
                consensus_score: fdr_significant as f64 / n as f64,
                confidence_tier: ConfidenceTier::assign(fdr_significant, significant, mean_effect_size),
            }
        })
        .collect();

    debug!(
        hypotheses = hypotheses.len(),
        pairs = pairs.len(),
        "aggregated consensus"
    );
    pairs
}

/// Count of pairs per tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsensusSummary {
    pub total_pairs: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub exploratory: usize,
    pub untiered: usize,
}

impl ConsensusSummary {
    pub fn from_pairs(pairs: &[ConsensusPair]) -> Self {
        pairs.iter().fold(
            Self {
                total_pairs: pairs.len(),
                ..Default::default()
            },
            |mut summary, pair| {
                match pair.confidence_tier {
                    Some(ConfidenceTier::High) => summary.high += 1,
                    Some(ConfidenceTier::Medium) => summary.medium += 1,
                    Some(ConfidenceTier::Low) => summary.low += 1,
                    Some(ConfidenceTier::Exploratory) => summary.exploratory += 1,
                    None => summary.untiered += 1,
                }
                summary
            },
        )
    }

    /// Pairs in any tier
    pub fn tiered(&self) -> usize {
        self.high + self.medium + self.low + self.exploratory
    }
}

impl fmt::Display for ConsensusSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pairs: {} HIGH, {} MEDIUM, {} LOW, {} EXPLORATORY",
            self.total_pairs, self.high, self.medium, self.low, self.exploratory
        )
    }
}
