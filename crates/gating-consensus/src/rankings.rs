//! Per-unit discovery rates and gene rankings across units

use gating_correction::Hypothesis;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

/// Share of tested pairs that reached significance in one unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitDiscoveryRate {
    pub unit: String,
    pub tested: usize,
    /// Pairs whose Bonferroni pair p-value is below alpha
    pub significant_bonferroni: usize,
    pub significant_fdr: usize,
    /// `significant_bonferroni / tested`
    pub bonferroni_rate: f64,
    /// `significant_fdr / tested`
    pub fdr_rate: f64,
}

/// Discovery rates of every unit that appears in `hypotheses`, ordered by unit
pub fn discovery_rates(hypotheses: &[Hypothesis]) -> Vec<UnitDiscoveryRate> {
    let mut counts: BTreeMap<&str, (usize, usize, usize)> = BTreeMap::new();
    for h in hypotheses {
        let entry = counts.entry(h.unit.as_str()).or_default();
        entry.0 += 1;
        entry.1 += usize::from(h.significant);
        entry.2 += usize::from(h.significant_after_fdr);
    }

    counts
        .into_iter()
        .map(|(unit, (tested, bonferroni, fdr))| UnitDiscoveryRate {
            unit: unit.to_string(),
            tested,
            significant_bonferroni: bonferroni,
            significant_fdr: fdr,
            bonferroni_rate: bonferroni as f64 / tested as f64,
            fdr_rate: fdr as f64 / tested as f64,
        })
        .collect()
}

/// Which side of the pair a ranking is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneRole {
    Target,
    Clock,
}

impl GeneRole {
    fn gene<'a>(&self, h: &'a Hypothesis) -> &'a str {
        match self {
            GeneRole::Target => &h.target_gene,
            GeneRole::Clock => &h.clock_gene,
        }
    }

    fn partner<'a>(&self, h: &'a Hypothesis) -> &'a str {
        match self {
            GeneRole::Target => &h.clock_gene,
            GeneRole::Clock => &h.target_gene,
        }
    }
}

/// How widely one gene is involved in FDR-significant pairs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneRanking {
    pub gene: String,
    pub role: GeneRole,
    /// Units with at least one FDR-significant pair involving the gene
    pub units_significant: usize,
    /// FDR-significant (unit, pair) records involving the gene
    pub pairs_significant: usize,
    /// Genes on the other side of those pairs, sorted
    pub partners: Vec<String>,
}

/// Genes in `role` ranked by the number of units where they are significant.
///
/// Ties break on significant pairs, then on name. Genes never significant
/// after FDR are left out; at most `limit` genes are returned.
pub fn top_genes(hypotheses: &[Hypothesis], role: GeneRole, limit: usize) -> Vec<GeneRanking> {
    let mut tally: BTreeMap<&str, (BTreeSet<&str>, usize, BTreeSet<&str>)> = BTreeMap::new();
    for h in hypotheses.iter().filter(|h| h.significant_after_fdr) {
        let (units, pairs, partners) = tally.entry(role.gene(h)).or_default();
        units.insert(h.unit.as_str());
        *pairs += 1;
        partners.insert(role.partner(h));
    }

    let mut ranked: Vec<GeneRanking> = tally
        .into_iter()
        .map(|(gene, (units, pairs, partners))| GeneRanking {
            gene: gene.to_string(),
            role,
            units_significant: units.len(),
            pairs_significant: pairs,
            partners: partners.into_iter().map(str::to_string).collect(),
        })
        .collect();
    // BTreeMap order keeps names ascending within ties
    ranked.sort_by_key(|r| Reverse((r.units_significant, r.pairs_significant)));
    ranked.truncate(limit);
    ranked
}
