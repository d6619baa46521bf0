//! Integration tests for consensus tiers and gating centrality

use approx::assert_abs_diff_eq;
use gating_consensus::*;
use gating_correction::{CoefficientInterval, Hypothesis};
use gating_model::{EffectSize, JointTest};
use proptest::prelude::*;

fn hypothesis(
    unit: &str,
    target: &str,
    clock: &str,
    p_value: f64,
    fdr_significant: bool,
    f_squared: f64,
) -> Hypothesis {
    Hypothesis {
        unit: unit.to_string(),
        clock_gene: clock.to_string(),
        target_gene: target.to_string(),
        significant: p_value < 0.05,
        p_value,
        min_term_p_value: p_value / 4.0,
        q_value: if fdr_significant { 0.01 } else { 0.5 },
        significant_after_fdr: fdr_significant,
        effect_size: EffectSize::new(f_squared),
        r_squared_change: 0.1,
        significant_terms: Vec::new(),
        confidence_intervals: vec![CoefficientInterval {
            name: "lag1_cos",
            estimate: 0.2,
            lower: 0.1,
            upper: 0.3,
        }],
        joint_test: JointTest {
            f_statistic: 3.0,
            df_numerator: 4,
            df_denominator: 20,
            p_value,
        },
        eigenvalue: None,
        residuals_misspecified: false,
    }
}

fn study() -> Vec<Hypothesis> {
    let mut hs = Vec::new();
    // Wee1 <- Per2: FDR-significant in 3 of 5 units, small effect
    for (i, unit) in ["adrenal", "heart", "kidney", "liver", "lung"].iter().enumerate() {
        let significant = i < 3;
        hs.push(hypothesis(
            unit,
            "Wee1",
            "Per2",
            if significant { 0.001 } else { 0.3 },
            significant,
            0.10,
        ));
    }
    // Ccnb1 <- Arntl: one unit, medium effect
    hs.push(hypothesis("liver", "Ccnb1", "Arntl", 0.002, true, 0.20));
    // Ccnb1 <- Per2: one unit, small effect
    hs.push(hypothesis("liver", "Ccnb1", "Per2", 0.004, true, 0.05));
    // Myc <- Cry1: raw significance only
    hs.push(hypothesis("heart", "Myc", "Cry1", 0.03, false, 0.4));
    // Myc <- Per2: nothing
    hs.push(hypothesis("heart", "Myc", "Per2", 0.6, false, 0.01));
    hs.push(hypothesis("kidney", "Myc", "Per2", 0.7, false, f64::INFINITY));
    hs
}

fn find<'a>(pairs: &'a [ConsensusPair], target: &str, clock: &str) -> &'a ConsensusPair {
    pairs
        .iter()
        .find(|p| p.target_gene == target && p.clock_gene == clock)
        .unwrap()
}

#[test]
fn test_three_of_five_units_is_high() {
    let pairs = aggregate(&study());
    let pair = find(&pairs, "Wee1", "Per2");
    assert_eq!(pair.units_analyzed, 5);
    assert_eq!(pair.fdr_significant_units, 3);
    assert_eq!(pair.confidence_tier, Some(ConfidenceTier::High));
    assert_abs_diff_eq!(pair.consensus_score, 0.6, epsilon = 1e-12);
    assert_abs_diff_eq!(pair.mean_effect_size, 0.10, epsilon = 1e-12);
    assert_eq!(pair.units, vec!["adrenal", "heart", "kidney", "liver", "lung"]);
}

#[test]
fn test_single_unit_tiers() {
    let pairs = aggregate(&study());
    assert_eq!(
        find(&pairs, "Ccnb1", "Arntl").confidence_tier,
        Some(ConfidenceTier::Low)
    );
    assert_eq!(
        find(&pairs, "Ccnb1", "Per2").confidence_tier,
        Some(ConfidenceTier::Exploratory)
    );
    assert_eq!(
        find(&pairs, "Myc", "Cry1").confidence_tier,
        Some(ConfidenceTier::Exploratory)
    );
    let untested = find(&pairs, "Myc", "Per2");
    assert_eq!(untested.confidence_tier, None);
    // infinite f² is capped before averaging
    assert_abs_diff_eq!(
        untested.mean_effect_size,
        (0.01 + EFFECT_SIZE_CAP) / 2.0,
        epsilon = 1e-6
    );
}

#[test]
fn test_output_is_ordered_by_target_then_clock() {
    let pairs = aggregate(&study());
    let keys: Vec<(&str, &str)> = pairs
        .iter()
        .map(|p| (p.target_gene.as_str(), p.clock_gene.as_str()))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(pairs.len(), 5);
}

#[test]
fn test_idempotence() {
    let hs = study();
    assert_eq!(aggregate(&hs), aggregate(&hs));
}

#[test]
fn test_summary_counts() {
    let summary = ConsensusSummary::from_pairs(&aggregate(&study()));
    assert_eq!(summary.total_pairs, 5);
    assert_eq!(summary.high, 1);
    assert_eq!(summary.medium, 0);
    assert_eq!(summary.low, 1);
    assert_eq!(summary.exploratory, 2);
    assert_eq!(summary.untiered, 1);
    assert_eq!(summary.tiered(), 4);
    assert_eq!(
        summary.to_string(),
        "5 pairs: 1 HIGH, 0 MEDIUM, 1 LOW, 2 EXPLORATORY"
    );
}

#[test]
fn test_gating_centrality() {
    let mut hs = study();
    for clock in ["Arntl", "Cry1", "Nr1d1"] {
        hs.push(hypothesis("liver", "Wee1", clock, 0.001, true, 0.3));
    }
    let centrality = gating_centrality(&hs, DEFAULT_CRITICAL_THRESHOLD).unwrap();
    let wee1 = centrality.iter().find(|c| c.target_gene == "Wee1").unwrap();
    assert_eq!(wee1.gating_count, 4);
    assert!(wee1.is_critical_node);
    assert_eq!(wee1.clock_genes, vec!["Arntl", "Cry1", "Nr1d1", "Per2"]);

    let myc = centrality.iter().find(|c| c.target_gene == "Myc").unwrap();
    assert_eq!(myc.gating_count, 0);
    assert!(!myc.is_critical_node);

    let critical = critical_nodes(&centrality);
    assert_eq!(critical.len(), 1);
    assert!(gating_centrality(&hs, 0).is_err());
}

proptest! {
    #[test]
    fn prop_aggregate_ignores_input_order(shuffled in Just(study()).prop_shuffle()) {
        prop_assert_eq!(aggregate(&shuffled), aggregate(&study()));
    }

    #[test]
    fn prop_centrality_ignores_input_order(shuffled in Just(study()).prop_shuffle()) {
        prop_assert_eq!(
            gating_centrality(&shuffled, 2).unwrap(),
            gating_centrality(&study(), 2).unwrap()
        );
    }
}
