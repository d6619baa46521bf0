//! Property-based tests for the Benjamini-Hochberg correction

use gating_correction::{correct_across_pairs, step_up_significance};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_q_values_monotone_in_p(p in prop::collection::vec(0.0f64..=1.0, 1..200)) {
        let q = correct_across_pairs(&p).unwrap();
        let mut order: Vec<usize> = (0..p.len()).collect();
        order.sort_by(|&a, &b| p[a].total_cmp(&p[b]));
        for pair in order.windows(2) {
            prop_assert!(q[pair[0]] <= q[pair[1]] + 1e-15);
        }
    }

    #[test]
    fn prop_q_at_least_p(p in prop::collection::vec(0.0f64..=1.0, 1..200)) {
        let q = correct_across_pairs(&p).unwrap();
        for (q, p) in q.iter().zip(&p) {
            prop_assert!(*q >= *p - 1e-15);
            prop_assert!(*q <= 1.0);
        }
    }

    #[test]
    fn prop_step_up_matches_q_threshold(
        p in prop::collection::vec(0.0f64..=0.2, 1..100),
        alpha in 0.01f64..0.2,
    ) {
        let q = correct_across_pairs(&p).unwrap();
        let flags = step_up_significance(&p, alpha).unwrap();
        for (q, flag) in q.iter().zip(flags) {
            // the two rules can only disagree at floating-point ties
            if (*q - alpha).abs() > 1e-12 {
                prop_assert_eq!(*q <= alpha, flag);
            }
        }
    }

    #[test]
    fn prop_correction_is_order_independent(p in prop::collection::vec(0.0f64..=1.0, 2..50)) {
        let q = correct_across_pairs(&p).unwrap();
        let reversed: Vec<f64> = p.iter().rev().copied().collect();
        let q_rev = correct_across_pairs(&reversed).unwrap();
        for (a, b) in q.iter().zip(q_rev.iter().rev()) {
            prop_assert!((a - b).abs() < 1e-12);
        }
    }
}
