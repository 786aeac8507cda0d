//! Property tests for the statistical invariants.

mod common;

use common::style_bytes;
use isa_recognizer::{
    deduce, kl_divergence, Analyzer, NgramCounts, Order, Profile, ReferenceIndex, DEFAULT_ALPHA,
};
use proptest::prelude::*;

fn small_index() -> ReferenceIndex {
    ReferenceIndex::builder()
        .add_entry("StyleA", &style_bytes(0, 0x2000, 1))
        .add_entry("StyleB", &style_bytes(1, 0x2000, 2))
        .add_entry("StyleC", &style_bytes(2, 0x2000, 3))
        .build()
}

fn profile_of(order: Order, data: &[u8], alpha: f64) -> Profile {
    Profile::from_counts(&NgramCounts::from_block(order, data), alpha)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn profile_mass_normalizes(
        data in proptest::collection::vec(any::<u8>(), 0..2048),
        alpha in 1e-4f64..1.0,
    ) {
        for order in Order::ALL {
            let p = profile_of(order, &data, alpha);
            prop_assert!((p.total_mass() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn probabilities_strictly_positive(
        data in proptest::collection::vec(any::<u8>(), 0..2048),
        alpha in 1e-4f64..1.0,
    ) {
        for order in Order::ALL {
            let p = profile_of(order, &data, alpha);
            prop_assert!(p.default_prob() > 0.0);
            for (_, prob) in p.iter() {
                prop_assert!(prob > 0.0);
            }
        }
    }

    #[test]
    fn self_divergence_is_zero(data in proptest::collection::vec(any::<u8>(), 3..2048)) {
        for order in Order::ALL {
            let p = profile_of(order, &data, DEFAULT_ALPHA);
            prop_assert!(kl_divergence(&p, &p).abs() < 1e-9);
        }
    }

    #[test]
    fn divergence_non_negative_for_independent_content(
        style_q in 0usize..3,
        style_r in 0usize..3,
        len_q in 0x100usize..0x1000,
        len_r in 0x100usize..0x1000,
        seed_q in any::<u32>(),
        seed_r in any::<u32>(),
    ) {
        // References trained on unrelated content: every query key lands
        // on the reference's default mass and diverges positively.
        prop_assume!(style_q != style_r);
        for order in Order::ALL {
            let q = profile_of(order, &style_bytes(style_q, len_q, seed_q), DEFAULT_ALPHA);
            let r = profile_of(order, &style_bytes(style_r, len_r, seed_r), DEFAULT_ALPHA);
            prop_assert!(kl_divergence(&q, &r) >= -1e-9);
        }
    }

    #[test]
    fn verdict_requires_two_order_agreement(
        data in proptest::collection::vec(any::<u8>(), 0..4096),
    ) {
        let index = small_index();
        let verdict = deduce(&index, &data);
        let argmins_match = match (verdict.order2.best(), verdict.order3.best()) {
            (Some(b2), Some(b3)) => b2.label == b3.label,
            _ => false,
        };
        if !argmins_match {
            prop_assert!(verdict.label.is_none());
            prop_assert!(!verdict.confident);
        }
        if let Some(label) = &verdict.label {
            prop_assert_eq!(label, &verdict.order2.best().unwrap().label);
            prop_assert_eq!(label, &verdict.order3.best().unwrap().label);
        }
    }
}

proptest! {
    // Whole scans are heavier; fewer cases suffice.
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn segmentation_covers_exactly(
        data in proptest::collection::vec(any::<u8>(), 0..0x3400),
    ) {
        let analyzer = Analyzer::new(small_index());
        let segmentation = analyzer.scan(&data);
        prop_assert_eq!(segmentation.total_len(), data.len());
        let mut offset = 0;
        for run in segmentation.runs() {
            prop_assert_eq!(run.offset, offset);
            prop_assert!(run.len > 0);
            offset += run.len;
        }
        prop_assert_eq!(offset, data.len());
    }
}
