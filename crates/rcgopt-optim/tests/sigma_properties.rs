//! Property tests for the RCG conjugacy coefficients.
//!
//! Flat geometry makes the transport the identity, so the properties reduce
//! to the classical Euclidean statements about each formula.

use nalgebra::DVector;
use proptest::prelude::*;
use rcgopt_core::test_manifolds::TestEuclideanManifold;
use rcgopt_optim::{LineSearchKind, RcgConfig, RcgMethod, SearchDirectionRule, SolverState, RCG};

fn vector() -> impl Strategy<Value = DVector<f64>> {
    prop::collection::vec(-10.0..10.0f64, 3).prop_map(DVector::from_vec)
}

/// Runs one update from gradient `gf1` and direction `eta1` to gradient `gf2`.
fn update(
    method: RcgMethod,
    line_search: LineSearchKind,
    gf1: &DVector<f64>,
    gf2: &DVector<f64>,
    eta1: &DVector<f64>,
) -> (f64, DVector<f64>) {
    let manifold = TestEuclideanManifold::new(3);
    let mut rcg = RCG::new(RcgConfig::new().with_method(method));
    let mut state = SolverState::new(DVector::zeros(3), 1.0, gf1.clone(), line_search);
    state.x2 = eta1 * 0.5;
    state.gf2 = gf2.clone();
    state.eta1 = eta1.clone();
    state.eta2 = eta1 * 0.5;
    state.iteration = 1;
    rcg.update_data(&manifold, &mut state).unwrap();
    (rcg.sigma(), state.eta1)
}

proptest! {
    #[test]
    fn fr_pr_stays_within_fletcher_reeves(gf1 in vector(), gf2 in vector(), eta1 in vector()) {
        let gf1_sq = gf1.norm_squared();
        prop_assume!(gf1_sq > 1e-2);

        let (sigma, _) = update(RcgMethod::FrPr, LineSearchKind::StrongWolfe, &gf1, &gf2, &eta1);
        let sigma_fr = gf2.norm_squared() / gf1_sq;
        prop_assert!(sigma.abs() <= sigma_fr * (1.0 + 1e-12));
    }

    #[test]
    fn polak_ribiere_is_nonnegative_under_strong_wolfe(
        gf1 in vector(),
        gf2 in vector(),
        eta1 in vector(),
    ) {
        prop_assume!(gf1.norm_squared() > 1e-2);

        let (sigma, eta) =
            update(RcgMethod::PolakRibiereMod, LineSearchKind::StrongWolfe, &gf1, &gf2, &eta1);
        prop_assert!(sigma >= 0.0);
        if sigma == 0.0 {
            prop_assert!((eta + &gf2).norm() < 1e-12);
        }
    }

    #[test]
    fn hager_zhang_gives_sufficient_descent(gf1 in vector(), gf2 in vector(), eta1 in vector()) {
        let y = &gf2 - &gf1;
        prop_assume!(y.dot(&eta1).abs() > 0.1);

        let (sigma, eta) =
            update(RcgMethod::HagerZhang, LineSearchKind::StrongWolfe, &gf1, &gf2, &eta1);
        let gf2_sq = gf2.norm_squared();
        let scale = gf2_sq + sigma.abs() * eta1.norm() * gf2.norm();
        prop_assert!(eta.dot(&gf2) <= -0.875 * gf2_sq + 1e-9 * scale);
    }

    #[test]
    fn new_direction_combines_gradient_and_transported_direction(
        gf1 in vector(),
        gf2 in vector(),
        eta1 in vector(),
    ) {
        prop_assume!(gf1.norm_squared() > 1e-2);

        for method in [RcgMethod::FletcherReeves, RcgMethod::FrPr] {
            let (sigma, eta) = update(method, LineSearchKind::Armijo, &gf1, &gf2, &eta1);
            let expected = &eta1 * sigma - &gf2;
            prop_assert!((eta - expected).norm() <= 1e-9 * (1.0 + sigma.abs()));
        }
    }
}
