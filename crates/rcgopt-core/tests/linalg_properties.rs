//! Property tests for the BLAS-style primitives and the geometry cache.

use nalgebra::{DMatrix, DVector};
use proptest::prelude::*;
use rcgopt_core::cache::GeometryCache;
use rcgopt_core::linalg::{dot, gemv, ger, Transpose};

fn vector(len: usize) -> impl Strategy<Value = DVector<f64>> {
    prop::collection::vec(-10.0..10.0f64, len).prop_map(DVector::from_vec)
}

fn matrix(rows: usize, cols: usize) -> impl Strategy<Value = DMatrix<f64>> {
    prop::collection::vec(-10.0..10.0f64, rows * cols)
        .prop_map(move |data| DMatrix::from_vec(rows, cols, data))
}

proptest! {
    #[test]
    fn gemv_matches_matrix_product(
        a in matrix(4, 3),
        x in vector(3),
        y in vector(4),
        alpha in -2.0..2.0f64,
        beta in -2.0..2.0f64,
    ) {
        let expected = &a * &x * alpha + &y * beta;
        let mut out = y.clone();
        gemv(Transpose::No, alpha, &a.as_view(), &x, beta, &mut out).unwrap();
        prop_assert!((out - expected).norm() < 1e-9);
    }

    #[test]
    fn gemv_transposed_matches_matrix_product(a in matrix(4, 3), x in vector(4)) {
        let expected = a.transpose() * &x;
        let mut out = DVector::zeros(3);
        gemv(Transpose::Yes, 1.0, &a.as_view(), &x, 0.0, &mut out).unwrap();
        prop_assert!((out - expected).norm() < 1e-9);
    }

    #[test]
    fn ger_matches_outer_product(
        a in matrix(3, 4),
        x in vector(3),
        y in vector(4),
        alpha in -2.0..2.0f64,
    ) {
        let expected = &a + &x * y.transpose() * alpha;
        let mut out = a.clone();
        ger(alpha, &x, &y, &mut out.as_view_mut()).unwrap();
        prop_assert!((out - expected).norm() < 1e-9);
    }

    #[test]
    fn dot_is_symmetric(x in vector(5), y in vector(5)) {
        prop_assert_eq!(dot(&x, &y).unwrap(), dot(&y, &x).unwrap());
    }

    #[test]
    fn transport_cache_never_serves_other_points(x in vector(3), y in vector(3), z in vector(3)) {
        prop_assume!(y != z);
        let mut cache = GeometryCache::new();

        let first = cache.transport_direction(&x, &y, || Ok(&x + &y)).unwrap();
        let second = cache.transport_direction(&x, &z, || Ok(&x + &z)).unwrap();

        prop_assert_eq!(first, &x + &y);
        prop_assert_eq!(second, &x + &z);
        prop_assert_eq!(cache.transport_computations(), 2);
    }
}
