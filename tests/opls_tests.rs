//! O-PLS regression integration tests.

mod common;

use approx::assert_relative_eq;
use common::generate_latent_data;
use orthopls::prelude::*;
use orthopls::Block;

#[test]
fn test_transform_first_column_is_predictive_score() {
    let (x, y) = generate_latent_data(60, 8, 0.05, 7);
    let fitted = OplsRegressor::builder()
        .n_components(3)
        .build()
        .fit(&x, &y)
        .expect("fit should succeed");

    let scores = fitted.transform(Some(&x), None).expect("transform");
    let t_pred = &fitted.decomposition().t_pred;
    for i in 0..x.nrows() {
        assert_relative_eq!(scores[(i, 0)], t_pred[i], epsilon = 1e-8);
    }
}

#[test]
fn test_refit_reproduces_loadings_up_to_sign() {
    let (x, y) = generate_latent_data(50, 6, 0.1, 11);
    let model = OplsRegressor::new(3);
    let first = model.fit(&x, &y).expect("first fit");
    let second = model.fit(&x, &y).expect("second fit");

    let p1 = first.decomposition().loadings_p();
    let p2 = second.decomposition().loadings_p();
    for comp in 0..3 {
        let mut same = 0.0;
        let mut flipped = 0.0;
        for j in 0..p1.nrows() {
            same += (p1[(j, comp)] - p2[(j, comp)]).abs();
            flipped += (p1[(j, comp)] + p2[(j, comp)]).abs();
        }
        assert!(same.min(flipped) < 1e-9, "component {comp} not reproduced");
    }
}

#[test]
fn test_round_trip_residual_vanishes_at_full_rank() {
    // Pure noise is full rank, so reconstruction from min(n, p) components
    // recovers X and the residual shrinks monotonically on the way there.
    let mut sampler = common::GaussianSampler::new(23);
    let x = sampler.matrix(30, 5);
    let y = sampler.matrix(30, 1);

    let mut residuals = Vec::new();
    for k in 2..=5 {
        let fitted = OplsRegressor::new(k).fit(&x, &y).expect("fit");
        let t = fitted.transform(Some(&x), None).expect("transform");
        let x_back = fitted.inverse_transform(Some(&t), None).expect("inverse");

        let mut rss = 0.0;
        for i in 0..x.nrows() {
            for j in 0..x.ncols() {
                rss += (x[(i, j)] - x_back[(i, j)]).powi(2);
            }
        }
        residuals.push(rss);
    }

    assert!(residuals[residuals.len() - 1] <= residuals[0] + 1e-9);
    assert!(
        residuals[residuals.len() - 1] < 1e-8,
        "full-rank residual {} should vanish",
        residuals[residuals.len() - 1]
    );
}

#[test]
fn test_prediction_recovers_linear_response() {
    let (x, y) = generate_latent_data(80, 10, 0.02, 31);
    let fitted = OplsRegressor::new(2).fit(&x, &y).expect("fit");

    let y_hat = fitted.predict(Some(&x), None).expect("predict");
    let mut rss = 0.0;
    let mut tss = 0.0;
    let y_mean: f64 = (0..y.nrows()).map(|i| y[(i, 0)]).sum::<f64>() / y.nrows() as f64;
    for i in 0..y.nrows() {
        rss += (y[(i, 0)] - y_hat[(i, 0)]).powi(2);
        tss += (y[(i, 0)] - y_mean).powi(2);
    }
    assert!(1.0 - rss / tss > 0.98);
}

#[test]
fn test_score_block_selection() {
    let (x, y) = generate_latent_data(40, 6, 0.1, 3);
    let fitted = OplsRegressor::new(2).fit(&x, &y).expect("fit");

    let r2y = fitted.score(&x, &y, Block::Y).expect("r2y");
    let r2x = fitted.score(&x, &y, Block::X).expect("r2x");
    assert!(r2y > 0.9);
    assert!(r2x > -1.0 && r2x <= 1.0);

    // Unrecognized block names fail at parse time.
    assert!("both".parse::<Block>().is_err());
}

#[test]
fn test_configuration_errors_before_any_state() {
    let (x, y) = generate_latent_data(20, 4, 0.1, 5);

    let too_few = OplsRegressor::builder().n_components(1).build();
    assert!(matches!(too_few.fit(&x, &y), Err(OplsError::Configuration(_))));

    let too_many = OplsRegressor::builder().n_components(10).build();
    assert!(matches!(too_many.fit(&x, &y), Err(OplsError::Configuration(_))));
}

#[test]
fn test_dual_input_contract() {
    let (x, y) = generate_latent_data(25, 5, 0.1, 13);
    let fitted = OplsRegressor::new(2).fit(&x, &y).expect("fit");

    assert!(matches!(
        fitted.transform(Some(&x), Some(&y)),
        Err(OplsError::AmbiguousInput)
    ));
    assert!(matches!(
        fitted.transform(None, None),
        Err(OplsError::MissingInput)
    ));
    assert!(matches!(
        fitted.inverse_transform(Some(&x), Some(&y)),
        Err(OplsError::AmbiguousInput)
    ));
    assert!(matches!(
        fitted.predict(None, None),
        Err(OplsError::MissingInput)
    ));
}

#[test]
fn test_scaler_choice_changes_fit_but_not_contract() {
    let (x, y) = generate_latent_data(45, 7, 0.1, 19);

    let centered = OplsRegressor::builder().n_components(2).build();
    let scaled = OplsRegressor::builder()
        .n_components(2)
        .x_scaler(ColumnScaler::unit_variance())
        .build();

    let fit_centered = centered.fit(&x, &y).expect("centered fit");
    let fit_scaled = scaled.fit(&x, &y).expect("scaled fit");

    assert!(fit_centered.model_parameters().r2y > 0.9);
    assert!(fit_scaled.model_parameters().r2y > 0.9);

    // Same component layout from either preprocessing.
    assert_eq!(fit_centered.decomposition().w_ortho.ncols(), 1);
    assert_eq!(fit_scaled.decomposition().w_ortho.ncols(), 1);
}

#[test]
fn test_per_component_residuals_track_totals() {
    let (x, y) = generate_latent_data(50, 8, 0.1, 29);
    let fitted = OplsRegressor::new(3).fit(&x, &y).expect("fit");
    let params = fitted.model_parameters();

    assert_eq!(params.ssx_comp.len(), 3);
    assert_eq!(params.ssy_comp.len(), 3);
    assert!(params.ssx > 0.0 && params.ssy > 0.0);
    assert_relative_eq!(
        params.r2y,
        1.0 - params.ssy_comp[2] / params.ssy,
        epsilon = 1e-10
    );
}
