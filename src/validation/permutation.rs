//! Permutation-test engine.
//!
//! Repeatedly refits and re-cross-validates under shuffled responses to
//! build null distributions for the model quality metrics. The response is
//! permuted with a seeded generator (same multiset of values, broken X-Y
//! pairing); every round works on an independent model copy and the first
//! failing round aborts the run.

use faer::Mat;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::core::error::OplsError;
use crate::core::params::{
    empirical_p_value, PValues, PermutationClassification, PermutationResult,
};
use crate::core::scaler::Scaler;
use crate::solvers::{OplsDaClassifier, OplsRegressor};
use crate::utils::matrix::take_rows;
use crate::validation::cross_validation::{align_signs, cross_validate, cross_validate_da, parameter_set};
use crate::validation::splitter::Splitter;

fn check_n_permutations(n_permutations: usize) -> Result<(), OplsError> {
    if n_permutations == 0 {
        Err(OplsError::Configuration(
            "permutation test needs at least 1 permutation".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Permutation test for an O-PLS regression model.
///
/// Returns the null distributions of R2X/R2Y/Q2X/Q2Y (plus sign-aligned
/// parameter sets) and the empirical Q2Y p-value with the +1 correction.
pub fn permutation_test<SX: Scaler, SY: Scaler>(
    model: &OplsRegressor<SX, SY>,
    x: &Mat<f64>,
    y: &Mat<f64>,
    n_permutations: usize,
    splitter: &dyn Splitter,
    seed: u64,
) -> Result<(PermutationResult, PValues), OplsError> {
    check_n_permutations(n_permutations)?;

    let reference = model.fit(x, y)?;
    let observed = cross_validate(model, x, y, splitter, false)?;
    let reference_p = reference.decomposition().loadings_p();

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut r2y = Vec::with_capacity(n_permutations);
    let mut r2x = Vec::with_capacity(n_permutations);
    let mut q2y = Vec::with_capacity(n_permutations);
    let mut q2x = Vec::with_capacity(n_permutations);
    let mut params = Vec::with_capacity(n_permutations);

    for round in 0..n_permutations {
        let mut order: Vec<usize> = (0..x.nrows()).collect();
        order.shuffle(&mut rng);
        let y_perm = take_rows(y, &order);

        let fitted = model.fit(x, &y_perm)?;
        let cv = cross_validate(model, x, &y_perm, splitter, false)?;

        r2y.push(fitted.model_parameters().r2y);
        r2x.push(fitted.model_parameters().r2x);
        q2y.push(cv.q2y);
        q2x.push(cv.q2x);
        params.push(parameter_set(&fitted));

        if (round + 1) % 100 == 0 {
            log::debug!("permutation round {}/{n_permutations}", round + 1);
        }
    }

    align_signs(&reference_p, &mut params, None);

    let p_values = PValues {
        q2y: empirical_p_value(&q2y, observed.q2y),
        auc: None,
        f1: None,
    };
    log::info!(
        "permutation test: observed Q2Y = {:.4}, p = {:.4} over {n_permutations} rounds",
        observed.q2y,
        p_values.q2y
    );

    Ok((
        PermutationResult {
            r2y,
            r2x,
            q2y,
            q2x,
            params,
            da: None,
        },
        p_values,
    ))
}

/// Permutation test for an O-PLS-DA model.
///
/// Shuffles the class labels each round, additionally recording null
/// distributions of the mean test classification metrics, with empirical
/// p-values for Q2Y, AUC and F1.
pub fn permutation_test_da<SX: Scaler>(
    model: &OplsDaClassifier<SX>,
    x: &Mat<f64>,
    labels: &[usize],
    n_permutations: usize,
    splitter: &dyn Splitter,
    seed: u64,
) -> Result<(PermutationResult, PValues), OplsError> {
    check_n_permutations(n_permutations)?;

    let reference = model.fit(x, labels)?;
    let observed = cross_validate_da(model, x, labels, splitter, false)?;
    let observed_da = observed.da.as_ref().ok_or_else(|| {
        OplsError::Configuration("classification cross-validation produced no DA metrics".to_string())
    })?;
    let reference_p = reference.core().decomposition().loadings_p();

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut r2y = Vec::with_capacity(n_permutations);
    let mut r2x = Vec::with_capacity(n_permutations);
    let mut q2y = Vec::with_capacity(n_permutations);
    let mut q2x = Vec::with_capacity(n_permutations);
    let mut params = Vec::with_capacity(n_permutations);
    let mut accuracy = Vec::with_capacity(n_permutations);
    let mut precision = Vec::with_capacity(n_permutations);
    let mut recall = Vec::with_capacity(n_permutations);
    let mut f1 = Vec::with_capacity(n_permutations);
    let mut auc = Vec::with_capacity(n_permutations);
    let mut zero_one_loss = Vec::with_capacity(n_permutations);

    for round in 0..n_permutations {
        let mut labels_perm = labels.to_vec();
        labels_perm.shuffle(&mut rng);

        let fitted = model.fit(x, &labels_perm)?;
        let cv = cross_validate_da(model, x, &labels_perm, splitter, false)?;
        let cv_da = cv.da.as_ref().ok_or_else(|| {
            OplsError::Configuration(
                "classification cross-validation produced no DA metrics".to_string(),
            )
        })?;

        r2y.push(fitted.core().model_parameters().r2y);
        r2x.push(fitted.core().model_parameters().r2x);
        q2y.push(cv.q2y);
        q2x.push(cv.q2x);
        params.push(parameter_set(fitted.core()));
        accuracy.push(cv_da.mean_accuracy);
        precision.push(cv_da.mean_precision);
        recall.push(cv_da.mean_recall);
        f1.push(cv_da.mean_f1);
        auc.push(cv_da.mean_auc);
        zero_one_loss.push(cv_da.mean_zero_one_loss);

        if (round + 1) % 100 == 0 {
            log::debug!("permutation round {}/{n_permutations}", round + 1);
        }
    }

    align_signs(&reference_p, &mut params, None);

    let p_values = PValues {
        q2y: empirical_p_value(&q2y, observed.q2y),
        auc: Some(empirical_p_value(&auc, observed_da.mean_auc)),
        f1: Some(empirical_p_value(&f1, observed_da.mean_f1)),
    };
    log::info!(
        "DA permutation test: observed Q2Y = {:.4}, p(Q2Y) = {:.4}, p(AUC) = {:.4}",
        observed.q2y,
        p_values.q2y,
        p_values.auc.unwrap_or(f64::NAN)
    );

    Ok((
        PermutationResult {
            r2y,
            r2x,
            q2y,
            q2x,
            params,
            da: Some(PermutationClassification {
                accuracy,
                precision,
                recall,
                f1,
                auc,
                zero_one_loss,
            }),
        },
        p_values,
    ))
}
