//! Cross-validation engine.
//!
//! Every fold fits an independent model copy on the training partition and
//! never shares mutable state with other folds. Pooled PRESS accumulators
//! give the global Q2 statistics; per-fold parameters are sign-aligned
//! against the full-dataset model before aggregation, because component
//! signs are arbitrary and averaging unaligned folds silently cancels real
//! signal. Any fold failure aborts the whole run.

use faer::Mat;

use crate::core::encoding::LabelEncoder;
use crate::core::error::OplsError;
use crate::core::params::{
    CvClassification, CvDistributions, CvParameters, FoldScores, ModelParameterSet,
};
use crate::core::scaler::Scaler;
use crate::diagnostics::vip;
use crate::metrics::FPR_GRID_SIZE;
use crate::solvers::{FittedOpls, OplsDaClassifier, OplsRegressor};
use crate::utils::matrix::{
    l1_column_distance, mean_stdev, mean_stdev_mats, mean_stdev_vecs, sub, sum_of_squares,
    take_rows,
};
use crate::validation::splitter::Splitter;
use crate::Block;

/// Snapshot of the sign-sensitive parameters of one fitted model.
pub(crate) fn parameter_set<SX: Scaler, SY: Scaler>(
    fitted: &FittedOpls<SX, SY>,
) -> ModelParameterSet {
    let decomp = fitted.decomposition();
    ModelParameterSet {
        loadings_p: decomp.loadings_p(),
        loadings_q: decomp.loadings_q(),
        weights_w: decomp.weights_w(),
        weights_c: decomp.weights_c(),
        rotations_ws: decomp.rotations_ws.clone(),
        rotations_cs: decomp.rotations_cs.clone(),
        beta: decomp.beta.clone(),
        vip: vip(fitted),
    }
}

/// Resolve the per-component sign indeterminacy of each parameter set
/// against the reference loadings-p, flipping scores alongside.
///
/// The sign kept is the one whose loading-p column has the smaller L1
/// distance to the reference column.
pub(crate) fn align_signs(
    reference_p: &Mat<f64>,
    sets: &mut [ModelParameterSet],
    mut scores: Option<&mut [FoldScores]>,
) {
    let n_components = reference_p.ncols();
    for (fold, set) in sets.iter_mut().enumerate() {
        for comp in 0..n_components {
            let keep = l1_column_distance(reference_p, comp, &set.loadings_p, comp, false);
            let flip = l1_column_distance(reference_p, comp, &set.loadings_p, comp, true);
            if flip < keep {
                set.flip_component(comp);
                if let Some(ref mut all_scores) = scores {
                    all_scores[fold].flip_component(comp);
                }
            }
        }
    }
}

/// Cross-validate an O-PLS regression model.
///
/// Fits the full-dataset reference model, then one independent model per
/// split; returns pooled Q2 statistics and sign-aligned mean/stdev
/// aggregates of every per-variable parameter. `output_dist` additionally
/// retains the raw per-fold distributions.
pub fn cross_validate<SX: Scaler, SY: Scaler>(
    model: &OplsRegressor<SX, SY>,
    x: &Mat<f64>,
    y: &Mat<f64>,
    splitter: &dyn Splitter,
    output_dist: bool,
) -> Result<CvParameters, OplsError> {
    let reference = model.fit(x, y)?;
    let splits = splitter.split(x, Some(y))?;
    log::debug!("cross-validation: {} folds over {} samples", splits.len(), x.nrows());

    // Total sums of squares of the whole dataset, computed once.
    let ssx = sum_of_squares(&reference.x_scaler().transform(x)?);
    let ssy = sum_of_squares(&reference.y_scaler().transform(y)?);

    let mut pressx = 0.0;
    let mut pressy = 0.0;
    let mut r2x_train = Vec::with_capacity(splits.len());
    let mut r2y_train = Vec::with_capacity(splits.len());
    let mut r2x_test = Vec::with_capacity(splits.len());
    let mut r2y_test = Vec::with_capacity(splits.len());
    let mut fold_params = Vec::with_capacity(splits.len());
    let mut fold_scores = Vec::with_capacity(splits.len());

    for (fold, (train, test)) in splits.iter().enumerate() {
        let x_train = take_rows(x, train);
        let y_train = take_rows(y, train);
        let x_test = take_rows(x, test);
        let y_test = take_rows(y, test);

        let fitted = model.fit(&x_train, &y_train)?;

        r2x_train.push(fitted.score(&x_train, &y_train, Block::X)?);
        r2y_train.push(fitted.score(&x_train, &y_train, Block::Y)?);
        r2x_test.push(fitted.score(&x_test, &y_test, Block::X)?);
        r2y_test.push(fitted.score(&x_test, &y_test, Block::Y)?);

        // Held-out residuals in the fold's scaled space feed the pooled
        // PRESS accumulators.
        let x_test_scaled = fitted.x_scaler().transform(&x_test)?;
        let y_test_scaled = fitted.y_scaler().transform(&y_test)?;
        pressy += sum_of_squares(&sub(&y_test_scaled, &fitted.predict_y_scaled(&x_test)?));
        pressx += sum_of_squares(&sub(&x_test_scaled, &fitted.predict_x_scaled(&y_test)?));

        fold_params.push(parameter_set(&fitted));
        fold_scores.push(FoldScores {
            sample_indices: test.clone(),
            scores_t: fitted.transform(Some(&x_test), None)?,
            scores_u: fitted.transform(None, Some(&y_test))?,
        });
        log::debug!("fold {fold}: R2Y test = {:.4}", r2y_test[fold]);
    }

    let reference_p = reference.decomposition().loadings_p();
    align_signs(&reference_p, &mut fold_params, Some(&mut fold_scores));

    let mut cv = aggregate(
        &fold_params,
        pressx / ssx,
        pressy / ssy,
        &r2x_train,
        &r2y_train,
        &r2x_test,
        &r2y_test,
    );
    if output_dist {
        cv.distributions = Some(CvDistributions {
            r2x_train,
            r2y_train,
            r2x_test,
            r2y_test,
            params: fold_params,
            test_scores: fold_scores,
            test_accuracy: Vec::new(),
            test_f1: Vec::new(),
            test_auc: Vec::new(),
        });
    }
    Ok(cv)
}

/// Cross-validate an O-PLS-DA model.
///
/// Adds the per-fold test classification metrics and the grid-interpolated
/// ROC average to the regression aggregates. Every fold must contain all
/// classes; shuffled splitters make that likely.
pub fn cross_validate_da<SX: Scaler>(
    model: &OplsDaClassifier<SX>,
    x: &Mat<f64>,
    labels: &[usize],
    splitter: &dyn Splitter,
    output_dist: bool,
) -> Result<CvParameters, OplsError> {
    let reference = model.fit(x, labels)?;
    let encoder = LabelEncoder::fit(labels)?;
    let y_encoded = encoder.encode(labels)?;
    let splits = splitter.split(x, Some(&y_encoded))?;
    log::debug!(
        "DA cross-validation: {} folds, {} classes",
        splits.len(),
        encoder.n_classes()
    );

    let ssx = sum_of_squares(&reference.core().x_scaler().transform(x)?);
    let ssy = sum_of_squares(&reference.core().y_scaler().transform(&y_encoded)?);

    let mut pressx = 0.0;
    let mut pressy = 0.0;
    let mut r2x_train = Vec::with_capacity(splits.len());
    let mut r2y_train = Vec::with_capacity(splits.len());
    let mut r2x_test = Vec::with_capacity(splits.len());
    let mut r2y_test = Vec::with_capacity(splits.len());
    let mut fold_params = Vec::with_capacity(splits.len());
    let mut fold_scores = Vec::with_capacity(splits.len());

    let mut accuracy = Vec::with_capacity(splits.len());
    let mut precision = Vec::with_capacity(splits.len());
    let mut recall = Vec::with_capacity(splits.len());
    let mut f1 = Vec::with_capacity(splits.len());
    let mut auc = Vec::with_capacity(splits.len());
    let mut mcc = Vec::with_capacity(splits.len());
    let mut zero_one = Vec::with_capacity(splits.len());
    let mut roc_tprs: Vec<Vec<f64>> = Vec::with_capacity(splits.len());
    let mut confusion_matrices = Vec::with_capacity(splits.len());
    let mut ypred_pooled = Mat::zeros(x.nrows(), y_encoded.ncols());

    for (train, test) in &splits {
        let x_train = take_rows(x, train);
        let x_test = take_rows(x, test);
        let labels_train: Vec<usize> = train.iter().map(|&i| labels[i]).collect();
        let labels_test: Vec<usize> = test.iter().map(|&i| labels[i]).collect();

        let fitted = model.fit(&x_train, &labels_train)?;
        if fitted.n_classes() != encoder.n_classes() {
            return Err(OplsError::Configuration(format!(
                "fold is missing classes ({} of {}); use a shuffled or stratified splitter",
                fitted.n_classes(),
                encoder.n_classes()
            )));
        }

        let y_train = encoder.encode(&labels_train)?;
        let y_test = encoder.encode(&labels_test)?;
        let core = fitted.core();

        r2x_train.push(core.score(&x_train, &y_train, Block::X)?);
        r2y_train.push(core.score(&x_train, &y_train, Block::Y)?);
        r2x_test.push(core.score(&x_test, &y_test, Block::X)?);
        r2y_test.push(core.score(&x_test, &y_test, Block::Y)?);

        let x_test_scaled = core.x_scaler().transform(&x_test)?;
        let y_test_scaled = core.y_scaler().transform(&y_test)?;
        let y_pred_scaled = core.predict_y_scaled(&x_test)?;
        pressy += sum_of_squares(&sub(&y_test_scaled, &y_pred_scaled));
        pressx += sum_of_squares(&sub(&x_test_scaled, &core.predict_x_scaled(&y_test)?));
        for (row, &sample) in test.iter().enumerate() {
            for j in 0..ypred_pooled.ncols() {
                ypred_pooled[(sample, j)] = y_pred_scaled[(row, j)];
            }
        }

        fold_params.push(parameter_set(core));
        fold_scores.push(FoldScores {
            sample_indices: test.clone(),
            scores_t: core.transform(Some(&x_test), None)?,
            scores_u: core.transform(None, Some(&y_test))?,
        });

        let test_metrics = fitted.classification_metrics(&x_test, &labels_test)?;
        accuracy.push(test_metrics.accuracy);
        precision.push(test_metrics.precision);
        recall.push(test_metrics.recall);
        f1.push(test_metrics.f1);
        mcc.push(test_metrics.matthews_mcc);
        zero_one.push(test_metrics.zero_one_loss);
        auc.push(mean_of(&test_metrics.auc));
        roc_tprs.push(mean_tpr(&test_metrics.roc));
        confusion_matrices.push(test_metrics.confusion_matrix.clone());
    }

    let reference_p = reference.core().decomposition().loadings_p();
    align_signs(&reference_p, &mut fold_params, Some(&mut fold_scores));

    let mut cv = aggregate(
        &fold_params,
        pressx / ssx,
        pressy / ssy,
        &r2x_train,
        &r2y_train,
        &r2x_test,
        &r2y_test,
    );

    let (mean_accuracy, stdev_accuracy) = mean_stdev(&accuracy);
    let (mean_precision, stdev_precision) = mean_stdev(&precision);
    let (mean_recall, stdev_recall) = mean_stdev(&recall);
    let (mean_f1, stdev_f1) = mean_stdev(&f1);
    let (mean_auc, stdev_auc) = mean_stdev(&auc);
    let (mean_mcc, stdev_mcc) = mean_stdev(&mcc);
    let (mean_zero_one, stdev_zero_one) = mean_stdev(&zero_one);

    let mut mean_roc_tpr = vec![0.0; FPR_GRID_SIZE];
    let mut stdev_roc_tpr = vec![0.0; FPR_GRID_SIZE];
    for g in 0..FPR_GRID_SIZE {
        let at_g: Vec<f64> = roc_tprs.iter().map(|tpr| tpr[g]).collect();
        let (m, s) = mean_stdev(&at_g);
        mean_roc_tpr[g] = m;
        stdev_roc_tpr[g] = s;
    }

    cv.da = Some(CvClassification {
        mean_accuracy,
        stdev_accuracy,
        mean_precision,
        stdev_precision,
        mean_recall,
        stdev_recall,
        mean_f1,
        stdev_f1,
        mean_auc,
        stdev_auc,
        mean_mcc,
        stdev_mcc,
        mean_zero_one_loss: mean_zero_one,
        stdev_zero_one_loss: stdev_zero_one,
        mean_roc_tpr,
        stdev_roc_tpr,
        ypred: ypred_pooled,
        confusion_matrices,
    });

    if output_dist {
        cv.distributions = Some(CvDistributions {
            r2x_train,
            r2y_train,
            r2x_test,
            r2y_test,
            params: fold_params,
            test_scores: fold_scores,
            test_accuracy: accuracy,
            test_f1: f1,
            test_auc: auc,
        });
    }
    Ok(cv)
}

fn mean_of(values: &[f64]) -> f64 {
    if values.is_empty() {
        f64::NAN
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Average the per-class interpolated TPR curves of one fold.
fn mean_tpr(curves: &[crate::metrics::RocCurve]) -> Vec<f64> {
    let mut mean = vec![0.0; FPR_GRID_SIZE];
    for curve in curves {
        for (g, &tpr) in curve.tpr.iter().enumerate() {
            mean[g] += tpr / curves.len() as f64;
        }
    }
    mean
}

#[allow(clippy::too_many_arguments)]
fn aggregate(
    fold_params: &[ModelParameterSet],
    press_x_ratio: f64,
    press_y_ratio: f64,
    r2x_train: &[f64],
    r2y_train: &[f64],
    r2x_test: &[f64],
    r2y_test: &[f64],
) -> CvParameters {
    let collect_mats = |select: fn(&ModelParameterSet) -> &Mat<f64>| -> Vec<Mat<f64>> {
        fold_params.iter().map(|s| select(s).clone()).collect()
    };

    let (mean_loadings_p, stdev_loadings_p) = mean_stdev_mats(&collect_mats(|s| &s.loadings_p));
    let (mean_loadings_q, stdev_loadings_q) = mean_stdev_mats(&collect_mats(|s| &s.loadings_q));
    let (mean_weights_w, stdev_weights_w) = mean_stdev_mats(&collect_mats(|s| &s.weights_w));
    let (mean_weights_c, stdev_weights_c) = mean_stdev_mats(&collect_mats(|s| &s.weights_c));
    let (mean_rotations_ws, stdev_rotations_ws) =
        mean_stdev_mats(&collect_mats(|s| &s.rotations_ws));
    let (mean_rotations_cs, stdev_rotations_cs) =
        mean_stdev_mats(&collect_mats(|s| &s.rotations_cs));
    let (mean_beta, stdev_beta) = mean_stdev_mats(&collect_mats(|s| &s.beta));
    let vips: Vec<_> = fold_params.iter().map(|s| s.vip.clone()).collect();
    let (mean_vip, stdev_vip) = mean_stdev_vecs(&vips);

    let (mean_r2x_train, stdev_r2x_train) = mean_stdev(r2x_train);
    let (mean_r2y_train, stdev_r2y_train) = mean_stdev(r2y_train);
    let (mean_r2x_test, stdev_r2x_test) = mean_stdev(r2x_test);
    let (mean_r2y_test, stdev_r2y_test) = mean_stdev(r2y_test);

    CvParameters {
        q2x: 1.0 - press_x_ratio,
        q2y: 1.0 - press_y_ratio,
        mean_r2x_train,
        stdev_r2x_train,
        mean_r2y_train,
        stdev_r2y_train,
        mean_r2x_test,
        stdev_r2x_test,
        mean_r2y_test,
        stdev_r2y_test,
        mean_loadings_p,
        stdev_loadings_p,
        mean_loadings_q,
        stdev_loadings_q,
        mean_weights_w,
        stdev_weights_w,
        mean_weights_c,
        stdev_weights_c,
        mean_rotations_ws,
        stdev_rotations_ws,
        mean_rotations_cs,
        stdev_rotations_cs,
        mean_beta,
        stdev_beta,
        mean_vip,
        stdev_vip,
        da: None,
        distributions: None,
    }
}
