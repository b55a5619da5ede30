//! Variable Importance for Projection (VIP).

use faer::Col;

use crate::core::error::OplsError;
use crate::core::scaler::Scaler;
use crate::solvers::FittedOpls;

/// Per-feature VIP scores.
///
/// For feature j: `vip_j = sqrt(p * sum_c(w_jc^2 * expl_c) / sum_c(expl_c))`
/// where `expl_c` is the Y sum of squares explained by component c (clamped
/// at zero) and p is the number of features. Values are non-negative and can
/// be recomputed directly from the stored weights and the per-component SSY
/// array.
pub fn vip<SX: Scaler, SY: Scaler>(fitted: &FittedOpls<SX, SY>) -> Col<f64> {
    let params = fitted.model_parameters();
    let weights = fitted.decomposition().weights_w();
    let p = fitted.n_features();
    let k = fitted.n_components();

    let mut explained = Vec::with_capacity(k);
    let mut previous = params.ssy;
    for c in 0..k {
        explained.push((previous - params.ssy_comp[c]).max(0.0));
        previous = params.ssy_comp[c];
    }
    let total: f64 = explained.iter().sum();
    if total <= 0.0 {
        log::warn!("VIP undefined: no Y variance explained by any component");
        return Col::zeros(p);
    }

    Col::from_fn(p, |j| {
        let mut num = 0.0;
        for (c, &expl) in explained.iter().enumerate() {
            num += weights[(j, c)].powi(2) * expl;
        }
        (num * p as f64 / total).sqrt()
    })
}

/// Knee point of the sorted-descending VIP curve (Kneedle, convex
/// decreasing). Returns the VIP value at the knee, usable as a selection
/// threshold. Higher `sensitivity` is more permissive.
pub fn vip_knee_threshold(vip: &Col<f64>, sensitivity: f64) -> Option<f64> {
    let len = vip.nrows();
    if len < 3 {
        return None;
    }

    let mut sorted: Vec<f64> = (0..len).map(|i| vip[i]).collect();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    let (max, min) = (sorted[0], sorted[len - 1]);
    if max - min <= 0.0 {
        return None;
    }

    // Normalize, flip the convex decreasing curve into a concave increasing
    // one and take its difference from the diagonal.
    let diff: Vec<f64> = sorted
        .iter()
        .enumerate()
        .map(|(i, &y)| {
            let x = i as f64 / (len - 1) as f64;
            let y_norm = (y - min) / (max - min);
            (1.0 - y_norm) - x
        })
        .collect();

    let mean_spacing = 1.0 / (len - 1) as f64;

    // Local maxima of the difference curve, in order.
    let mut maxima = Vec::new();
    for i in 1..len - 1 {
        if diff[i] > diff[i - 1] && diff[i] >= diff[i + 1] {
            maxima.push(i);
        }
    }

    for (pos, &lmx) in maxima.iter().enumerate() {
        let threshold = diff[lmx] - sensitivity * mean_spacing;
        let end = maxima.get(pos + 1).copied().unwrap_or(len);
        for j in (lmx + 1)..end {
            if diff[j] < threshold {
                return Some(sorted[lmx]);
            }
        }
    }
    None
}

/// Indices of features whose VIP reaches the threshold, ordered by
/// decreasing VIP. With no explicit threshold the knee point is used.
pub fn select_variables_by_vip(
    vip: &Col<f64>,
    threshold: Option<f64>,
    sensitivity: f64,
) -> Result<Vec<usize>, OplsError> {
    let cutoff = match threshold {
        Some(t) => t,
        None => vip_knee_threshold(vip, sensitivity).ok_or_else(|| {
            OplsError::Configuration(
                "no knee point found on the VIP curve; pass an explicit threshold".to_string(),
            )
        })?,
    };

    let mut order: Vec<usize> = (0..vip.nrows()).collect();
    order.sort_by(|&a, &b| vip[b].partial_cmp(&vip[a]).unwrap_or(std::cmp::Ordering::Equal));
    Ok(order.into_iter().filter(|&i| vip[i] >= cutoff).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_knee_on_elbowed_curve() {
        // Steep drop over the first few entries, then a flat tail.
        let values = [10.0, 6.0, 3.0, 1.2, 1.0, 0.9, 0.85, 0.8, 0.78, 0.75];
        let curve = Col::from_fn(values.len(), |i| values[i]);
        let knee = vip_knee_threshold(&curve, 1.0).expect("knee exists");
        assert!(knee > 0.75 && knee <= 3.0, "unexpected knee value {knee}");
    }

    #[test]
    fn test_knee_absent_on_linear_curve() {
        let curve = Col::from_fn(10, |i| 10.0 - i as f64);
        assert!(vip_knee_threshold(&curve, 1.0).is_none());
    }

    #[test]
    fn test_selection_with_explicit_threshold() {
        let vip = Col::from_fn(4, |i| [0.5, 2.0, 1.5, 0.1][i]);
        let selected = select_variables_by_vip(&vip, Some(1.0), 1.0).expect("explicit threshold");
        assert_eq!(selected, vec![1, 2]);
    }
}
