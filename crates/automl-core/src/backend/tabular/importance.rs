//! Permutation feature importance.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::Value;
use std::collections::BTreeMap;

use super::frame::TargetValues;
use super::predictor::Predictor;
use crate::config::TabularConfig;

/// Drop in validation score when each feature column is shuffled.
///
/// `rows` are feature cells aligned with the predictor's schema. Larger
/// values mean the model leans on that column more.
pub fn permutation_importance(
    predictor: &Predictor,
    rows: &[Vec<Value>],
    truth: &TargetValues,
    seed: u64,
) -> BTreeMap<String, f64> {
    let n = rows.len().min(truth.len()).min(TabularConfig::IMPORTANCE_SUBSAMPLE);
    let indices: Vec<usize> = (0..n).collect();
    let rows = &rows[..n];
    let truth = truth.select(&indices);

    let metric = predictor.eval_metric;
    let score = |candidate: &[Vec<Value>]| {
        let encoded = predictor.schema.encode_rows(candidate);
        metric.score(&truth, &predictor.estimator.predict(&encoded))
    };

    let baseline = score(rows);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut importance = BTreeMap::new();

    for (col, name) in predictor.feature_columns().into_iter().enumerate() {
        let mut order = indices.clone();
        order.shuffle(&mut rng);

        let permuted: Vec<Vec<Value>> = rows
            .iter()
            .zip(&order)
            .map(|(row, &source)| {
                let mut row = row.clone();
                if let (Some(cell), Some(replacement)) = (row.get_mut(col), rows[source].get(col)) {
                    *cell = replacement.clone();
                }
                row
            })
            .collect();

        let drop = baseline - score(permuted.as_slice());
        importance.insert(name, if drop.is_finite() { drop } else { 0.0 });
    }

    importance
}
