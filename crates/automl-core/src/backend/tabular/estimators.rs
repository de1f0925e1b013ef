//! Candidate models.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::frame::TargetValues;
use super::TabularError;
use crate::config::TabularConfig;
use crate::models::ProblemType;

/// Raw model output for a batch of encoded rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    Values(Vec<f64>),
    /// One probability vector per row, in class order.
    Probabilities(Vec<Vec<f64>>),
}

impl Prediction {
    pub fn len(&self) -> usize {
        match self {
            Prediction::Values(values) => values.len(),
            Prediction::Probabilities(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Index of the largest probability; ties go to the lower class index.
pub(crate) fn argmax(probabilities: &[f64]) -> usize {
    probabilities
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &p)| {
            if p > best.1 {
                (i, p)
            } else {
                best
            }
        })
        .0
}

/// Model families the learner can fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    MeanBaseline,
    RidgeRegression,
    KNeighborsRegressor,
    MajorityClass,
    NearestCentroid,
    KNeighborsClassifier,
}

impl CandidateKind {
    pub fn name(&self) -> &'static str {
        match self {
            CandidateKind::MeanBaseline => "MeanBaseline",
            CandidateKind::RidgeRegression => "RidgeRegression",
            CandidateKind::KNeighborsRegressor => "KNeighborsRegressor",
            CandidateKind::MajorityClass => "MajorityClass",
            CandidateKind::NearestCentroid => "NearestCentroid",
            CandidateKind::KNeighborsClassifier => "KNeighborsClassifier",
        }
    }

    /// Candidates to try, in fitting order.
    pub fn for_presets(presets: &str, problem_type: ProblemType) -> Result<Vec<Self>, TabularError> {
        let (baseline, compact, neighbors) = if problem_type.is_classification() {
            (
                CandidateKind::MajorityClass,
                CandidateKind::NearestCentroid,
                CandidateKind::KNeighborsClassifier,
            )
        } else {
            (
                CandidateKind::MeanBaseline,
                CandidateKind::RidgeRegression,
                CandidateKind::KNeighborsRegressor,
            )
        };

        match presets.trim() {
            "best_quality" | "high_quality" => Ok(vec![baseline, compact, neighbors]),
            "good_quality" | "good_quality_faster" | "medium_quality" => {
                Ok(vec![baseline, compact])
            }
            "optimize_for_deployment" => Ok(vec![compact, baseline]),
            other => Err(TabularError::UnknownPresets(other.to_string())),
        }
    }

    /// Fit on encoded rows. `None` if this family does not handle `target`.
    pub fn fit(&self, x: &[Vec<f64>], target: &TargetValues) -> Option<Estimator> {
        match (self, target) {
            (CandidateKind::MeanBaseline, TargetValues::Regression(y)) => {
                Some(Estimator::MeanBaseline { mean: mean(y) })
            }
            (CandidateKind::RidgeRegression, TargetValues::Regression(y)) => {
                Some(fit_ridge(x, y, TabularConfig::RIDGE_ALPHA))
            }
            (CandidateKind::KNeighborsRegressor, TargetValues::Regression(y)) => {
                Some(Estimator::KNeighborsRegressor {
                    k: TabularConfig::KNN_NEIGHBORS.min(x.len()).max(1),
                    points: x.to_vec(),
                    targets: y.clone(),
                })
            }
            (CandidateKind::MajorityClass, TargetValues::Classification { labels, n_classes }) => {
                let mut priors = vec![0.0; *n_classes];
                for &label in labels {
                    priors[label] += 1.0;
                }
                let total = labels.len().max(1) as f64;
                priors.iter_mut().for_each(|p| *p /= total);
                Some(Estimator::MajorityClass { priors })
            }
            (CandidateKind::NearestCentroid, TargetValues::Classification { labels, n_classes }) => {
                Some(fit_centroids(x, labels, *n_classes))
            }
            (
                CandidateKind::KNeighborsClassifier,
                TargetValues::Classification { labels, n_classes },
            ) => Some(Estimator::KNeighborsClassifier {
                k: TabularConfig::KNN_NEIGHBORS.min(x.len()).max(1),
                n_classes: *n_classes,
                points: x.to_vec(),
                labels: labels.clone(),
            }),
            _ => None,
        }
    }
}

/// A fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model")]
pub enum Estimator {
    MeanBaseline {
        mean: f64,
    },
    RidgeRegression {
        weights: Vec<f64>,
        intercept: f64,
    },
    KNeighborsRegressor {
        k: usize,
        points: Vec<Vec<f64>>,
        targets: Vec<f64>,
    },
    MajorityClass {
        priors: Vec<f64>,
    },
    NearestCentroid {
        /// `None` for classes with no training rows.
        centroids: Vec<Option<Vec<f64>>>,
    },
    KNeighborsClassifier {
        k: usize,
        n_classes: usize,
        points: Vec<Vec<f64>>,
        labels: Vec<usize>,
    },
}

impl Estimator {
    pub fn predict(&self, x: &[Vec<f64>]) -> Prediction {
        match self {
            Estimator::MeanBaseline { mean } => Prediction::Values(vec![*mean; x.len()]),
            Estimator::RidgeRegression { weights, intercept } => Prediction::Values(
                x.iter()
                    .map(|row| intercept + dot(weights, row))
                    .collect(),
            ),
            Estimator::KNeighborsRegressor { k, points, targets } => Prediction::Values(
                x.iter()
                    .map(|row| {
                        let nearest = nearest(points, row, *k);
                        nearest.iter().map(|&i| targets[i]).sum::<f64>() / nearest.len().max(1) as f64
                    })
                    .collect(),
            ),
            Estimator::MajorityClass { priors } => {
                Prediction::Probabilities(vec![priors.clone(); x.len()])
            }
            Estimator::NearestCentroid { centroids } => Prediction::Probabilities(
                x.iter().map(|row| centroid_probabilities(centroids, row)).collect(),
            ),
            Estimator::KNeighborsClassifier {
                k,
                n_classes,
                points,
                labels,
            } => Prediction::Probabilities(
                x.iter()
                    .map(|row| {
                        let nearest = nearest(points, row, *k);
                        let mut votes = vec![0.0; *n_classes];
                        for &i in &nearest {
                            votes[labels[i]] += 1.0;
                        }
                        let total = nearest.len().max(1) as f64;
                        votes.iter_mut().for_each(|v| *v /= total);
                        votes
                    })
                    .collect(),
            ),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Indices of the `k` closest points; ties go to the earlier point.
fn nearest(points: &[Vec<f64>], row: &[f64], k: usize) -> Vec<usize> {
    let mut distances: Vec<(f64, usize)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (squared_distance(p, row), i))
        .collect();
    distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    distances.into_iter().take(k).map(|(_, i)| i).collect()
}

fn fit_ridge(x: &[Vec<f64>], y: &[f64], alpha: f64) -> Estimator {
    let width = x.first().map_or(0, Vec::len);
    let y_mean = mean(y);
    let x_mean: Vec<f64> = (0..width)
        .map(|j| mean(&x.iter().map(|row| row[j]).collect::<Vec<_>>()))
        .collect();

    // Normal equations on centered data: (XᵀX + αI) w = Xᵀy
    let mut gram = vec![vec![0.0; width]; width];
    let mut rhs = vec![0.0; width];
    for (row, &target) in x.iter().zip(y) {
        let centered: Vec<f64> = row.iter().zip(&x_mean).map(|(v, m)| v - m).collect();
        let yc = target - y_mean;
        for i in 0..width {
            rhs[i] += centered[i] * yc;
            for j in i..width {
                gram[i][j] += centered[i] * centered[j];
            }
        }
    }
    for i in 0..width {
        for j in 0..i {
            gram[i][j] = gram[j][i];
        }
        gram[i][i] += alpha;
    }

    let weights = solve_linear(gram, rhs).unwrap_or_else(|| vec![0.0; width]);
    let intercept = y_mean - dot(&weights, &x_mean);
    Estimator::RidgeRegression { weights, intercept }
}

/// Gaussian elimination with partial pivoting. `None` if singular.
fn solve_linear(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| {
            a[i][col]
                .abs()
                .partial_cmp(&a[j][col].abs())
                .unwrap_or(Ordering::Equal)
        })?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * solution[k]).sum();
        solution[row] = (b[row] - tail) / a[row][row];
    }
    solution.iter().all(|v| v.is_finite()).then_some(solution)
}

fn fit_centroids(x: &[Vec<f64>], labels: &[usize], n_classes: usize) -> Estimator {
    let width = x.first().map_or(0, Vec::len);
    let mut sums = vec![vec![0.0; width]; n_classes];
    let mut counts = vec![0usize; n_classes];

    for (row, &label) in x.iter().zip(labels) {
        counts[label] += 1;
        for (sum, v) in sums[label].iter_mut().zip(row) {
            *sum += v;
        }
    }

    let centroids = sums
        .into_iter()
        .zip(counts)
        .map(|(sum, count)| {
            (count > 0).then(|| sum.into_iter().map(|s| s / count as f64).collect::<Vec<f64>>())
        })
        .collect();
    Estimator::NearestCentroid { centroids }
}

/// Softmax over negative squared distances to each centroid.
fn centroid_probabilities(centroids: &[Option<Vec<f64>>], row: &[f64]) -> Vec<f64> {
    let scores: Vec<Option<f64>> = centroids
        .iter()
        .map(|c| c.as_ref().map(|c| -squared_distance(c, row)))
        .collect();
    let max = scores
        .iter()
        .flatten()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    let exps: Vec<f64> = scores
        .iter()
        .map(|s| s.map_or(0.0, |s| (s - max).exp()))
        .collect();
    let total: f64 = exps.iter().sum();
    if total > 0.0 {
        exps.iter().map(|e| e / total).collect()
    } else {
        vec![1.0 / centroids.len().max(1) as f64; centroids.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification(labels: Vec<usize>, n_classes: usize) -> TargetValues {
        TargetValues::Classification { labels, n_classes }
    }

    #[test]
    fn test_presets() {
        let best = CandidateKind::for_presets("best_quality", ProblemType::Regression).unwrap();
        assert_eq!(best.len(), 3);
        assert_eq!(best[0], CandidateKind::MeanBaseline);

        let medium = CandidateKind::for_presets("medium_quality", ProblemType::Binary).unwrap();
        assert!(!medium.contains(&CandidateKind::KNeighborsClassifier));

        assert!(matches!(
            CandidateKind::for_presets("extreme", ProblemType::Regression),
            Err(TabularError::UnknownPresets(_))
        ));
    }

    #[test]
    fn test_ridge_recovers_linear_relation() {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64 / 10.0]).collect();
        let y: Vec<f64> = x.iter().map(|r| 3.0 * r[0] + 1.0).collect();

        let model = fit_ridge(&x, &y, 1e-6);
        let Prediction::Values(pred) = model.predict(&[vec![0.5]]) else {
            panic!("regression output expected");
        };
        assert!((pred[0] - 2.5).abs() < 1e-3);
    }

    #[test]
    fn test_ridge_without_features_predicts_mean() {
        let x = vec![vec![], vec![]];
        let model = fit_ridge(&x, &[2.0, 4.0], 1.0);
        assert_eq!(model.predict(&[vec![]]), Prediction::Values(vec![3.0]));
    }

    #[test]
    fn test_solve_linear() {
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let solution = solve_linear(a, vec![3.0, 5.0]).unwrap();
        assert!((solution[0] - 0.8).abs() < 1e-9);
        assert!((solution[1] - 1.4).abs() < 1e-9);

        assert!(solve_linear(vec![vec![0.0]], vec![1.0]).is_none());
    }

    #[test]
    fn test_majority_class() {
        let target = classification(vec![0, 1, 1, 1], 2);
        let model = CandidateKind::MajorityClass.fit(&vec![Vec::new(); 4], &target).unwrap();
        assert_eq!(
            model.predict(&[vec![]]),
            Prediction::Probabilities(vec![vec![0.25, 0.75]])
        );
    }

    #[test]
    fn test_nearest_centroid_separates_clusters() {
        let x = vec![vec![-2.0], vec![-1.8], vec![2.0], vec![2.2]];
        let target = classification(vec![0, 0, 1, 1], 3);
        let model = CandidateKind::NearestCentroid.fit(&x, &target).unwrap();

        let Prediction::Probabilities(rows) = model.predict(&[vec![-1.9], vec![2.1]]) else {
            panic!("classification output expected");
        };
        assert_eq!(argmax(&rows[0]), 0);
        assert_eq!(argmax(&rows[1]), 1);
        // No training rows for class 2.
        assert_eq!(rows[0][2], 0.0);
        assert!((rows[1].iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_knn_classifier_votes() {
        let x = vec![vec![0.0], vec![0.1], vec![0.2], vec![5.0], vec![5.1]];
        let target = classification(vec![0, 0, 0, 1, 1], 2);
        let model = CandidateKind::KNeighborsClassifier.fit(&x, &target).unwrap();
        assert_eq!(
            model.predict(&[vec![0.05]]),
            Prediction::Probabilities(vec![vec![0.6, 0.4]])
        );
    }

    #[test]
    fn test_mismatched_target_is_skipped() {
        let target = TargetValues::Regression(vec![1.0]);
        assert!(CandidateKind::MajorityClass.fit(&[vec![]], &target).is_none());
    }

    #[test]
    fn test_argmax_ties_pick_first() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.2, 0.3, 0.5]), 2);
    }
}
