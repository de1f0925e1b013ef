//! Validation metrics.
//!
//! Scores are higher-is-better; error metrics are reported negated.

use serde::{Deserialize, Serialize};

use super::estimators::{argmax, Prediction};
use super::frame::TargetValues;
use super::TabularError;
use crate::models::ProblemType;

const PROBABILITY_FLOOR: f64 = 1e-15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalMetric {
    RootMeanSquaredError,
    MeanAbsoluteError,
    R2,
    Accuracy,
    BalancedAccuracy,
    LogLoss,
}

impl EvalMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvalMetric::RootMeanSquaredError => "root_mean_squared_error",
            EvalMetric::MeanAbsoluteError => "mean_absolute_error",
            EvalMetric::R2 => "r2",
            EvalMetric::Accuracy => "accuracy",
            EvalMetric::BalancedAccuracy => "balanced_accuracy",
            EvalMetric::LogLoss => "log_loss",
        }
    }

    /// Pick the metric for a resolved problem type, defaulting when unset.
    pub fn resolve(name: Option<&str>, problem_type: ProblemType) -> Result<Self, TabularError> {
        let classification = problem_type.is_classification();
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return Ok(if classification {
                EvalMetric::Accuracy
            } else {
                EvalMetric::RootMeanSquaredError
            });
        };

        let metric = match name.to_ascii_lowercase().as_str() {
            "root_mean_squared_error" | "rmse" => Some(EvalMetric::RootMeanSquaredError),
            "mean_absolute_error" | "mae" => Some(EvalMetric::MeanAbsoluteError),
            "r2" => Some(EvalMetric::R2),
            "accuracy" | "acc" => Some(EvalMetric::Accuracy),
            "balanced_accuracy" => Some(EvalMetric::BalancedAccuracy),
            "log_loss" => Some(EvalMetric::LogLoss),
            _ => None,
        };

        match metric {
            Some(metric) if metric.is_classification() == classification => Ok(metric),
            _ => Err(TabularError::UnknownMetric {
                metric: name.to_string(),
                problem_type: problem_type.to_string(),
            }),
        }
    }

    pub fn is_classification(&self) -> bool {
        matches!(
            self,
            EvalMetric::Accuracy | EvalMetric::BalancedAccuracy | EvalMetric::LogLoss
        )
    }

    /// Score predictions against the truth. Mismatched shapes score `-inf`.
    pub fn score(&self, truth: &TargetValues, prediction: &Prediction) -> f64 {
        match (truth, prediction) {
            (TargetValues::Regression(y), Prediction::Values(p)) if y.len() == p.len() => {
                self.score_regression(y, p)
            }
            (TargetValues::Classification { labels, n_classes }, Prediction::Probabilities(p))
                if labels.len() == p.len() =>
            {
                self.score_classification(labels, *n_classes, p)
            }
            _ => f64::NEG_INFINITY,
        }
    }

    fn score_regression(&self, y: &[f64], p: &[f64]) -> f64 {
        if y.is_empty() {
            return f64::NEG_INFINITY;
        }
        let n = y.len() as f64;
        match self {
            EvalMetric::RootMeanSquaredError => {
                let mse = y.iter().zip(p).map(|(a, b)| (a - b).powi(2)).sum::<f64>() / n;
                -mse.sqrt()
            }
            EvalMetric::MeanAbsoluteError => {
                -(y.iter().zip(p).map(|(a, b)| (a - b).abs()).sum::<f64>() / n)
            }
            EvalMetric::R2 => {
                let mean = y.iter().sum::<f64>() / n;
                let ss_tot: f64 = y.iter().map(|a| (a - mean).powi(2)).sum();
                let ss_res: f64 = y.iter().zip(p).map(|(a, b)| (a - b).powi(2)).sum();
                if ss_tot == 0.0 {
                    if ss_res == 0.0 {
                        1.0
                    } else {
                        0.0
                    }
                } else {
                    1.0 - ss_res / ss_tot
                }
            }
            _ => f64::NEG_INFINITY,
        }
    }

    fn score_classification(&self, labels: &[usize], n_classes: usize, p: &[Vec<f64>]) -> f64 {
        if labels.is_empty() {
            return f64::NEG_INFINITY;
        }
        let n = labels.len() as f64;
        match self {
            EvalMetric::Accuracy => {
                let correct = labels
                    .iter()
                    .zip(p)
                    .filter(|(label, probs)| argmax(probs) == **label)
                    .count();
                correct as f64 / n
            }
            EvalMetric::BalancedAccuracy => {
                let mut seen = vec![0usize; n_classes];
                let mut hits = vec![0usize; n_classes];
                for (&label, probs) in labels.iter().zip(p) {
                    seen[label] += 1;
                    if argmax(probs) == label {
                        hits[label] += 1;
                    }
                }
                let recalls: Vec<f64> = seen
                    .iter()
                    .zip(&hits)
                    .filter(|(s, _)| **s > 0)
                    .map(|(s, h)| *h as f64 / *s as f64)
                    .collect();
                recalls.iter().sum::<f64>() / recalls.len().max(1) as f64
            }
            EvalMetric::LogLoss => {
                let loss: f64 = labels
                    .iter()
                    .zip(p)
                    .map(|(&label, probs)| {
                        -probs
                            .get(label)
                            .copied()
                            .unwrap_or(0.0)
                            .max(PROBABILITY_FLOOR)
                            .ln()
                    })
                    .sum();
                -(loss / n)
            }
            _ => f64::NEG_INFINITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults_and_aliases() {
        assert_eq!(
            EvalMetric::resolve(None, ProblemType::Regression).unwrap(),
            EvalMetric::RootMeanSquaredError
        );
        assert_eq!(
            EvalMetric::resolve(Some(""), ProblemType::Multiclass).unwrap(),
            EvalMetric::Accuracy
        );
        assert_eq!(
            EvalMetric::resolve(Some("MAE"), ProblemType::Regression).unwrap(),
            EvalMetric::MeanAbsoluteError
        );
    }

    #[test]
    fn test_resolve_rejects_mismatch() {
        assert!(EvalMetric::resolve(Some("accuracy"), ProblemType::Regression).is_err());
        assert!(EvalMetric::resolve(Some("f1_macro"), ProblemType::Binary).is_err());
    }

    #[test]
    fn test_regression_scores_are_negated_errors() {
        let truth = TargetValues::Regression(vec![1.0, 2.0, 3.0]);
        let pred = Prediction::Values(vec![1.0, 2.0, 5.0]);

        let rmse = EvalMetric::RootMeanSquaredError.score(&truth, &pred);
        assert!((rmse + (4.0f64 / 3.0).sqrt()).abs() < 1e-12);

        let mae = EvalMetric::MeanAbsoluteError.score(&truth, &pred);
        assert!((mae + 2.0 / 3.0).abs() < 1e-12);

        let perfect = Prediction::Values(vec![1.0, 2.0, 3.0]);
        assert_eq!(EvalMetric::R2.score(&truth, &perfect), 1.0);
    }

    #[test]
    fn test_classification_scores() {
        let truth = TargetValues::Classification {
            labels: vec![0, 0, 0, 1],
            n_classes: 2,
        };
        let always_zero = Prediction::Probabilities(vec![vec![0.9, 0.1]; 4]);

        assert_eq!(EvalMetric::Accuracy.score(&truth, &always_zero), 0.75);
        assert_eq!(EvalMetric::BalancedAccuracy.score(&truth, &always_zero), 0.5);

        let log_loss = EvalMetric::LogLoss.score(&truth, &always_zero);
        let expected = -(3.0 * -(0.9f64).ln() + -(0.1f64).ln()) / 4.0;
        assert!((log_loss - expected).abs() < 1e-12);
    }

    #[test]
    fn test_shape_mismatch_scores_worst() {
        let truth = TargetValues::Regression(vec![1.0]);
        let pred = Prediction::Probabilities(vec![vec![1.0]]);
        assert_eq!(
            EvalMetric::RootMeanSquaredError.score(&truth, &pred),
            f64::NEG_INFINITY
        );
    }
}
