//! The saved model artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::estimators::{argmax, Estimator, Prediction};
use super::frame::FeatureSchema;
use super::metrics::EvalMetric;
use super::TabularError;
use crate::backend::PredictOutcome;
use crate::models::{FeatureRow, ProblemType};

/// Everything needed to predict: encoding, fitted model, class labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictor {
    pub format_version: u32,
    pub model_id: String,
    pub label: String,
    pub problem_type: ProblemType,
    pub eval_metric: EvalMetric,
    pub best_model: String,
    pub schema: FeatureSchema,
    /// Class values in probability order; empty for regression.
    pub classes: Vec<Value>,
    pub estimator: Estimator,
    pub trained_at: DateTime<Utc>,
}

impl Predictor {
    pub fn feature_columns(&self) -> Vec<String> {
        self.schema.column_names()
    }

    /// Encode request rows keyed by column name.
    ///
    /// Absent columns are imputed. A row sharing no column with the schema is
    /// rejected.
    pub fn encode_rows(&self, rows: &[FeatureRow]) -> Result<Vec<Vec<f64>>, TabularError> {
        let columns = self.feature_columns();

        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                let by_name: HashMap<&str, &Value> =
                    row.iter().map(|(k, v)| (k.trim(), v)).collect();
                let cells: Vec<Option<&Value>> = columns
                    .iter()
                    .map(|c| by_name.get(c.as_str()).copied())
                    .collect();

                if !columns.is_empty() && cells.iter().all(Option::is_none) {
                    return Err(TabularError::UnrecognizedRow {
                        row: i,
                        expected: columns.join(", "),
                    });
                }
                Ok(self.schema.encode(&cells))
            })
            .collect()
    }

    /// Predict a batch of request rows.
    pub fn predict(&self, rows: &[FeatureRow]) -> Result<PredictOutcome, TabularError> {
        let encoded = self.encode_rows(rows)?;
        Ok(self.outcome(self.estimator.predict(&encoded)))
    }

    /// Turn raw model output into response values.
    pub fn outcome(&self, prediction: Prediction) -> PredictOutcome {
        match prediction {
            Prediction::Values(values) => PredictOutcome {
                predictions: values.into_iter().map(number_value).collect(),
                probabilities: None,
            },
            Prediction::Probabilities(rows) => PredictOutcome {
                predictions: rows
                    .iter()
                    .map(|probs| self.classes.get(argmax(probs)).cloned().unwrap_or(Value::Null))
                    .collect(),
                probabilities: Some(rows),
            },
        }
    }
}

fn number_value(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tabular::frame::ColumnEncoding;
    use serde_json::json;

    fn predictor(estimator: Estimator, classes: Vec<Value>) -> Predictor {
        Predictor {
            format_version: 1,
            model_id: "m1".into(),
            label: "y".into(),
            problem_type: if classes.is_empty() {
                ProblemType::Regression
            } else {
                ProblemType::Binary
            },
            eval_metric: EvalMetric::Accuracy,
            best_model: "test".into(),
            schema: FeatureSchema {
                columns: vec![
                    ColumnEncoding::Numeric {
                        name: "a".into(),
                        mean: 0.0,
                        std: 1.0,
                    },
                    ColumnEncoding::Numeric {
                        name: "b".into(),
                        mean: 0.0,
                        std: 1.0,
                    },
                ],
            },
            classes,
            estimator,
            trained_at: Utc::now(),
        }
    }

    fn row(value: Value) -> FeatureRow {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_regression_outcome_has_no_probabilities() {
        let p = predictor(
            Estimator::RidgeRegression {
                weights: vec![1.0, 2.0],
                intercept: 0.5,
            },
            vec![],
        );
        let outcome = p.predict(&[row(json!({"a": 1, " b ": "2"}))]).unwrap();
        assert_eq!(outcome.predictions, vec![json!(5.5)]);
        assert!(outcome.probabilities.is_none());
    }

    #[test]
    fn test_classification_outcome_maps_classes() {
        let p = predictor(
            Estimator::MajorityClass {
                priors: vec![0.3, 0.7],
            },
            vec![json!("no"), json!("yes")],
        );
        let outcome = p.predict(&[row(json!({"a": 1})), row(json!({"b": 0}))]).unwrap();
        assert_eq!(outcome.predictions, vec![json!("yes"), json!("yes")]);
        assert_eq!(outcome.probabilities.unwrap()[1], vec![0.3, 0.7]);
    }

    #[test]
    fn test_unrelated_row_rejected() {
        let p = predictor(Estimator::MeanBaseline { mean: 1.0 }, vec![]);
        let err = p.predict(&[row(json!({"a": 1})), row(json!({"z": 1}))]).unwrap_err();
        assert!(matches!(err, TabularError::UnrecognizedRow { row: 1, .. }));
    }
}
