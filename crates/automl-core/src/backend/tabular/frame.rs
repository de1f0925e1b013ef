//! Dataset cleanup and feature encoding.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

use super::TabularError;
use crate::config::TabularConfig;
use crate::models::{DatasetInfo, ProblemType};

/// `null` or a blank string.
pub(crate) fn is_missing(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Numeric reading of a cell. Numeric strings count.
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Stable string key for a categorical cell; `None` when missing.
pub(crate) fn category_key(value: &Value) -> Option<String> {
    if is_missing(value) {
        return None;
    }
    if let Some(n) = as_number(value) {
        if n.fract() == 0.0 && n.abs() < 1e15 {
            return Some(format!("{}", n as i64));
        }
        return Some(format!("{}", n));
    }
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

/// A dataset split into feature cells and target cells.
#[derive(Debug, Clone)]
pub struct PreparedFrame {
    pub label: String,
    pub feature_names: Vec<String>,
    /// Feature cells, aligned with `feature_names`.
    pub rows: Vec<Vec<Value>>,
    pub target: Vec<Value>,
}

impl PreparedFrame {
    /// Trim headers, drop blank rows and rows without a target value.
    pub fn from_dataset(dataset: &DatasetInfo, label: &str) -> Result<Self, TabularError> {
        let headers: Vec<String> = dataset.headers.iter().map(|h| h.trim().to_string()).collect();
        let label = label.trim();
        let target_idx = headers
            .iter()
            .position(|h| h == label)
            .ok_or_else(|| TabularError::MissingTarget(label.to_string()))?;

        let feature_names: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != target_idx)
            .map(|(_, h)| h.clone())
            .collect();

        let mut rows = Vec::with_capacity(dataset.rows.len());
        let mut target = Vec::with_capacity(dataset.rows.len());

        for raw in &dataset.rows {
            if raw.iter().all(is_missing) {
                continue;
            }
            let cell = |i: usize| raw.get(i).cloned().unwrap_or(Value::Null);
            let label_cell = cell(target_idx);
            if is_missing(&label_cell) {
                continue;
            }
            rows.push(
                (0..headers.len())
                    .filter(|i| *i != target_idx)
                    .map(cell)
                    .collect(),
            );
            target.push(label_cell);
        }

        if target.is_empty() {
            return Err(TabularError::EmptyDataset);
        }

        Ok(Self {
            label: label.to_string(),
            feature_names,
            rows,
            target,
        })
    }

    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    /// Feature rows at `indices`.
    pub fn select_rows(&self, indices: &[usize]) -> Vec<Vec<Value>> {
        indices.iter().map(|&i| self.rows[i].clone()).collect()
    }
}

/// Settle the problem type, inferring it from the target when asked to.
pub fn resolve_problem_type(
    requested: ProblemType,
    label: &str,
    target: &[Value],
) -> Result<ProblemType, TabularError> {
    match requested {
        ProblemType::Auto => Ok(infer_problem_type(target)),
        ProblemType::Regression => {
            if let Some(bad) = target.iter().find(|v| as_number(v).is_none()) {
                return Err(TabularError::NonNumericTarget {
                    column: label.to_string(),
                    value: bad.to_string(),
                });
            }
            Ok(ProblemType::Regression)
        }
        ProblemType::Binary => {
            let classes = distinct_keys(target).len();
            if classes != 2 {
                return Err(TabularError::BinaryClassCount(classes));
            }
            Ok(ProblemType::Binary)
        }
        ProblemType::Multiclass => Ok(ProblemType::Multiclass),
    }
}

fn infer_problem_type(target: &[Value]) -> ProblemType {
    let distinct = distinct_keys(target).len();
    let numbers: Option<Vec<f64>> = target.iter().map(as_number).collect();

    match numbers {
        None if distinct == 2 => ProblemType::Binary,
        None => ProblemType::Multiclass,
        Some(_) if distinct == 2 => ProblemType::Binary,
        Some(values)
            if values.iter().all(|v| v.fract() == 0.0)
                && distinct <= TabularConfig::MAX_INFERRED_CLASSES =>
        {
            ProblemType::Multiclass
        }
        Some(_) => ProblemType::Regression,
    }
}

fn distinct_keys(values: &[Value]) -> BTreeSet<String> {
    values.iter().filter_map(category_key).collect()
}

/// Encoded target column.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetValues {
    Regression(Vec<f64>),
    Classification { labels: Vec<usize>, n_classes: usize },
}

impl TargetValues {
    /// Encode the target for `problem_type`, returning the class values in
    /// label order (empty for regression).
    pub fn encode(
        problem_type: ProblemType,
        label: &str,
        target: &[Value],
    ) -> Result<(Self, Vec<Value>), TabularError> {
        if !problem_type.is_classification() {
            let values = target
                .iter()
                .map(|v| {
                    as_number(v).ok_or_else(|| TabularError::NonNumericTarget {
                        column: label.to_string(),
                        value: v.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            return Ok((TargetValues::Regression(values), Vec::new()));
        }

        let mut representatives: HashMap<String, Value> = HashMap::new();
        for value in target {
            if let Some(key) = category_key(value) {
                representatives.entry(key).or_insert_with(|| value.clone());
            }
        }

        let mut keys: Vec<String> = representatives.keys().cloned().collect();
        let numeric: Option<Vec<f64>> = keys.iter().map(|k| k.parse::<f64>().ok()).collect();
        if numeric.is_some() {
            keys.sort_by(|a, b| {
                let (a, b) = (a.parse::<f64>().unwrap_or(0.0), b.parse::<f64>().unwrap_or(0.0));
                a.total_cmp(&b)
            });
        } else {
            keys.sort();
        }

        let index: HashMap<&str, usize> =
            keys.iter().enumerate().map(|(i, k)| (k.as_str(), i)).collect();
        let labels = target
            .iter()
            .map(|v| category_key(v).and_then(|k| index.get(k.as_str()).copied()).unwrap_or(0))
            .collect();
        let classes = keys
            .iter()
            .map(|k| representatives.get(k).cloned().unwrap_or(Value::Null))
            .collect::<Vec<_>>();

        Ok((
            TargetValues::Classification {
                labels,
                n_classes: classes.len(),
            },
            classes,
        ))
    }

    pub fn len(&self) -> usize {
        match self {
            TargetValues::Regression(values) => values.len(),
            TargetValues::Classification { labels, .. } => labels.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values at `indices`.
    pub fn select(&self, indices: &[usize]) -> Self {
        match self {
            TargetValues::Regression(values) => {
                TargetValues::Regression(indices.iter().map(|&i| values[i]).collect())
            }
            TargetValues::Classification { labels, n_classes } => TargetValues::Classification {
                labels: indices.iter().map(|&i| labels[i]).collect(),
                n_classes: *n_classes,
            },
        }
    }
}

/// Split row indices into (train, validation).
///
/// Small datasets are scored on their own training rows.
pub fn holdout_split(n_rows: usize, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let all: Vec<usize> = (0..n_rows).collect();
    if n_rows < TabularConfig::MIN_ROWS_FOR_HOLDOUT {
        return (all.clone(), all);
    }

    let mut shuffled = all;
    let mut rng = StdRng::seed_from_u64(seed);
    shuffled.shuffle(&mut rng);

    let n_val = ((n_rows as f64 * TabularConfig::HOLDOUT_FRACTION).round() as usize).max(1);
    let mut validation = shuffled.split_off(n_rows - n_val);
    let mut train = shuffled;
    train.sort_unstable();
    validation.sort_unstable();
    (train, validation)
}

/// How one input column becomes encoded features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnEncoding {
    /// Mean-imputed, standardized.
    Numeric { name: String, mean: f64, std: f64 },
    /// One-hot over `categories`; anything else encodes to all zeros.
    Categorical {
        name: String,
        categories: Vec<String>,
    },
}

impl ColumnEncoding {
    pub fn name(&self) -> &str {
        match self {
            ColumnEncoding::Numeric { name, .. } | ColumnEncoding::Categorical { name, .. } => name,
        }
    }

    fn width(&self) -> usize {
        match self {
            ColumnEncoding::Numeric { .. } => 1,
            ColumnEncoding::Categorical { categories, .. } => categories.len(),
        }
    }
}

/// Encoding for every feature column, fitted on training rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub columns: Vec<ColumnEncoding>,
}

impl FeatureSchema {
    pub fn fit(names: &[String], rows: &[Vec<Value>]) -> Self {
        let columns = names
            .iter()
            .enumerate()
            .map(|(col, name)| {
                let cells: Vec<&Value> = rows
                    .iter()
                    .filter_map(|row| row.get(col))
                    .filter(|v| !is_missing(v))
                    .collect();
                fit_column(name, &cells)
            })
            .collect();
        Self { columns }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    /// Number of encoded features.
    pub fn width(&self) -> usize {
        self.columns.iter().map(ColumnEncoding::width).sum()
    }

    /// Encode one row; `cells` is aligned with `columns`.
    pub fn encode(&self, cells: &[Option<&Value>]) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.width());
        for (column, cell) in self.columns.iter().zip(cells) {
            let cell = cell.filter(|v| !is_missing(v));
            match column {
                ColumnEncoding::Numeric { mean, std, .. } => {
                    let x = cell.and_then(as_number).unwrap_or(*mean);
                    out.push((x - mean) / std);
                }
                ColumnEncoding::Categorical { categories, .. } => {
                    let key = cell.and_then(category_key);
                    out.extend(
                        categories
                            .iter()
                            .map(|c| if Some(c) == key.as_ref() { 1.0 } else { 0.0 }),
                    );
                }
            }
        }
        out
    }

    /// Encode rows whose cells are aligned with `columns`.
    pub fn encode_rows(&self, rows: &[Vec<Value>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|row| {
                let cells: Vec<Option<&Value>> =
                    (0..self.columns.len()).map(|i| row.get(i)).collect();
                self.encode(&cells)
            })
            .collect()
    }
}

fn fit_column(name: &str, cells: &[&Value]) -> ColumnEncoding {
    let numbers: Option<Vec<f64>> = cells.iter().map(|v| as_number(v)).collect();

    match numbers {
        Some(values) => {
            if values.is_empty() {
                return ColumnEncoding::Numeric {
                    name: name.to_string(),
                    mean: 0.0,
                    std: 1.0,
                };
            }
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = variance.sqrt();
            ColumnEncoding::Numeric {
                name: name.to_string(),
                mean,
                std: if std > 1e-12 { std } else { 1.0 },
            }
        }
        None => {
            let mut counts: HashMap<String, usize> = HashMap::new();
            for key in cells.iter().filter_map(|v| category_key(v)) {
                *counts.entry(key).or_default() += 1;
            }
            let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            ranked.truncate(TabularConfig::MAX_CATEGORIES);

            let mut categories: Vec<String> = ranked.into_iter().map(|(k, _)| k).collect();
            categories.sort();
            ColumnEncoding::Categorical {
                name: name.to_string(),
                categories,
            }
        }
    }
}
