//! Subcommand dispatch.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

use automl_core::{AutoMlApi, DatasetInfo, FeatureRow, ProblemType, TrainingConfig};

use crate::Command;

/// On-disk dataset layout accepted by `automl train`.
#[derive(Debug, Deserialize)]
struct DatasetFile {
    #[serde(default)]
    filename: Option<String>,
    headers: Vec<String>,
    rows: Vec<Vec<Value>>,
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn load_dataset(path: &Path) -> Result<DatasetInfo> {
    let file: DatasetFile = read_json_file(path)?;
    let filename = file.filename.unwrap_or_else(|| {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    let mut dataset = DatasetInfo::new(filename, file.headers, file.rows);
    dataset.file_size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    Ok(dataset)
}

fn not_found(model_id: &str) -> Value {
    json!({
        "success": false,
        "error": format!("Model not found: {}", model_id),
        "status": 404,
    })
}

pub(crate) async fn run(api: &AutoMlApi, command: Command) -> Result<Value> {
    let value = match command {
        Command::Train {
            dataset,
            name,
            target,
            problem_type,
            time_limit,
            eval_metric,
            presets,
            verbosity,
        } => {
            let dataset = load_dataset(&dataset)?;
            let problem_type: ProblemType = problem_type.parse()?;

            let mut config = TrainingConfig::new(name, target).with_problem_type(problem_type);
            if let Some(seconds) = time_limit {
                config = config.with_time_limit(seconds);
            }
            if let Some(metric) = eval_metric {
                config = config.with_eval_metric(metric);
            }
            if let Some(presets) = presets {
                config = config.with_presets(presets);
            }
            if let Some(verbosity) = verbosity {
                config = config.with_verbosity(verbosity);
            }

            serde_json::to_value(api.train(dataset, config).await?)?
        }
        Command::Predict { model_id, rows } => {
            let rows: Vec<FeatureRow> = read_json_file(&rows)?;
            serde_json::to_value(api.predict(model_id, rows).await?)?
        }
        Command::Status { model_id } => match api.get_status(&model_id).await? {
            Some(status) => json!({
                "success": true,
                "uuid": model_id,
                "status": status,
            }),
            None => not_found(&model_id),
        },
        Command::List => {
            let models = api.list_models().await?;
            json!({
                "success": true,
                "count": models.len(),
                "models": models,
            })
        }
        Command::Show { model_id } => match api.get_model(&model_id).await? {
            Some(details) => serde_json::to_value(details)?,
            None => not_found(&model_id),
        },
        Command::Delete { model_id } => {
            let deleted = api.delete_model(&model_id).await?;
            json!({
                "success": deleted,
                "uuid": model_id,
                "deleted": deleted,
            })
        }
        Command::Recover => {
            let report = api.recover().await?;
            json!({
                "success": true,
                "interrupted": report.interrupted,
                "orphaned_artifacts": report.orphaned_artifacts,
                "in_progress": report.in_progress,
            })
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_dataset_defaults_filename() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("houses.json");
        fs::write(
            &path,
            r#"{"headers": ["rooms", "price"], "rows": [[3, 250000], [4, 310000]]}"#,
        )
        .unwrap();

        let dataset = load_dataset(&path).unwrap();
        assert_eq!(dataset.filename, "houses.json");
        assert_eq!(dataset.total_rows, 2);
        assert!(dataset.file_size > 0);
    }

    #[test]
    fn test_load_dataset_rejects_bad_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();

        let err = load_dataset(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid JSON"));
    }

    #[tokio::test]
    async fn test_status_for_unknown_model() {
        let temp_dir = TempDir::new().unwrap();
        let api = AutoMlApi::new(temp_dir.path()).await.unwrap();

        let value = run(
            &api,
            Command::Status {
                model_id: "missing".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["status"], 404);
    }
}
