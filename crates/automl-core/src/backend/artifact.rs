//! Artifact directory I/O.
//!
//! JSON files are written atomically:
//! 1. Serialize to a temp file with a unique suffix
//! 2. `sync_all` so the data reaches disk
//! 3. Rename over the target
//!
//! A [`Manifest`] records the SHA-256 of the predictor file so a truncated or
//! edited artifact is rejected on load.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::config::ArtifactConfig;
use crate::error::{AutoMlError, Result};

/// Integrity record stored next to the predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub model_id: String,
    pub predictor_sha256: String,
    pub created_at: DateTime<Utc>,
}

impl Manifest {
    /// Describe the predictor file currently in `dir`.
    pub fn for_dir(model_id: &str, dir: &Path) -> Result<Self> {
        Ok(Self {
            format_version: ArtifactConfig::FORMAT_VERSION,
            model_id: model_id.to_string(),
            predictor_sha256: sha256_file(&dir.join(ArtifactConfig::PREDICTOR_FILENAME))?,
            created_at: Utc::now(),
        })
    }

    /// Check the predictor file in `dir` against this manifest.
    pub fn verify(&self, dir: &Path) -> Result<()> {
        if self.format_version != ArtifactConfig::FORMAT_VERSION {
            return Err(AutoMlError::BackendFailure {
                message: format!(
                    "Unsupported artifact format version {} (expected {})",
                    self.format_version,
                    ArtifactConfig::FORMAT_VERSION
                ),
            });
        }

        let actual = sha256_file(&dir.join(ArtifactConfig::PREDICTOR_FILENAME))?;
        if actual != self.predictor_sha256 {
            return Err(AutoMlError::BackendFailure {
                message: format!("Predictor checksum mismatch in {}", dir.display()),
            });
        }
        Ok(())
    }
}

/// Read and parse a JSON file.
///
/// Returns `None` if the file doesn't exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let mut contents = String::new();
    File::open(path)
        .and_then(|mut file| file.read_to_string(&mut contents))
        .map_err(|e| AutoMlError::Io {
            message: format!("Failed to read {}", path.display()),
            path: Some(path.to_path_buf()),
            source: Some(e),
        })?;

    let data = serde_json::from_str(&contents).map_err(|e| AutoMlError::Json {
        message: format!("Failed to parse {}: {}", path.display(), e),
        source: Some(e),
    })?;

    Ok(Some(data))
}

/// Write data to a JSON file atomically.
pub fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| AutoMlError::io_with_path(e, parent))?;
        }
    }

    let temp_path = path.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));

    let serialized = serde_json::to_vec_pretty(data).map_err(|e| AutoMlError::Json {
        message: format!("Failed to serialize {}: {}", path.display(), e),
        source: Some(e),
    })?;

    let written = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .and_then(|mut file| {
            file.write_all(&serialized)?;
            file.flush()?;
            file.sync_all()
        });

    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(AutoMlError::Io {
            message: format!("Failed to write temp file {}", temp_path.display()),
            path: Some(temp_path),
            source: Some(e),
        });
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(AutoMlError::Io {
            message: format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            ),
            path: Some(path.to_path_buf()),
            source: Some(e),
        });
    }

    debug!("Wrote {}", path.display());
    Ok(())
}

/// SHA-256 of a file as lowercase hex.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| AutoMlError::io_with_path(e, path))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| AutoMlError::io_with_path(e, path))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Total size of regular files under `dir`.
pub fn dir_size(dir: &Path) -> Result<u64> {
    let mut total = 0u64;
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| AutoMlError::Io {
            message: format!("Failed to walk {}: {}", dir.display(), e),
            path: Some(dir.to_path_buf()),
            source: e.into_io_error(),
        })?;
        if entry.file_type().is_file() {
            let metadata = entry
                .metadata()
                .map_err(|e| AutoMlError::Other(format!("Failed to stat {}: {}", entry.path().display(), e)))?;
            total += metadata.len();
        }
    }
    Ok(total)
}

/// Owns a freshly created artifact directory until the write completes.
///
/// Dropping the guard without [`commit`](Self::commit) removes the directory,
/// including when the owning thread unwinds.
pub struct ArtifactDirGuard {
    path: PathBuf,
    committed: bool,
}

impl ArtifactDirGuard {
    /// Create `path`. Fails if it already exists.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| AutoMlError::io_with_path(e, parent))?;
        }
        fs::create_dir(&path).map_err(|e| AutoMlError::io_with_path(e, &path))?;
        Ok(Self {
            path,
            committed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the directory.
    pub fn commit(mut self) -> PathBuf {
        self.committed = true;
        self.path.clone()
    }
}

impl Drop for ArtifactDirGuard {
    fn drop(&mut self) {
        if self.committed || !self.path.exists() {
            return;
        }
        match fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("Removed incomplete artifact {}", self.path.display()),
            Err(e) => warn!(
                "Failed to remove incomplete artifact {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
