use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::path::Path;

use super::StoreError;

/// Read and parse a JSON file.
///
/// A missing file and a file that does not parse as `T` both yield `Ok(None)`.
/// Any other I/O failure is returned.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!("Ignoring unparsable JSON in {}: {}", path.display(), e);
            Ok(None)
        }
    }
}

/// Serialize `value` as pretty JSON and replace `path` with it.
///
/// The content goes to a temporary sibling first and is renamed into place,
/// so readers never see a half-written file.
pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let body = serde_json::to_vec_pretty(value)?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| StoreError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4().simple()));

    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    tokio::fs::write(&tmp_path, &body).await.map_err(write_err)?;
    if let Err(source) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(source));
    }

    tracing::debug!("Wrote {} ({} bytes)", path.display(), body.len());
    Ok(())
}
