//! Atomic file writes.

use std::path::Path;

use serde::Serialize;

use crate::error::StoreResult;

/// Write bytes to `path` atomically: write a sibling tmp file, then rename
/// over the target. The tmp file lives in the same directory so the rename
/// stays on one filesystem.
pub async fn write_bytes_atomic(path: impl AsRef<Path>, bytes: &[u8]) -> StoreResult<()> {
    let path = path.as_ref();
    let tmp = path.with_extension("tmp");

    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Serialize a value as pretty JSON and write it atomically.
pub async fn write_json_atomic<T: Serialize>(
    path: impl AsRef<Path>,
    value: &T,
) -> StoreResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_bytes_atomic(path, &bytes).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_and_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("data.json");

        write_json_atomic(&path, &serde_json::json!({"v": 1}))
            .await
            .unwrap();
        write_json_atomic(&path, &serde_json::json!({"v": 2}))
            .await
            .unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let v: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(v["v"], 2);

        // No tmp file left behind.
        assert!(!tmp.path().join("data.tmp").exists());
    }
}
