// Artifact listing and download path resolution

use crate::domain::artifact::DOWNLOADABLE_EXTENSIONS;
use crate::domain::{Artifact, ArtifactKind};
use crate::error::{AppError, Result};
use std::path::{Component, Path, PathBuf};

/// Every file under `job_dir`, sorted by relative path.
///
/// A missing directory yields an empty list.
pub async fn list(job_dir: &Path) -> Result<Vec<Artifact>> {
    let mut artifacts = Vec::new();
    if !tokio::fs::try_exists(job_dir).await? {
        return Ok(artifacts);
    }

    let mut pending = vec![job_dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            let path = entry.path();
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                let size = entry.metadata().await?.len();
                artifacts.push(Artifact {
                    path: relative_slash_path(job_dir, &path),
                    kind: ArtifactKind::from_path(&path),
                    size,
                });
            }
        }
    }

    artifacts.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(artifacts)
}

/// Resolve `rel` inside `job_dir` for download.
///
/// Rejects paths that leave the job directory, anything that is not a
/// regular file, and extensions outside the download allow-list.
pub async fn resolve(job_dir: &Path, rel: &str) -> Result<PathBuf> {
    let rel_path = Path::new(rel);
    let escapes = rel.trim().is_empty()
        || rel_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(AppError::Validation("invalid artifact path".into()));
    }

    let candidate = job_dir.join(rel_path);
    let (Ok(root), Ok(resolved)) = (
        tokio::fs::canonicalize(job_dir).await,
        tokio::fs::canonicalize(&candidate).await,
    ) else {
        return Err(AppError::NotFound("artifact not found".into()));
    };
    // Symlinks can still point outside
    if !resolved.starts_with(&root) {
        return Err(AppError::Validation("invalid artifact path".into()));
    }

    let is_file = tokio::fs::metadata(&resolved)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(AppError::NotFound("artifact not found".into()));
    }

    let ext = resolved
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !DOWNLOADABLE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(AppError::Validation("unsupported artifact extension".into()));
    }
    Ok(resolved)
}

fn relative_slash_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
