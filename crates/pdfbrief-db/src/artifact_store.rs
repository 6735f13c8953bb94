//! Filesystem artifact store for uploaded PDF bytes.
//!
//! Blobs live at `{root}/pdfs/{uuid}.pdf`. The stored path recorded on the
//! document is relative to the root, so the root can move between
//! deployments without touching the database.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use pdfbrief_core::defaults::PDF_SUBDIR;
use pdfbrief_core::{ArtifactStore, Error, RemoveOutcome, Result};

/// Relative stored path for a document id: `pdfs/{uuid}.pdf`.
pub fn stored_path_for(id: &Uuid) -> String {
    format!("{}/{}.pdf", PDF_SUBDIR, id.as_hyphenated())
}

/// Filesystem-backed [`ArtifactStore`].
#[derive(Debug, Clone)]
pub struct FilesystemArtifactStore {
    root: PathBuf,
}

impl FilesystemArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(Error::InvalidInput(format!(
                "stored path escapes artifact root: {}",
                path
            )));
        }
        Ok(self.root.join(relative))
    }

    /// Round-trip a small file through the store at startup.
    ///
    /// Catches permission errors and missing mounts before the first upload.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_dir = self.root.join(PDF_SUBDIR).join(".health-check");
        let test_file = test_dir.join("probe.bin");

        fs::create_dir_all(&test_dir)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", test_dir, e))?;

        let data = b"artifact-store-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_back = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_back != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;
        let _ = fs::remove_dir(&test_dir).await;

        Ok(())
    }
}

async fn write_then_rename(temp_path: &Path, full_path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(temp_path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(temp_path, full_path).await
}

#[async_trait]
impl ArtifactStore for FilesystemArtifactStore {
    async fn put(&self, id: Uuid, data: &[u8]) -> Result<String> {
        let stored_path = stored_path_for(&id);
        let full_path = self.full_path(&stored_path)?;
        debug!(
            subsystem = "storage",
            op = "put",
            pdf_id = %id,
            full_path = %full_path.display(),
            size = data.len(),
            "Writing artifact"
        );

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "artifact_store: create_dir_all failed");
                e
            })?;
        }

        // Temp file + rename so readers never observe a partial blob.
        let temp_path = full_path.with_extension("pdf.tmp");
        if let Err(e) = write_then_rename(&temp_path, &full_path, data).await {
            warn!(
                from = %temp_path.display(),
                to = %full_path.display(),
                error = %e,
                "artifact_store: write failed"
            );
            let _ = fs::remove_file(&temp_path).await;
            return Err(Error::Io(e));
        }

        Ok(stored_path)
    }

    async fn remove(&self, path: &str) -> Result<RemoveOutcome> {
        let full_path = self.full_path(path)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(RemoveOutcome::Removed),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RemoveOutcome::NotFound),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn resolve_absolute(&self, path: &str) -> Result<PathBuf> {
        let full_path = self.full_path(path)?;
        if full_path.is_absolute() {
            return Ok(full_path);
        }
        let cwd = std::env::current_dir()?;
        Ok(cwd.join(full_path))
    }
}
