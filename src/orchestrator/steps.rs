//! The two request steps, shared by the TUI controller and headless mode.

use crate::backend::{open_upload_files, WizardBackend};
use crate::download::save_spreadsheet;
use crate::error::{ProcessError, UploadError};
use crate::model::{DownloadRecord, ProcessRequest};
use std::path::{Path, PathBuf};
use tracing::info;

/// Open the files and stream them to the upload endpoint.
pub(crate) async fn run_upload(
    backend: &dyn WizardBackend,
    paths: &[PathBuf],
) -> Result<Vec<String>, UploadError> {
    let files = open_upload_files(paths).await?;
    info!(files = files.len(), "upload started");
    Ok(backend.upload(files).await?)
}

/// Submit the request and save the returned spreadsheet into `download_dir`.
pub(crate) async fn run_process(
    backend: &dyn WizardBackend,
    download_dir: &Path,
    request: &ProcessRequest,
) -> Result<DownloadRecord, ProcessError> {
    let body = backend.process(request).await?;
    let dir = download_dir.to_path_buf();
    tokio::task::spawn_blocking(move || save_spreadsheet(&dir, &body))
        .await
        .map_err(|e| ProcessError::Save(std::io::Error::other(e)))?
        .map_err(ProcessError::Save)
}
