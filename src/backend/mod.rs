//! Access to the shaping service.
//!
//! The wizard only sees `WizardBackend`; `HttpBackend` is the reqwest implementation.

mod http;

pub use http::HttpBackend;

use crate::error::{RequestError, UploadError};
use crate::model::{ProcessRequest, UploadFile};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;

#[async_trait]
pub trait WizardBackend: Send + Sync {
    /// Send the files and return the column names the service discovered.
    async fn upload(&self, files: Vec<UploadFile>) -> Result<Vec<String>, RequestError>;

    /// Submit the chosen options and return the spreadsheet bytes.
    async fn process(&self, request: &ProcessRequest) -> Result<Bytes, RequestError>;
}

/// Open every path for a streamed multipart upload.
///
/// Unreadable paths fail here, before anything is sent.
pub async fn open_upload_files(paths: &[PathBuf]) -> Result<Vec<UploadFile>, UploadError> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let read_err = |source| UploadError::Read {
            path: path.clone(),
            source,
        };
        let file = tokio::fs::File::open(path).await.map_err(read_err)?;
        let meta = file.metadata().await.map_err(read_err)?;
        if meta.is_dir() {
            return Err(read_err(std::io::Error::other("is a directory")));
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        files.push(UploadFile {
            file_name,
            file,
            len: meta.len(),
        });
    }
    Ok(files)
}
