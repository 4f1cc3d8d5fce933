//! In-memory backend for tests.

use crate::backend::WizardBackend;
use crate::error::RequestError;
use crate::model::{ProcessRequest, UploadFile};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Mutex;

pub struct FakeBackend {
    columns: Result<Vec<String>, RequestError>,
    spreadsheet: Result<Bytes, RequestError>,
    uploads: Mutex<Vec<String>>,
    processed: Mutex<Vec<ProcessRequest>>,
    stall_process: bool,
}

impl FakeBackend {
    pub fn with_columns(cols: &[&str]) -> Self {
        Self {
            columns: Ok(cols.iter().map(|c| c.to_string()).collect()),
            spreadsheet: Ok(Bytes::from_static(b"PK\x03\x04")),
            uploads: Mutex::new(Vec::new()),
            processed: Mutex::new(Vec::new()),
            stall_process: false,
        }
    }

    pub fn with_spreadsheet(mut self, body: &'static [u8]) -> Self {
        self.spreadsheet = Ok(Bytes::from_static(body));
        self
    }

    pub fn failing_upload(mut self, err: RequestError) -> Self {
        self.columns = Err(err);
        self
    }

    pub fn failing_process(mut self, err: RequestError) -> Self {
        self.spreadsheet = Err(err);
        self
    }

    /// Process requests never complete.
    pub fn stalled_process(mut self) -> Self {
        self.stall_process = true;
        self
    }

    pub fn uploaded_names(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn processed(&self) -> Vec<ProcessRequest> {
        self.processed.lock().unwrap().clone()
    }
}

#[async_trait]
impl WizardBackend for FakeBackend {
    async fn upload(&self, files: Vec<UploadFile>) -> Result<Vec<String>, RequestError> {
        self.uploads
            .lock()
            .unwrap()
            .extend(files.into_iter().map(|f| f.file_name));
        self.columns.clone()
    }

    async fn process(&self, request: &ProcessRequest) -> Result<Bytes, RequestError> {
        self.processed.lock().unwrap().push(request.clone());
        if self.stall_process {
            futures::future::pending::<()>().await;
        }
        self.spreadsheet.clone()
    }
}
