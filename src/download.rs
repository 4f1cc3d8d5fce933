//! Saving processed spreadsheets.
//!
//! Bytes are written to a hidden `.part` file next to the target and renamed into place,
//! so a failed write never leaves a truncated spreadsheet or a stray temporary file.

use crate::model::{DownloadRecord, DOWNLOAD_FILE_NAME};
use rand::RngCore;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Directory the spreadsheet lands in when none is configured.
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn temp_path(dir: &Path) -> PathBuf {
    let mut b = [0u8; 6];
    rand::thread_rng().fill_bytes(&mut b);
    let suffix: String = b.iter().map(|x| format!("{x:02x}")).collect();
    dir.join(format!(".{DOWNLOAD_FILE_NAME}.{suffix}.part"))
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "now".into())
}

/// Save `bytes` as `grouped_data.xlsx` inside `dir`, replacing any previous download.
pub fn save_spreadsheet(dir: &Path, bytes: &[u8]) -> io::Result<DownloadRecord> {
    fs::create_dir_all(dir)?;
    let target = dir.join(DOWNLOAD_FILE_NAME);
    let tmp = temp_path(dir);

    let written = (|| {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
        fs::rename(&tmp, &target)
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    Ok(DownloadRecord {
        path: target,
        bytes: bytes.len() as u64,
        saved_at: now_rfc3339(),
    })
}
