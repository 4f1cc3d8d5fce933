use anyhow::Result;
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

// Clipboard worker, started on first copy.
static CLIPBOARD_TX: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// Owning thread for clipboard writes. On Linux the clipboard contents live only as long
/// as the owning `Clipboard`, so each write is held for a moment before being dropped.
fn clipboard_worker() -> &'static std_mpsc::Sender<String> {
    CLIPBOARD_TX.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();
        std::thread::spawn(move || {
            for text in rx {
                let Ok(mut clipboard) = arboard::Clipboard::new() else {
                    continue;
                };
                if clipboard.set_text(text).is_ok() {
                    std::thread::sleep(Duration::from_secs(2));
                }
            }
        });
        tx
    })
}

/// Queue `text` for the clipboard without blocking the UI thread.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    clipboard_worker()
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("clipboard worker stopped"))
}
