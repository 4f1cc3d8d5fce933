//! Request executor.
//!
//! Runs upload/process requests on the runtime and reports results back to the UI thread.

use super::steps::{run_process, run_upload};
use crate::backend::WizardBackend;
use crate::error::{ProcessError, RequestError, UploadError};
use crate::model::{ProcessRequest, WizardEvent};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Upload(Vec<PathBuf>),
    Process(ProcessRequest),
    Quit,
}

#[derive(Debug, Clone, Copy)]
enum RequestKind {
    Upload,
    Process,
}

/// Internal handle for the request currently in flight.
struct InFlight {
    kind: RequestKind,
    handle: JoinHandle<WizardEvent>,
}

/// Turn a crashed request task into the failure event its caller is waiting for.
fn join_failure(kind: RequestKind, err: tokio::task::JoinError) -> WizardEvent {
    let reason = RequestError::Transport(format!("request task failed: {err}"));
    match kind {
        RequestKind::Upload => WizardEvent::UploadFinished(Err(UploadError::Request(reason))),
        RequestKind::Process => WizardEvent::ProcessFinished(Err(ProcessError::Request(reason))),
    }
}

/// Execute UI commands one at a time and emit their results.
pub(crate) async fn run_controller(
    backend: Arc<dyn WizardBackend>,
    download_dir: PathBuf,
    event_tx: UnboundedSender<WizardEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut in_flight: Option<InFlight> = None;

    let res = loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Upload(paths)) => {
                        if in_flight.is_some() {
                            let _ = event_tx.send(WizardEvent::Info("Request already running".into()));
                            continue;
                        }
                        let backend = backend.clone();
                        in_flight = Some(InFlight {
                            kind: RequestKind::Upload,
                            handle: tokio::spawn(async move {
                                WizardEvent::UploadFinished(run_upload(backend.as_ref(), &paths).await)
                            }),
                        });
                    }
                    Some(UiCommand::Process(request)) => {
                        if in_flight.is_some() {
                            let _ = event_tx.send(WizardEvent::Info("Request already running".into()));
                            continue;
                        }
                        let backend = backend.clone();
                        let dir = download_dir.clone();
                        in_flight = Some(InFlight {
                            kind: RequestKind::Process,
                            handle: tokio::spawn(async move {
                                WizardEvent::ProcessFinished(
                                    run_process(backend.as_ref(), &dir, &request).await,
                                )
                            }),
                        });
                    }
                    Some(UiCommand::Quit) | None => {
                        // No cancellation protocol: quitting simply drops the request.
                        if let Some(ctx) = in_flight.take() {
                            debug!(kind = ?ctx.kind, "aborting in-flight request");
                            ctx.handle.abort();
                        }
                        break Ok(());
                    }
                }
            }
            // Borrow the handle rather than taking it, so a losing branch cannot drop it.
            done = async {
                match in_flight.as_mut() {
                    Some(ctx) => (ctx.kind, (&mut ctx.handle).await),
                    None => futures::future::pending().await,
                }
            } => {
                in_flight = None;
                let (kind, joined) = done;
                let ev = joined.unwrap_or_else(|e| {
                    warn!(?kind, error = %e, "request task failed");
                    join_failure(kind, e)
                });
                let _ = event_tx.send(ev);
            }
        }
    };

    res
}
