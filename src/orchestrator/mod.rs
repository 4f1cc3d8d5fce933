//! Application-level orchestration.
//!
//! The controller executes requests for the TUI; the steps are the upload and process
//! round trips shared with headless mode.

mod controller;
mod steps;

pub(crate) use controller::{run_controller, UiCommand};
pub(crate) use steps::{run_process, run_upload};
