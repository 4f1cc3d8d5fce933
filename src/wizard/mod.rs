//! Wizard state machine.
//!
//! `WizardState` names where the user is in the flow; `ViewState` owns everything the
//! panels show and is the only place transitions happen.

mod view;

pub use view::ViewState;

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WizardState {
    Idle,
    Uploading,
    ColumnsReady,
    OptionsConfirmed,
    Processing,
    Done,
    Error,
}

impl WizardState {
    /// A request is in flight.
    pub fn is_busy(self) -> bool {
        matches!(self, WizardState::Uploading | WizardState::Processing)
    }

    pub fn can_begin_upload(self) -> bool {
        !self.is_busy()
    }

    pub fn can_confirm_columns(self) -> bool {
        matches!(
            self,
            WizardState::ColumnsReady
                | WizardState::OptionsConfirmed
                | WizardState::Done
                | WizardState::Error
        )
    }

    pub fn can_begin_process(self) -> bool {
        matches!(
            self,
            WizardState::OptionsConfirmed | WizardState::Done | WizardState::Error
        )
    }

    pub fn shows_column_selection(self) -> bool {
        !matches!(self, WizardState::Idle | WizardState::Uploading)
    }

    pub fn shows_options(self) -> bool {
        matches!(
            self,
            WizardState::OptionsConfirmed
                | WizardState::Processing
                | WizardState::Done
                | WizardState::Error
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            WizardState::Idle => "idle",
            WizardState::Uploading => "uploading",
            WizardState::ColumnsReady => "choosing columns",
            WizardState::OptionsConfirmed => "choosing options",
            WizardState::Processing => "processing",
            WizardState::Done => "done",
            WizardState::Error => "failed",
        }
    }
}

impl fmt::Display for WizardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
