//! Extend-access dialog state machine
//!
//! ```text
//! Idle --open--> Selecting --begin_submit--> Submitting --resolve(Ok)--> Idle
//!                   ^                             |
//!                   +-------- resolve(Err) -------+
//! ```
//!
//! The dialog never edits the enrollment it was opened with. After a
//! successful grant the caller re-fetches the enrollment from its source.

use coursekeep_api::{Enrollment, ExtendAccessRequest, ExtensionOption};
use coursekeep_util::EnrollmentId;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{AccessEvaluator, ExtensionClient, ExtensionError};

/// Where the dialog is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    Idle,
    Selecting,
    Submitting,
}

/// Misuse of the dialog
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DialogError {
    #[error("Dialog is not open")]
    NotOpen,

    #[error("A request is already in flight")]
    Busy,

    #[error("No extension length selected")]
    NothingSelected,

    #[error("{0} days is not an available extension length")]
    OptionUnavailable(u32),

    #[error("{0}")]
    LimitReached(String),
}

/// Result of a finished submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogOutcome {
    /// Dialog closed; the caller should re-fetch this enrollment
    Refetch { enrollment_id: EnrollmentId },
    /// Dialog is back in Selecting with the same choice
    Failed(ExtensionError),
}

/// Extend-access dialog
#[derive(Debug, Clone)]
pub struct ExtendAccessDialog {
    evaluator: AccessEvaluator,
    state: DialogState,
    enrollment_id: Option<EnrollmentId>,
    options: Vec<ExtensionOption>,
    limit_message: Option<String>,
    selected: Option<u32>,
    /// Kept after a failure so that resubmitting the same choice reuses the
    /// request id
    pending: Option<ExtendAccessRequest>,
    last_error: Option<ExtensionError>,
}

impl ExtendAccessDialog {
    pub fn new(evaluator: AccessEvaluator) -> Self {
        Self {
            evaluator,
            state: DialogState::Idle,
            enrollment_id: None,
            options: Vec::new(),
            limit_message: None,
            selected: None,
            pending: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> DialogState {
        self.state
    }

    pub fn options(&self) -> &[ExtensionOption] {
        &self.options
    }

    pub fn selected(&self) -> Option<u32> {
        self.selected
    }

    pub fn last_error(&self) -> Option<&ExtensionError> {
        self.last_error.as_ref()
    }

    /// Set when the lifetime budget is spent; nothing can be selected then
    pub fn limit_message(&self) -> Option<&str> {
        self.limit_message.as_deref()
    }

    /// Controls are locked while a request is in flight
    pub fn is_interactive(&self) -> bool {
        self.state == DialogState::Selecting && self.limit_message.is_none()
    }

    /// Open the dialog for an enrollment snapshot
    pub fn open(&mut self, enrollment: &Enrollment) -> Result<(), DialogError> {
        if self.state == DialogState::Submitting {
            return Err(DialogError::Busy);
        }

        self.options = self.evaluator.extension_options(enrollment);
        self.limit_message = self.evaluator.limit_message(enrollment);
        self.enrollment_id = Some(enrollment.id.clone());
        self.selected = None;
        self.pending = None;
        self.last_error = None;
        self.state = DialogState::Selecting;

        debug!(
            enrollment_id = %enrollment.id,
            enabled = self.options.iter().filter(|o| o.enabled).count(),
            "Extend dialog opened"
        );
        Ok(())
    }

    /// Pick an extension length
    pub fn select(&mut self, days: u32) -> Result<(), DialogError> {
        match self.state {
            DialogState::Idle => return Err(DialogError::NotOpen),
            DialogState::Submitting => return Err(DialogError::Busy),
            DialogState::Selecting => {}
        }
        if let Some(message) = &self.limit_message {
            return Err(DialogError::LimitReached(message.clone()));
        }

        let available = self.options.iter().any(|o| o.days == days && o.enabled);
        if !available {
            return Err(DialogError::OptionUnavailable(days));
        }

        self.selected = Some(days);
        Ok(())
    }

    /// Move to Submitting and produce the request to send.
    ///
    /// Fails in any state other than Selecting, which is what stops a
    /// second submission while one is in flight.
    pub fn begin_submit(&mut self) -> Result<ExtendAccessRequest, DialogError> {
        match self.state {
            DialogState::Idle => return Err(DialogError::NotOpen),
            DialogState::Submitting => return Err(DialogError::Busy),
            DialogState::Selecting => {}
        }
        if let Some(message) = &self.limit_message {
            return Err(DialogError::LimitReached(message.clone()));
        }
        let days = self.selected.ok_or(DialogError::NothingSelected)?;
        let enrollment_id = self.enrollment_id.clone().ok_or(DialogError::NotOpen)?;

        let request = match self.pending.take() {
            Some(previous) if previous.days == days => previous,
            _ => ExtendAccessRequest::new(enrollment_id, days),
        };

        self.pending = Some(request.clone());
        self.state = DialogState::Submitting;
        debug!(
            enrollment_id = %request.enrollment_id,
            request_id = %request.request_id,
            days,
            "Submitting extension"
        );
        Ok(request)
    }

    /// Feed back the endpoint's answer
    pub fn resolve(
        &mut self,
        result: Result<Enrollment, ExtensionError>,
    ) -> Result<DialogOutcome, DialogError> {
        if self.state != DialogState::Submitting {
            return Err(DialogError::NotOpen);
        }

        match result {
            Ok(_) => {
                let enrollment_id = self.enrollment_id.take().ok_or(DialogError::NotOpen)?;
                info!(enrollment_id = %enrollment_id, days = ?self.selected, "Extension granted");
                self.reset();
                Ok(DialogOutcome::Refetch { enrollment_id })
            }
            Err(error) => {
                warn!(error = %error, days = ?self.selected, "Extension failed");
                self.state = DialogState::Selecting;
                self.last_error = Some(error.clone());
                Ok(DialogOutcome::Failed(error))
            }
        }
    }

    /// Close without submitting
    pub fn close(&mut self) -> Result<(), DialogError> {
        if self.state == DialogState::Submitting {
            return Err(DialogError::Busy);
        }
        self.reset();
        Ok(())
    }

    /// Submit the current selection through `client`: one attempt, no retry
    pub async fn submit<C>(&mut self, client: &C) -> Result<DialogOutcome, DialogError>
    where
        C: ExtensionClient + ?Sized,
    {
        let request = self.begin_submit()?;
        let result = client.extend_access(request).await;
        self.resolve(result)
    }

    fn reset(&mut self) {
        self.state = DialogState::Idle;
        self.enrollment_id = None;
        self.options.clear();
        self.limit_message = None;
        self.selected = None;
        self.pending = None;
        self.last_error = None;
    }
}
