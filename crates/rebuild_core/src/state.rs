use std::time::Duration;

use crate::percent::{denominator, percentage};
use crate::view_model::{
    PollerViewModel, ProgressBarView, STATUS_FAILED, STATUS_STARTING, STATUS_SUCCESS,
};
use crate::JobProgress;

/// Identifies one job instance as seen by this poller. Responses tagged with
/// an older id are ignored.
pub type RunId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// Start request sent, no answer yet.
    Starting,
    /// Batch loop active.
    Running,
    /// Cancel request sent, waiting for it to resolve.
    Cancelling,
    /// Last run reported `done`.
    Finished,
    /// Last run stopped on a start or batch failure.
    Failed,
}

impl Phase {
    /// Whether the operator may start a new run from this phase.
    pub fn accepts_start(self) -> bool {
        matches!(self, Phase::Idle | Phase::Finished | Phase::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOrigin {
    Started,
    Resumed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerSettings {
    /// Pause before the first batch of a run discovered by the resume check.
    pub resume_delay: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            resume_delay: Duration::from_secs(1),
        }
    }
}

/// Client-side view of the job currently being driven.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientJobState {
    pub run: RunId,
    pub origin: RunOrigin,
    /// Set once per run and never cleared.
    pub cancel_requested: bool,
    pub batch_in_flight: bool,
    pub batches_issued: u64,
}

impl ClientJobState {
    fn new(run: RunId, origin: RunOrigin) -> Self {
        Self {
            run,
            origin,
            cancel_requested: false,
            batch_in_flight: false,
            batches_issued: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollerState {
    settings: PollerSettings,
    phase: Phase,
    job: Option<ClientJobState>,
    last_run: RunId,
    resume_check_pending: bool,
    progress: Option<JobProgress>,
    status: String,
    progress_visible: bool,
    dirty: bool,
}

impl PollerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: PollerSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn job(&self) -> Option<&ClientJobState> {
        self.job.as_ref()
    }

    pub fn settings(&self) -> &PollerSettings {
        &self.settings
    }

    /// True while a run is attached or the resume check has not answered.
    pub fn is_busy(&self) -> bool {
        self.job.is_some() || self.resume_check_pending
    }

    pub fn resume_check_pending(&self) -> bool {
        self.resume_check_pending
    }

    pub fn view(&self) -> PollerViewModel {
        let (percent, indeterminate) = match (self.phase, self.progress) {
            (Phase::Finished, _) => (100, false),
            (_, Some(progress)) => (percentage(progress.processed, progress.total), false),
            (Phase::Starting, None) => (0, true),
            (_, None) => (0, false),
        };
        PollerViewModel {
            phase: self.phase,
            progress: ProgressBarView {
                visible: self.progress_visible,
                indeterminate,
                percent,
                status: self.status.clone(),
            },
            start_enabled: self.phase.accepts_start(),
            cancel_visible: matches!(
                self.phase,
                Phase::Starting | Phase::Running | Phase::Cancelling
            ),
            cancel_enabled: matches!(self.phase, Phase::Starting | Phase::Running),
            batches_issued: self.job.as_ref().map_or(0, |job| job.batches_issued),
            dirty: self.dirty,
        }
    }

    /// Returns whether the state changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn job_for(&mut self, run: RunId) -> Option<&mut ClientJobState> {
        self.job.as_mut().filter(|job| job.run == run)
    }

    pub(crate) fn begin_run(&mut self, origin: RunOrigin) -> RunId {
        self.last_run += 1;
        let run = self.last_run;
        self.job = Some(ClientJobState::new(run, origin));
        self.dirty = true;
        run
    }

    pub(crate) fn enter_starting(&mut self) {
        self.phase = Phase::Starting;
        self.progress = None;
        self.progress_visible = true;
        self.status = STATUS_STARTING.to_string();
        self.dirty = true;
    }

    pub(crate) fn enter_running(&mut self) {
        self.phase = Phase::Running;
        self.dirty = true;
    }

    pub(crate) fn enter_cancelling(&mut self) {
        if let Some(job) = self.job.as_mut() {
            job.cancel_requested = true;
        }
        self.phase = Phase::Cancelling;
        self.dirty = true;
    }

    /// Marks the next batch as issued for `run`. Returns false when a batch is
    /// already outstanding, so callers never overlap batch requests.
    pub(crate) fn issue_batch(&mut self, run: RunId) -> bool {
        match self.job_for(run) {
            Some(job) if !job.batch_in_flight && !job.cancel_requested => {
                job.batch_in_flight = true;
                job.batches_issued += 1;
                self.dirty = true;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn apply_progress(&mut self, progress: JobProgress) {
        self.progress = Some(progress);
        self.progress_visible = true;
        self.status = format!(
            "Processing {} / {}...",
            progress.processed,
            denominator(progress.processed, progress.total)
        );
        self.dirty = true;
    }

    pub(crate) fn finish(&mut self, progress: JobProgress) {
        self.job = None;
        self.phase = Phase::Finished;
        self.progress = Some(progress);
        self.progress_visible = true;
        self.status = STATUS_SUCCESS.to_string();
        self.dirty = true;
    }

    pub(crate) fn fail(&mut self, message: &str) {
        self.job = None;
        self.phase = Phase::Failed;
        self.status = if message.is_empty() {
            STATUS_FAILED.to_string()
        } else {
            message.to_string()
        };
        self.dirty = true;
    }

    /// Back to idle with the progress display cleared.
    pub(crate) fn reset_to_idle(&mut self) {
        self.job = None;
        self.phase = Phase::Idle;
        self.progress = None;
        self.progress_visible = false;
        self.status.clear();
        self.dirty = true;
    }

    pub(crate) fn set_resume_check_pending(&mut self, pending: bool) {
        self.resume_check_pending = pending;
    }
}
