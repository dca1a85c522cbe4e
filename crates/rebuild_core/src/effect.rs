use std::time::Duration;

use crate::RunId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Ask the job server to start (or force-restart) the rebuild.
    StartJob { run: RunId, force: bool },
    /// Ask the job server to process exactly one batch.
    ProcessBatch { run: RunId },
    /// One-off progress query used by the resume check.
    FetchProgress,
    /// Best-effort request for the server to stop working on the job.
    CancelJob { run: RunId },
    /// Wait before the first batch of a resumed run.
    WaitBeforeResume { run: RunId, delay: Duration },
    /// Transient operator notification.
    Notify { level: NoticeLevel, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}
