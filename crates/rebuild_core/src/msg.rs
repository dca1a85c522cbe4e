use crate::RunId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Operator asked for a rebuild.
    StartClicked,
    /// Operator asked to cancel the running rebuild.
    CancelClicked,
    /// Interface finished initializing; triggers the resume check.
    InterfaceLoaded,
    /// Outcome of a start request.
    StartFinished {
        run: RunId,
        result: Result<(), Failure>,
    },
    /// Outcome of a process-next-batch request.
    BatchFinished {
        run: RunId,
        result: Result<JobProgress, Failure>,
    },
    /// Outcome of the resume check's progress query.
    ProgressFetched { result: Result<JobProgress, Failure> },
    /// The delay before a resumed run's first batch has passed.
    ResumeDelayElapsed { run: RunId },
    /// The cancel request resolved. The outcome is informational only.
    CancelFinished { run: RunId, acknowledged: bool },
    /// UI/render tick.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}

/// Progress as reported by the job server. Values are not trusted to be
/// monotonic or consistent with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobProgress {
    pub processed: u64,
    pub total: u64,
    pub done: bool,
}

impl JobProgress {
    pub fn new(processed: u64, total: u64, done: bool) -> Self {
        Self {
            processed,
            total,
            done,
        }
    }

    /// Whether a progress snapshot describes a job worth reattaching to.
    ///
    /// `processed` far beyond `total` is treated as a leftover from an older
    /// run rather than live work.
    pub fn is_active(&self) -> bool {
        !self.done && self.total > 0 && self.processed < self.total.saturating_mul(10)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The request never produced a server answer.
    Transport(String),
    /// The server answered with `success: false`.
    Application(Option<String>),
}

impl Failure {
    /// Message to show the operator; falls back to `fallback` when the server
    /// gave no usable text.
    pub fn operator_message(&self, fallback: &str) -> String {
        match self {
            Failure::Application(Some(message)) if !message.trim().is_empty() => {
                message.clone()
            }
            Failure::Application(_) | Failure::Transport(_) => fallback.to_string(),
        }
    }
}
