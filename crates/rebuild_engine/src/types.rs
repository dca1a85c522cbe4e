use std::fmt;

use thiserror::Error;

pub type RunId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobProgress {
    pub processed: u64,
    pub total: u64,
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StartAck {
    pub message: Option<String>,
}

/// One round of the updated-chunk rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdatedChunks {
    pub processed: u64,
    pub remaining: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainSummary {
    pub rounds: u64,
    pub processed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeSource {
    pub label: String,
    pub count: u64,
}

/// A recently indexed knowledge entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KnowledgeEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub source: Option<String>,
    pub category: Option<String>,
    pub updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KnowledgeStatus {
    pub snapshot_id: Option<String>,
    pub generated_at: Option<String>,
    pub chunk_count: u64,
    pub entry_count: u64,
    pub files_count: u64,
    pub sources: Vec<KnowledgeSource>,
    pub latest_entries: Vec<KnowledgeEntry>,
}

impl KnowledgeStatus {
    /// No index has been built yet.
    pub fn is_empty(&self) -> bool {
        self.snapshot_id.is_none()
            && self.chunk_count == 0
            && self.entry_count == 0
            && self.files_count == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    StartCompleted {
        run: RunId,
        result: Result<StartAck, JobServerError>,
    },
    BatchCompleted {
        run: RunId,
        result: Result<JobProgress, JobServerError>,
    },
    ProgressFetched {
        result: Result<JobProgress, JobServerError>,
    },
    CancelCompleted {
        run: RunId,
        result: Result<(), JobServerError>,
    },
    ResumeDelayElapsed {
        run: RunId,
    },
    UpdatedChunksProgress(UpdatedChunks),
    DrainCompleted {
        result: Result<DrainSummary, JobServerError>,
    },
    StatusFetched {
        result: Result<KnowledgeStatus, JobServerError>,
    },
    /// The process received Ctrl-C.
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {}", .message.as_deref().unwrap_or("no details"))]
pub struct JobServerError {
    pub kind: FailureKind,
    /// Server-supplied text for application failures, transport detail otherwise.
    pub message: Option<String>,
}

impl JobServerError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Some(message.into()),
        }
    }

    pub(crate) fn application(message: Option<String>) -> Self {
        Self {
            kind: FailureKind::Application,
            message,
        }
    }

    /// True when the server answered and refused; false when no answer arrived.
    pub fn is_application(&self) -> bool {
        self.kind == FailureKind::Application
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Timeout,
    HttpStatus(u16),
    Decode,
    Application,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Transport => write!(f, "network error"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Decode => write!(f, "malformed response"),
            FailureKind::Application => write!(f, "rejected by server"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}
