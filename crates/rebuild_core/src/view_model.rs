use crate::Phase;

pub const STATUS_STARTING: &str = "Rebuilding embeddings...";
pub const STATUS_SUCCESS: &str = "Embeddings rebuilt successfully.";
pub const STATUS_FAILED: &str = "Embedding rebuild failed.";
pub const STATUS_CANCELLED: &str = "Embedding rebuild cancelled.";
pub const STATUS_CANCEL_UNCONFIRMED: &str =
    "Embedding rebuild cancelled locally; the server did not confirm the request.";
pub const STATUS_RESUME_ABANDONED: &str = "Resume check abandoned.";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressBarView {
    pub visible: bool,
    /// No numbers yet; show activity without a percentage.
    pub indeterminate: bool,
    pub percent: u8,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollerViewModel {
    pub phase: Phase,
    pub progress: ProgressBarView,
    pub start_enabled: bool,
    pub cancel_visible: bool,
    pub cancel_enabled: bool,
    pub batches_issued: u64,
    pub dirty: bool,
}
