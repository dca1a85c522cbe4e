//! Rebuild core: pure poller state machine and view-model helpers.
mod effect;
mod msg;
mod percent;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, NoticeLevel};
pub use msg::{Failure, JobProgress, Msg};
pub use percent::{denominator, percentage};
pub use state::{ClientJobState, Phase, PollerSettings, PollerState, RunId, RunOrigin};
pub use update::update;
pub use view_model::{
    ProgressBarView, PollerViewModel, STATUS_CANCELLED, STATUS_CANCEL_UNCONFIRMED, STATUS_FAILED,
    STATUS_RESUME_ABANDONED, STATUS_STARTING, STATUS_SUCCESS,
};
