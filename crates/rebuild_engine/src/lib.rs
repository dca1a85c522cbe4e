//! Rebuild engine: job-server IO and effect execution.
mod drain;
mod engine;
mod server;
mod types;
mod wire;

pub use drain::{drain_updated_chunks, ChannelProgressSink, ProgressSink};
pub use engine::{EngineCommand, EngineHandle};
pub use server::{AjaxJobServer, JobServer, ServerSettings};
pub use types::{
    DrainSummary, EngineEvent, FailureKind, JobProgress, JobServerError, KnowledgeSource,
    KnowledgeEntry, KnowledgeStatus, RunId, StartAck, UpdatedChunks,
};
pub use wire::actions;
