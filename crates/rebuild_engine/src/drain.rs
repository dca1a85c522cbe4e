use std::sync::mpsc;

use rebuild_logging::rebuild_info;
use tokio_util::sync::CancellationToken;

use crate::{DrainSummary, EngineEvent, FailureKind, JobServer, JobServerError};

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Calls the updated-chunk rebuild until the server reports nothing remaining.
///
/// Rounds are strictly sequential. The first failure ends the drain; `stop`
/// is checked between rounds and never interrupts a request.
pub async fn drain_updated_chunks(
    server: &dyn JobServer,
    source_id: Option<&str>,
    sink: &dyn ProgressSink,
    stop: &CancellationToken,
) -> Result<DrainSummary, JobServerError> {
    let mut summary = DrainSummary::default();
    loop {
        if stop.is_cancelled() {
            return Err(JobServerError::new(
                FailureKind::Cancelled,
                format!("stopped after {} round(s)", summary.rounds),
            ));
        }
        let round = server.rebuild_updated_chunks(source_id).await?;
        summary.rounds += 1;
        summary.processed += round.processed;
        sink.emit(EngineEvent::UpdatedChunksProgress(round));
        if round.remaining == 0 {
            rebuild_info!(
                "Updated-chunk drain finished rounds={} processed={}",
                summary.rounds,
                summary.processed
            );
            return Ok(summary);
        }
    }
}
