use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use rebuild_logging::{rebuild_debug, rebuild_info, rebuild_warn};
use tokio_util::sync::CancellationToken;

use crate::drain::{drain_updated_chunks, ChannelProgressSink};
use crate::{AjaxJobServer, EngineEvent, JobServer, RunId, ServerSettings, StartAck};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    Start { run: RunId, force: bool },
    ProcessBatch { run: RunId },
    FetchProgress,
    Cancel { run: RunId },
    Wait { run: RunId, delay: Duration },
    DrainUpdated { source_id: Option<String> },
    StopDrain,
    FetchStatus,
    WatchInterrupts,
}

/// Runs job-server calls on a background tokio runtime and reports back
/// through `EngineEvent`s. Each command becomes an independent task, so
/// ordering between requests is the caller's responsibility.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
}

impl EngineHandle {
    pub fn new(settings: ServerSettings) -> Result<Self, crate::JobServerError> {
        let server = AjaxJobServer::new(settings)?;
        Ok(Self::with_server(Arc::new(server)))
    }

    pub fn with_server(server: Arc<dyn JobServer>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            let mut drain_stop = CancellationToken::new();
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::DrainUpdated { .. } => {
                        drain_stop = CancellationToken::new();
                    }
                    EngineCommand::StopDrain => {
                        drain_stop.cancel();
                        continue;
                    }
                    _ => {}
                }
                let server = server.clone();
                let event_tx = event_tx.clone();
                let stop = drain_stop.clone();
                runtime.spawn(async move {
                    handle_command(server.as_ref(), command, event_tx, stop).await;
                });
            }
        });

        Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        }
    }

    pub fn send(&self, command: EngineCommand) {
        rebuild_debug!("engine command {:?}", command);
        let _ = self.cmd_tx.send(command);
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.recv_timeout(timeout).ok()
    }
}

async fn handle_command(
    server: &dyn JobServer,
    command: EngineCommand,
    event_tx: mpsc::Sender<EngineEvent>,
    drain_stop: CancellationToken,
) {
    let event = match command {
        EngineCommand::Start { run, force } => {
            rebuild_info!("Starting embedding rebuild run={} force={}", run, force);
            let result = server.start_job(force).await;
            if let Ok(StartAck {
                message: Some(message),
            }) = &result
            {
                rebuild_info!("Server accepted run={}: {}", run, message);
            }
            EngineEvent::StartCompleted { run, result }
        }
        EngineCommand::ProcessBatch { run } => {
            let result = server.process_batch().await;
            match &result {
                Ok(progress) => rebuild_debug!(
                    "Batch run={} processed={} total={} done={}",
                    run,
                    progress.processed,
                    progress.total,
                    progress.done
                ),
                Err(err) => rebuild_warn!("Batch run={} failed: {}", run, err),
            }
            EngineEvent::BatchCompleted { run, result }
        }
        EngineCommand::FetchProgress => EngineEvent::ProgressFetched {
            result: server.progress().await,
        },
        EngineCommand::Cancel { run } => {
            let result = server.cancel_job().await;
            if let Err(err) = &result {
                rebuild_warn!("Cancel run={} failed: {}", run, err);
            }
            EngineEvent::CancelCompleted { run, result }
        }
        EngineCommand::Wait { run, delay } => {
            tokio::time::sleep(delay).await;
            EngineEvent::ResumeDelayElapsed { run }
        }
        EngineCommand::DrainUpdated { source_id } => {
            let sink = ChannelProgressSink::new(event_tx.clone());
            let result =
                drain_updated_chunks(server, source_id.as_deref(), &sink, &drain_stop).await;
            EngineEvent::DrainCompleted { result }
        }
        EngineCommand::FetchStatus => EngineEvent::StatusFetched {
            result: server.knowledge_status().await,
        },
        EngineCommand::WatchInterrupts => loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            if event_tx.send(EngineEvent::Interrupted).is_err() {
                return;
            }
        },
        EngineCommand::StopDrain => return,
    };
    let _ = event_tx.send(event);
}
