use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rebuild_engine::{
    drain_updated_chunks, DrainSummary, EngineCommand, EngineEvent, EngineHandle, FailureKind,
    JobProgress, JobServer, JobServerError, KnowledgeStatus, ProgressSink, StartAck,
    UpdatedChunks,
};
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

/// Answers from a script and records which calls were made.
#[derive(Default)]
struct ScriptedServer {
    batches: Mutex<VecDeque<Result<JobProgress, JobServerError>>>,
    rounds: Mutex<VecDeque<UpdatedChunks>>,
    calls: Mutex<Vec<&'static str>>,
}

impl ScriptedServer {
    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl JobServer for ScriptedServer {
    async fn start_job(&self, _force: bool) -> Result<StartAck, JobServerError> {
        self.record("start");
        Ok(StartAck::default())
    }

    async fn process_batch(&self) -> Result<JobProgress, JobServerError> {
        self.record("batch");
        self.batches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(JobProgress { processed: 0, total: 0, done: true }))
    }

    async fn progress(&self) -> Result<JobProgress, JobServerError> {
        self.record("progress");
        Ok(JobProgress { processed: 30, total: 80, done: false })
    }

    async fn cancel_job(&self) -> Result<(), JobServerError> {
        self.record("cancel");
        Err(JobServerError {
            kind: FailureKind::HttpStatus(500),
            message: None,
        })
    }

    async fn rebuild_updated_chunks(
        &self,
        _source_id: Option<&str>,
    ) -> Result<UpdatedChunks, JobServerError> {
        self.record("updated");
        Ok(self.rounds.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn knowledge_status(&self) -> Result<KnowledgeStatus, JobServerError> {
        self.record("status");
        Ok(KnowledgeStatus::default())
    }
}

#[derive(Default)]
struct VecSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl ProgressSink for VecSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[test]
fn batch_command_reports_tagged_result() {
    let server = Arc::new(ScriptedServer::default());
    server
        .batches
        .lock()
        .unwrap()
        .push_back(Ok(JobProgress { processed: 10, total: 100, done: false }));
    let engine = EngineHandle::with_server(server.clone());

    engine.send(EngineCommand::ProcessBatch { run: 3 });
    let event = engine.recv_timeout(WAIT).expect("event");
    assert_eq!(
        event,
        EngineEvent::BatchCompleted {
            run: 3,
            result: Ok(JobProgress { processed: 10, total: 100, done: false }),
        }
    );
    assert_eq!(server.calls(), vec!["batch"]);
}

#[test]
fn cancel_failure_is_still_reported_as_completion() {
    let server = Arc::new(ScriptedServer::default());
    let engine = EngineHandle::with_server(server);

    engine.send(EngineCommand::Cancel { run: 1 });
    match engine.recv_timeout(WAIT).expect("event") {
        EngineEvent::CancelCompleted { run, result } => {
            assert_eq!(run, 1);
            assert_eq!(result.unwrap_err().kind, FailureKind::HttpStatus(500));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn wait_command_elapses_for_its_run() {
    let engine = EngineHandle::with_server(Arc::new(ScriptedServer::default()));
    engine.send(EngineCommand::Wait {
        run: 9,
        delay: Duration::from_millis(20),
    });
    assert_eq!(
        engine.recv_timeout(WAIT),
        Some(EngineEvent::ResumeDelayElapsed { run: 9 })
    );
    assert_eq!(engine.recv_timeout(Duration::from_millis(50)), None);
}

#[test]
fn drain_command_streams_rounds_then_completes() {
    let server = Arc::new(ScriptedServer::default());
    server.rounds.lock().unwrap().extend([
        UpdatedChunks { processed: 5, remaining: 3 },
        UpdatedChunks { processed: 3, remaining: 0 },
    ]);
    let engine = EngineHandle::with_server(server.clone());
    engine.send(EngineCommand::DrainUpdated { source_id: None });

    let mut events = Vec::new();
    while let Some(event) = engine.recv_timeout(WAIT) {
        let finished = matches!(event, EngineEvent::DrainCompleted { .. });
        events.push(event);
        if finished {
            break;
        }
    }
    assert_eq!(
        events,
        vec![
            EngineEvent::UpdatedChunksProgress(UpdatedChunks { processed: 5, remaining: 3 }),
            EngineEvent::UpdatedChunksProgress(UpdatedChunks { processed: 3, remaining: 0 }),
            EngineEvent::DrainCompleted {
                result: Ok(DrainSummary { rounds: 2, processed: 8 }),
            },
        ]
    );
    assert_eq!(server.calls(), vec!["updated", "updated"]);
}

#[tokio::test]
async fn drain_stops_on_first_failure() {
    struct FailingServer(ScriptedServer);

    #[async_trait::async_trait]
    impl JobServer for FailingServer {
        async fn start_job(&self, force: bool) -> Result<StartAck, JobServerError> {
            self.0.start_job(force).await
        }
        async fn process_batch(&self) -> Result<JobProgress, JobServerError> {
            self.0.process_batch().await
        }
        async fn progress(&self) -> Result<JobProgress, JobServerError> {
            self.0.progress().await
        }
        async fn cancel_job(&self) -> Result<(), JobServerError> {
            self.0.cancel_job().await
        }
        async fn rebuild_updated_chunks(
            &self,
            _source_id: Option<&str>,
        ) -> Result<UpdatedChunks, JobServerError> {
            self.0.record("updated");
            Err(JobServerError {
                kind: FailureKind::Application,
                message: Some("locked".to_string()),
            })
        }
        async fn knowledge_status(&self) -> Result<KnowledgeStatus, JobServerError> {
            self.0.knowledge_status().await
        }
    }

    let server = FailingServer(ScriptedServer::default());
    let sink = VecSink::default();
    let err = drain_updated_chunks(&server, Some("12"), &sink, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.message.as_deref(), Some("locked"));
    assert_eq!(server.0.calls(), vec!["updated"]);
    assert!(sink.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn stopped_drain_issues_no_further_rounds() {
    let server = ScriptedServer::default();
    server.rounds.lock().unwrap().extend([UpdatedChunks { processed: 1, remaining: 9 }]);
    let sink = VecSink::default();
    let stop = CancellationToken::new();
    stop.cancel();

    let err = drain_updated_chunks(&server, None, &sink, &stop)
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Cancelled);
    assert!(server.calls().is_empty());
}
