use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use rebuild_core::{Effect, Failure, JobProgress, Msg, NoticeLevel};
use rebuild_engine::{EngineCommand, EngineEvent, EngineHandle, JobServerError};
use rebuild_logging::{rebuild_debug, rebuild_info, rebuild_warn};

/// Interval at which the forwarding thread emits `Msg::Tick` when idle.
const TICK_INTERVAL: Duration = Duration::from_millis(75);

/// Turns core effects into engine commands and engine events into messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, msg_tx: mpsc::Sender<Msg>) -> Self {
        let runner = Self { engine };
        runner.spawn_event_loop(msg_tx);
        runner
    }

    /// Dispatches engine-bound effects and hands notifications back to the
    /// caller for display.
    pub fn enqueue(&self, effects: Vec<Effect>) -> Vec<(NoticeLevel, String)> {
        let mut notices = Vec::new();
        for effect in effects {
            match effect {
                Effect::StartJob { run, force } => {
                    self.engine.send(EngineCommand::Start { run, force });
                }
                Effect::ProcessBatch { run } => {
                    self.engine.send(EngineCommand::ProcessBatch { run });
                }
                Effect::FetchProgress => {
                    self.engine.send(EngineCommand::FetchProgress);
                }
                Effect::CancelJob { run } => {
                    rebuild_info!("Cancel requested for run={}", run);
                    self.engine.send(EngineCommand::Cancel { run });
                }
                Effect::WaitBeforeResume { run, delay } => {
                    rebuild_info!("Resuming run={} in {:?}", run, delay);
                    self.engine.send(EngineCommand::Wait { run, delay });
                }
                Effect::Notify { level, message } => notices.push((level, message)),
            }
        }
        notices
    }

    fn spawn_event_loop(&self, msg_tx: mpsc::Sender<Msg>) {
        let engine = self.engine.clone();
        thread::spawn(move || loop {
            let msg = match engine.recv_timeout(TICK_INTERVAL) {
                Some(event) => match map_event(event) {
                    Some(msg) => msg,
                    None => continue,
                },
                None => Msg::Tick,
            };
            // The session loop has ended once the receiver is gone.
            if msg_tx.send(msg).is_err() {
                break;
            }
        });
    }
}

fn map_event(event: EngineEvent) -> Option<Msg> {
    let msg = match event {
        EngineEvent::StartCompleted { run, result } => Msg::StartFinished {
            run,
            result: result.map(|_| ()).map_err(map_failure),
        },
        EngineEvent::BatchCompleted { run, result } => Msg::BatchFinished {
            run,
            result: result.map(map_progress).map_err(map_failure),
        },
        EngineEvent::ProgressFetched { result } => {
            if let Err(err) = &result {
                rebuild_warn!("Resume check failed: {}", err);
            }
            Msg::ProgressFetched {
                result: result.map(map_progress).map_err(map_failure),
            }
        }
        EngineEvent::CancelCompleted { run, result } => Msg::CancelFinished {
            run,
            acknowledged: result.is_ok(),
        },
        EngineEvent::ResumeDelayElapsed { run } => Msg::ResumeDelayElapsed { run },
        EngineEvent::Interrupted => Msg::CancelClicked,
        other => {
            rebuild_debug!("Ignoring engine event outside a rebuild session: {:?}", other);
            return None;
        }
    };
    Some(msg)
}

fn map_progress(progress: rebuild_engine::JobProgress) -> JobProgress {
    JobProgress::new(progress.processed, progress.total, progress.done)
}

fn map_failure(err: JobServerError) -> Failure {
    if err.is_application() {
        Failure::Application(err.message)
    } else {
        Failure::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rebuild_engine::FailureKind;

    #[test]
    fn application_errors_keep_server_text() {
        let failure = map_failure(JobServerError {
            kind: FailureKind::Application,
            message: Some("Invalid state".to_string()),
        });
        assert_eq!(failure, Failure::Application(Some("Invalid state".to_string())));
    }

    #[test]
    fn transport_errors_do_not_leak_as_server_text() {
        let failure = map_failure(JobServerError {
            kind: FailureKind::Timeout,
            message: Some("operation timed out".to_string()),
        });
        assert!(matches!(failure, Failure::Transport(_)));
        assert_eq!(
            failure.operator_message("fallback"),
            "fallback".to_string()
        );
    }

    #[test]
    fn failed_cancel_still_finishes() {
        let msg = map_event(EngineEvent::CancelCompleted {
            run: 4,
            result: Err(JobServerError {
                kind: FailureKind::Transport,
                message: None,
            }),
        });
        assert_eq!(
            msg,
            Some(Msg::CancelFinished {
                run: 4,
                acknowledged: false
            })
        );
    }

    #[test]
    fn interrupt_becomes_cancel_click() {
        assert_eq!(map_event(EngineEvent::Interrupted), Some(Msg::CancelClicked));
        assert_eq!(
            map_event(EngineEvent::StatusFetched {
                result: Ok(Default::default())
            }),
            None
        );
    }
}
