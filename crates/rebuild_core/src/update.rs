use crate::{
    Effect, Failure, JobProgress, Msg, NoticeLevel, Phase, PollerState, RunId, RunOrigin,
    STATUS_CANCELLED, STATUS_CANCEL_UNCONFIRMED, STATUS_FAILED, STATUS_RESUME_ABANDONED,
    STATUS_SUCCESS,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: PollerState, msg: Msg) -> (PollerState, Vec<Effect>) {
    let effects = match msg {
        Msg::StartClicked => {
            if state.phase().accepts_start() {
                let run = state.begin_run(RunOrigin::Started);
                state.enter_starting();
                vec![Effect::StartJob { run, force: true }]
            } else {
                Vec::new()
            }
        }
        Msg::StartFinished { run, result } => {
            // A cancelled or superseded start must not enter the loop.
            if state.phase() != Phase::Starting || state.job_for(run).is_none() {
                return (state, Vec::new());
            }
            match result {
                Ok(()) => {
                    state.enter_running();
                    next_batch(&mut state, run)
                }
                Err(failure) => fail_run(&mut state, &failure),
            }
        }
        Msg::BatchFinished { run, result } => {
            let was_in_flight = state
                .job_for(run)
                .is_some_and(|job| std::mem::replace(&mut job.batch_in_flight, false));
            // Stale answers and, while cancelling, the in-flight answer are dropped.
            if !was_in_flight || state.phase() == Phase::Cancelling {
                return (state, Vec::new());
            }
            match result {
                Ok(progress) if progress.done => {
                    state.finish(progress);
                    vec![Effect::Notify {
                        level: NoticeLevel::Success,
                        message: STATUS_SUCCESS.to_string(),
                    }]
                }
                Ok(progress) => {
                    state.apply_progress(progress);
                    next_batch(&mut state, run)
                }
                Err(failure) => fail_run(&mut state, &failure),
            }
        }
        Msg::CancelClicked => {
            let run = state.job().map(|job| job.run);
            match (state.phase(), run) {
                (Phase::Starting | Phase::Running, Some(run)) => {
                    // A resume check still out must not reattach after this.
                    state.set_resume_check_pending(false);
                    state.enter_cancelling();
                    vec![Effect::CancelJob { run }]
                }
                // Asked again while the server sits on the cancel request.
                (Phase::Cancelling, Some(_)) => {
                    state.reset_to_idle();
                    vec![Effect::Notify {
                        level: NoticeLevel::Info,
                        message: STATUS_CANCEL_UNCONFIRMED.to_string(),
                    }]
                }
                (_, None) if state.resume_check_pending() => {
                    state.set_resume_check_pending(false);
                    vec![Effect::Notify {
                        level: NoticeLevel::Info,
                        message: STATUS_RESUME_ABANDONED.to_string(),
                    }]
                }
                _ => Vec::new(),
            }
        }
        Msg::CancelFinished { run, acknowledged } => {
            if state.phase() == Phase::Cancelling && state.job_for(run).is_some() {
                state.reset_to_idle();
                let message = if acknowledged {
                    STATUS_CANCELLED
                } else {
                    STATUS_CANCEL_UNCONFIRMED
                };
                vec![Effect::Notify {
                    level: NoticeLevel::Info,
                    message: message.to_string(),
                }]
            } else {
                Vec::new()
            }
        }
        Msg::InterfaceLoaded => {
            if state.phase().accepts_start() && !state.is_busy() {
                state.set_resume_check_pending(true);
                vec![Effect::FetchProgress]
            } else {
                Vec::new()
            }
        }
        Msg::ProgressFetched { result } => {
            if !state.resume_check_pending() {
                return (state, Vec::new());
            }
            state.set_resume_check_pending(false);
            match result {
                // The operator may have started a run while the check was out.
                Ok(progress) if progress.is_active() && state.phase().accepts_start() => {
                    resume_run(&mut state, progress)
                }
                Ok(_) | Err(_) => Vec::new(),
            }
        }
        Msg::ResumeDelayElapsed { run } => {
            if state.phase() == Phase::Running {
                next_batch(&mut state, run)
            } else {
                Vec::new()
            }
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn next_batch(state: &mut PollerState, run: RunId) -> Vec<Effect> {
    if state.issue_batch(run) {
        vec![Effect::ProcessBatch { run }]
    } else {
        Vec::new()
    }
}

fn fail_run(state: &mut PollerState, failure: &Failure) -> Vec<Effect> {
    let message = failure.operator_message(STATUS_FAILED);
    state.fail(&message);
    vec![Effect::Notify {
        level: NoticeLevel::Error,
        message,
    }]
}

fn resume_run(state: &mut PollerState, progress: JobProgress) -> Vec<Effect> {
    let run = state.begin_run(RunOrigin::Resumed);
    state.enter_running();
    state.apply_progress(progress);
    let delay = state.settings().resume_delay;
    if delay.is_zero() {
        next_batch(state, run)
    } else {
        vec![Effect::WaitBeforeResume { run, delay }]
    }
}
