use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::Parser;
use log::LevelFilter;
use rebuild_core::{update, JobProgress, Msg, Phase, PollerSettings, PollerState};
use rebuild_engine::{EngineCommand, EngineEvent, EngineHandle, ServerSettings};
use rebuild_logging::{rebuild_info, rebuild_warn, redact};

use super::cli::{Cli, Command};
use super::config::load_config;
use super::effects::EffectRunner;
use super::logging;
use super::ui::render::{progress_summary, status_lines, TerminalRenderer};

/// Exit status after the operator cancelled with Ctrl-C.
const EXIT_CANCELLED: u8 = 130;

pub fn run_app() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let resolved = config.resolve(cli.ajax_url.clone(), cli.nonce.clone())?;

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    logging::initialize(resolved.log_destination, level, &resolved.log_file);
    rebuild_info!(
        "rebuild {:?} ajax_url={} nonce={}",
        cli.command,
        resolved.server.ajax_url,
        redact(&resolved.server.nonce)
    );

    let engine = EngineHandle::new(resolved.server.clone())
        .context("could not set up the HTTP client")?;
    let mut renderer = TerminalRenderer::new(io::stdout());

    match cli.command {
        command @ (Command::Start | Command::Resume) => {
            engine.send(EngineCommand::WatchInterrupts);
            let entry = if command == Command::Start {
                Msg::StartClicked
            } else {
                Msg::InterfaceLoaded
            };
            let outcome = run_session(engine, resolved.poller, entry, &mut renderer)?;
            if outcome == SessionOutcome::NothingToResume {
                renderer.line("No rebuild in progress.")?;
            }
            Ok(outcome.exit_code())
        }
        Command::Cancel => cancel_once(&engine, &resolved.server, &mut renderer),
        Command::Progress => progress_once(&engine, &resolved.server, &mut renderer),
        Command::Status => status_once(&engine, &resolved.server, &mut renderer),
        Command::RebuildUpdated { entry } => {
            engine.send(EngineCommand::WatchInterrupts);
            drain_updated(&engine, entry, &mut renderer)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Finished,
    Failed,
    Cancelled,
    NothingToResume,
}

impl SessionOutcome {
    fn exit_code(self) -> ExitCode {
        match self {
            SessionOutcome::Finished | SessionOutcome::NothingToResume => ExitCode::SUCCESS,
            SessionOutcome::Failed => ExitCode::FAILURE,
            SessionOutcome::Cancelled => ExitCode::from(EXIT_CANCELLED),
        }
    }
}

/// Drives one poller session until no run is attached any more.
pub fn run_session<W: Write>(
    engine: EngineHandle,
    settings: PollerSettings,
    entry: Msg,
    renderer: &mut TerminalRenderer<W>,
) -> io::Result<SessionOutcome> {
    let (msg_tx, msg_rx) = mpsc::channel();
    let runner = EffectRunner::new(engine, msg_tx);
    drive(
        &runner,
        &msg_rx,
        PollerState::with_settings(settings),
        entry,
        renderer,
    )
}

fn drive<W: Write>(
    runner: &EffectRunner,
    msg_rx: &mpsc::Receiver<Msg>,
    state: PollerState,
    entry: Msg,
    renderer: &mut TerminalRenderer<W>,
) -> io::Result<SessionOutcome> {
    let mut state = state;
    let mut cancelled = false;
    let mut next = Some(entry);

    while let Some(msg) = next.take() {
        let cancel_msg = matches!(msg, Msg::CancelClicked | Msg::CancelFinished { .. });
        let (updated, effects) = update(state, msg);
        state = updated;
        if cancel_msg && state.phase() == Phase::Idle && !state.is_busy() {
            cancelled = true;
        }

        for (level, message) in runner.enqueue(effects) {
            renderer.notice(level, &message)?;
        }
        if state.consume_dirty() {
            renderer.render(&state.view())?;
        }

        if state.is_busy() {
            next = msg_rx.recv().ok();
        }
    }

    let outcome = match state.phase() {
        Phase::Finished => SessionOutcome::Finished,
        Phase::Failed => SessionOutcome::Failed,
        _ if cancelled => SessionOutcome::Cancelled,
        _ => SessionOutcome::NothingToResume,
    };
    rebuild_info!("Session ended: {:?}", outcome);
    Ok(outcome)
}

/// How long a one-shot command waits for its single answer.
fn answer_deadline(server: &ServerSettings) -> Duration {
    server.connect_timeout + server.request_timeout + Duration::from_secs(5)
}

fn wait_for<T>(
    engine: &EngineHandle,
    deadline: Duration,
    mut pick: impl FnMut(EngineEvent) -> Option<T>,
) -> Option<T> {
    let started = Instant::now();
    while let Some(left) = deadline.checked_sub(started.elapsed()) {
        if let Some(found) = engine.recv_timeout(left).and_then(&mut pick) {
            return Some(found);
        }
    }
    None
}

fn cancel_once<W: Write>(
    engine: &EngineHandle,
    server: &ServerSettings,
    renderer: &mut TerminalRenderer<W>,
) -> anyhow::Result<ExitCode> {
    engine.send(EngineCommand::Cancel { run: 0 });
    let result = wait_for(engine, answer_deadline(server), |event| match event {
        EngineEvent::CancelCompleted { result, .. } => Some(result),
        _ => None,
    });
    match result {
        Some(Ok(())) => {
            renderer.line("Cancel requested.")?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Err(err)) => {
            rebuild_warn!("Cancel failed: {}", err);
            renderer.line(&format!("Cancel request failed: {err}"))?;
            Ok(ExitCode::FAILURE)
        }
        None => bail!("no answer to the cancel request"),
    }
}

fn progress_once<W: Write>(
    engine: &EngineHandle,
    server: &ServerSettings,
    renderer: &mut TerminalRenderer<W>,
) -> anyhow::Result<ExitCode> {
    engine.send(EngineCommand::FetchProgress);
    let result = wait_for(engine, answer_deadline(server), |event| match event {
        EngineEvent::ProgressFetched { result } => Some(result),
        _ => None,
    })
    .context("no answer to the progress request")?;

    let progress = result.context("progress request failed")?;
    let active = JobProgress::new(progress.processed, progress.total, progress.done).is_active();
    renderer.line(&progress_summary(progress.processed, progress.total, active))?;
    Ok(ExitCode::SUCCESS)
}

fn status_once<W: Write>(
    engine: &EngineHandle,
    server: &ServerSettings,
    renderer: &mut TerminalRenderer<W>,
) -> anyhow::Result<ExitCode> {
    engine.send(EngineCommand::FetchStatus);
    let result = wait_for(engine, answer_deadline(server), |event| match event {
        EngineEvent::StatusFetched { result } => Some(result),
        _ => None,
    })
    .context("no answer to the status request")?;

    let status = result.context("status request failed")?;
    for line in status_lines(&status) {
        renderer.line(&line)?;
    }
    Ok(ExitCode::SUCCESS)
}

fn drain_updated<W: Write>(
    engine: &EngineHandle,
    entry: Option<String>,
    renderer: &mut TerminalRenderer<W>,
) -> anyhow::Result<ExitCode> {
    engine.send(EngineCommand::DrainUpdated { source_id: entry });
    loop {
        // Each round is bounded by the request timeout, so this cannot hang.
        let Some(event) = engine.recv_timeout(Duration::from_secs(1)) else {
            continue;
        };
        match event {
            EngineEvent::UpdatedChunksProgress(round) => {
                if round.processed > 0 {
                    renderer.line(&format!(
                        "Rebuilt {} chunk(s), {} remaining.",
                        round.processed, round.remaining
                    ))?;
                }
            }
            EngineEvent::Interrupted => engine.send(EngineCommand::StopDrain),
            EngineEvent::DrainCompleted { result } => {
                return match result {
                    Ok(summary) => {
                        renderer.line(&format!(
                            "Updated chunks rebuilt: {} in {} round(s).",
                            summary.processed, summary.rounds
                        ))?;
                        Ok(ExitCode::SUCCESS)
                    }
                    Err(err) => {
                        renderer.line(&format!("Rebuild of updated chunks stopped: {err}"))?;
                        Ok(ExitCode::FAILURE)
                    }
                };
            }
            _ => {}
        }
    }
}
