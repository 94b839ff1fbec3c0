//! Async driver that runs a session against a real clock.
//!
//! Commands and ticks are consumed by one task, so every state mutation is
//! serialized without locks. Commands win ties with ticks.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::clock::Clock;
use crate::error::SessionError;
use crate::result::ExamResult;
use crate::session::{SessionCommand, SessionController, SessionEvent};
use crate::traits::ResultSink;

/// Receives session events as they happen.
pub trait SessionObserver: Send + Sync {
    fn on_event(&self, event: &SessionEvent);
    fn on_rejected(&self, command: &SessionCommand, error: &SessionError);
}

/// No-op observer.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_event(&self, _: &SessionEvent) {}
    fn on_rejected(&self, _: &SessionCommand, _: &SessionError) {}
}

/// How a driven session ended.
#[derive(Debug, Clone)]
pub enum SessionOutcome {
    Submitted(Arc<ExamResult>),
    Abandoned,
}

enum Step {
    Command(SessionCommand),
    Tick,
    Abandon,
    ClockStopped,
}

/// Run `session` until it is submitted, expires, or is abandoned.
///
/// Closing the command channel counts as abandoning the session. A submitted
/// result is handed to `sink` once; sink failures are logged, not retried.
pub async fn drive_session(
    mut session: SessionController,
    clock: &Clock,
    mut commands: mpsc::Receiver<SessionCommand>,
    observer: &dyn SessionObserver,
    sink: &dyn ResultSink,
) -> Result<SessionOutcome> {
    let (handle, mut ticks) = clock.arm();
    session.attach_clock(handle)?;

    loop {
        let step = tokio::select! {
            biased;
            command = commands.recv() => match command {
                None | Some(SessionCommand::Abandon) => Step::Abandon,
                Some(command) => Step::Command(command),
            },
            tick = ticks.next() => match tick {
                Some(_) => Step::Tick,
                None => Step::ClockStopped,
            },
        };

        let events = match step {
            Step::Abandon => {
                session.abandon();
                return Ok(SessionOutcome::Abandoned);
            }
            Step::ClockStopped => {
                anyhow::bail!("clock stopped before session {} finished", session.id());
            }
            Step::Tick => session.tick()?,
            Step::Command(command) => match session.apply(command.clone()) {
                Ok(events) => events,
                Err(e) => {
                    if e.is_contract_violation() {
                        tracing::error!(session_id = %session.id(), ?command, "command on finished session: {e}");
                    } else {
                        tracing::warn!(session_id = %session.id(), ?command, "command rejected: {e}");
                    }
                    observer.on_rejected(&command, &e);
                    Vec::new()
                }
            },
        };

        for event in &events {
            observer.on_event(event);
        }

        if let Some(result) = session.result().cloned() {
            if let Err(e) = sink.persist(&result).await {
                tracing::warn!(
                    session_id = %result.session_id,
                    sink = sink.name(),
                    "failed to persist result: {e:#}"
                );
            }
            return Ok(SessionOutcome::Submitted(result));
        }
    }
}
