//! Session actor
//!
//! A single tokio task owns the [`WorkoutSession`]. The tick, the metronome
//! scheduler and user commands are multiplexed with `select!`, so they
//! interleave but never run concurrently. Front ends talk to the task through
//! a cloneable [`SessionHandle`] and observe it through a `watch` channel of
//! display snapshots.
//!
//! Confirmation gates may block on user input, so they run on the blocking
//! pool. The run keeps ticking while a prompt is open and the stop is applied
//! when the answer arrives.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use wodtimer_types::{Settings, TimerConfig};

use crate::collaborators::{AutoConfirm, ConfirmationGate};
use crate::display::DisplaySnapshot;
use crate::engine::{BACK_PROMPT, EngineError, STOP_PROMPT, TICK_INTERVAL};
use crate::metronome::LOOKAHEAD;
use crate::session::{Collaborators, WorkoutSession};

pub type BoxedGate = Box<dyn ConfirmationGate + Send>;

/// Commands sent from a handle to the session task
pub enum SessionCommand {
    Start {
        config: TimerConfig,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    TogglePause,
    Skip,
    Lap,
    Round,
    Advance,
    Finish,
    Stop {
        gate: BoxedGate,
        reply: oneshot::Sender<bool>,
    },
    BackToConfig {
        gate: BoxedGate,
        reply: oneshot::Sender<Option<TimerConfig>>,
    },
    Restart {
        reply: oneshot::Sender<Result<bool, EngineError>>,
    },
    UpdateSettings(Settings),
    Snapshot {
        reply: oneshot::Sender<Option<DisplaySnapshot>>,
    },
    Shutdown,
}

/// A teardown waiting on its confirmation
enum Teardown {
    Stop(oneshot::Sender<bool>),
    Back(oneshot::Sender<Option<TimerConfig>>),
}

struct Answer {
    teardown: Teardown,
    confirmed: bool,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("workout session has shut down")]
    Closed,
}

/// Cloneable handle to the session task
#[derive(Clone)]
pub struct SessionHandle {
    cmd_tx: mpsc::Sender<SessionCommand>,
    snapshot_rx: watch::Receiver<Option<DisplaySnapshot>>,
}

impl SessionHandle {
    async fn send(&self, cmd: SessionCommand) -> Result<(), SessionError> {
        self.cmd_tx.send(cmd).await.map_err(|_| SessionError::Closed)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(build(reply)).await?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    pub async fn start(&self, config: TimerConfig) -> Result<Result<(), EngineError>, SessionError> {
        self.request(|reply| SessionCommand::Start { config, reply })
            .await
    }

    pub async fn toggle_pause(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::TogglePause).await
    }

    pub async fn skip(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Skip).await
    }

    pub async fn lap(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Lap).await
    }

    pub async fn round(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Round).await
    }

    pub async fn advance(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Advance).await
    }

    pub async fn finish(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Finish).await
    }

    pub async fn stop(&self, gate: BoxedGate) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::Stop { gate, reply })
            .await
    }

    pub async fn back_to_config(&self, gate: BoxedGate) -> Result<Option<TimerConfig>, SessionError> {
        self.request(|reply| SessionCommand::BackToConfig { gate, reply })
            .await
    }

    pub async fn restart(&self) -> Result<Result<bool, EngineError>, SessionError> {
        self.request(|reply| SessionCommand::Restart { reply }).await
    }

    pub async fn update_settings(&self, settings: Settings) -> Result<(), SessionError> {
        self.send(SessionCommand::UpdateSettings(settings)).await
    }

    pub async fn snapshot(&self) -> Result<Option<DisplaySnapshot>, SessionError> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Shutdown).await
    }

    /// Receiver updated whenever the visible state changes
    pub fn subscribe(&self) -> watch::Receiver<Option<DisplaySnapshot>> {
        self.snapshot_rx.clone()
    }
}

/// Spawn the session task. Must be called inside a tokio runtime.
pub fn spawn_session(
    collaborators: Collaborators,
    settings: Settings,
) -> (SessionHandle, JoinHandle<()>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (snapshot_tx, snapshot_rx) = watch::channel(None);

    let session = WorkoutSession::new(collaborators, settings);
    let task = tokio::spawn(run(session, cmd_rx, snapshot_tx));

    (
        SessionHandle {
            cmd_tx,
            snapshot_rx,
        },
        task,
    )
}

fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

async fn run(
    mut session: WorkoutSession,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    snapshot_tx: watch::Sender<Option<DisplaySnapshot>>,
) {
    let mut tick = tokio::time::interval(TICK_INTERVAL);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut metronome = tokio::time::interval(LOOKAHEAD);
    metronome.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let (answer_tx, mut answer_rx) = mpsc::unbounded_channel::<Answer>();

    tracing::debug!("Session task started");

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SessionCommand::Shutdown) | None => break,
                    Some(cmd) => handle_command(&mut session, cmd, &snapshot_tx, &answer_tx),
                }
            }
            Some(answer) = answer_rx.recv() => {
                finish_teardown(&mut session, answer, &snapshot_tx);
            }
            _ = tick.tick() => {
                session.tick(now());
                publish(&mut session, &snapshot_tx);
            }
            _ = metronome.tick() => {
                session.metronome_tick();
            }
        }
    }

    tracing::debug!("Session task stopped");
}

fn publish(session: &mut WorkoutSession, snapshot_tx: &watch::Sender<Option<DisplaySnapshot>>) {
    if session.take_redraw() {
        snapshot_tx.send_replace(session.snapshot());
    }
}

/// Apply a command and publish before replying, so a caller that awaited the
/// reply always sees the resulting snapshot.
fn handle_command(
    session: &mut WorkoutSession,
    cmd: SessionCommand,
    snapshot_tx: &watch::Sender<Option<DisplaySnapshot>>,
    answer_tx: &mpsc::UnboundedSender<Answer>,
) {
    match cmd {
        SessionCommand::Start { config, reply } => {
            let result = session.start(config, now());
            publish(session, snapshot_tx);
            let _ = reply.send(result);
        }
        SessionCommand::TogglePause => session.toggle_pause(now()),
        SessionCommand::Skip => session.skip(now()),
        SessionCommand::Lap => session.lap(now()),
        SessionCommand::Round => session.round(),
        SessionCommand::Advance => session.advance(now()),
        SessionCommand::Finish => session.finish(now()),
        SessionCommand::Stop { gate, reply } => {
            ask(session, gate, STOP_PROMPT, Teardown::Stop(reply), snapshot_tx, answer_tx);
        }
        SessionCommand::BackToConfig { gate, reply } => {
            ask(session, gate, BACK_PROMPT, Teardown::Back(reply), snapshot_tx, answer_tx);
        }
        SessionCommand::Restart { reply } => {
            let result = session.restart(now());
            publish(session, snapshot_tx);
            let _ = reply.send(result);
        }
        SessionCommand::UpdateSettings(settings) => {
            tracing::debug!(?settings, "Settings updated");
            session.set_settings(settings);
        }
        SessionCommand::Snapshot { reply } => {
            let _ = reply.send(session.snapshot());
        }
        // handled by the loop
        SessionCommand::Shutdown => {}
    }
    publish(session, snapshot_tx);
}

/// Put the question to `gate` off the session task. Without an active run
/// there is nothing to confirm and the teardown finishes at once.
fn ask(
    session: &mut WorkoutSession,
    mut gate: BoxedGate,
    prompt: &'static str,
    teardown: Teardown,
    snapshot_tx: &watch::Sender<Option<DisplaySnapshot>>,
    answer_tx: &mpsc::UnboundedSender<Answer>,
) {
    if !session.is_active() {
        let answer = Answer {
            teardown,
            confirmed: true,
        };
        finish_teardown(session, answer, snapshot_tx);
        return;
    }
    let answer_tx = answer_tx.clone();
    tokio::task::spawn_blocking(move || {
        let confirmed = gate.confirm(prompt);
        let _ = answer_tx.send(Answer {
            teardown,
            confirmed,
        });
    });
}

/// Apply a confirmed or declined teardown. A run that ended while the prompt
/// was open counts as stopped.
fn finish_teardown(
    session: &mut WorkoutSession,
    answer: Answer,
    snapshot_tx: &watch::Sender<Option<DisplaySnapshot>>,
) {
    let mut gate = AutoConfirm(answer.confirmed);
    match answer.teardown {
        Teardown::Stop(reply) => {
            let stopped = session.stop(&mut gate);
            snapshot_tx.send_replace(session.snapshot());
            let _ = reply.send(stopped);
        }
        Teardown::Back(reply) => {
            let config = session.back_to_config(&mut gate);
            snapshot_tx.send_replace(session.snapshot());
            let _ = reply.send(config);
        }
    }
}
