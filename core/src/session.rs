//! Workout session
//!
//! Owns the single active [`TimerEngine`] together with the collaborators its
//! effects are routed to. Starting a run replaces the previous one; there is
//! never more than one engine per session.
//!
//! User settings are applied here rather than in the engine: `sounds` gates
//! tones, `countdown3` gates the last-three-seconds beeps, `voice` gates
//! speech and `wakelock` gates wake-lock acquisition.

use std::time::Instant;

use wodtimer_types::{Phase, Settings, TimerConfig};

use crate::collaborators::{
    ConfirmationGate, CueKind, CuePlayer, HistorySink, MetronomeSink, WakeLock,
};
use crate::display::DisplaySnapshot;
use crate::engine::{EngineEffect, EngineError, TimerEngine};
use crate::metronome::Metronome;

pub type BoxedCuePlayer = Box<dyn CuePlayer + Send>;
pub type BoxedMetronomeSink = Box<dyn MetronomeSink + Send>;
pub type BoxedWakeLock = Box<dyn WakeLock + Send>;
pub type BoxedHistorySink = Box<dyn HistorySink + Send>;

/// Front-end implementations of every capability the engine drives
pub struct Collaborators {
    pub cues: BoxedCuePlayer,
    pub metronome: BoxedMetronomeSink,
    pub wake_lock: BoxedWakeLock,
    pub history: BoxedHistorySink,
}

pub struct WorkoutSession {
    engine: Option<TimerEngine>,
    metronome: Metronome<BoxedMetronomeSink>,
    cues: BoxedCuePlayer,
    wake_lock: BoxedWakeLock,
    history: BoxedHistorySink,
    settings: Settings,
    last_config: Option<TimerConfig>,
    redraw: bool,
}

impl WorkoutSession {
    pub fn new(collaborators: Collaborators, settings: Settings) -> Self {
        let Collaborators {
            cues,
            metronome,
            wake_lock,
            history,
        } = collaborators;
        Self {
            engine: None,
            metronome: Metronome::new(metronome),
            cues,
            wake_lock,
            history,
            settings,
            last_config: None,
            redraw: false,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Starting runs
    // ─────────────────────────────────────────────────────────────────────────

    /// Start a run from `config`, replacing any active run. An invalid
    /// configuration leaves the current run untouched.
    pub fn start(&mut self, config: TimerConfig, now: Instant) -> Result<(), EngineError> {
        let engine = TimerEngine::start(config.clone(), now)?;
        self.last_config = Some(config);
        self.install(engine);
        Ok(())
    }

    /// Start a run over a prebuilt phase list. Nothing is recorded to history.
    pub fn start_phases(&mut self, phases: Vec<Phase>, now: Instant) -> Result<(), EngineError> {
        let engine = TimerEngine::from_phases(phases, now)?;
        self.install(engine);
        Ok(())
    }

    /// Start again with the last configuration. Returns `Ok(false)` when no
    /// configuration has been run yet.
    pub fn restart(&mut self, now: Instant) -> Result<bool, EngineError> {
        let Some(config) = self.last_config.clone() else {
            return Ok(false);
        };
        self.start(config, now)?;
        Ok(true)
    }

    fn install(&mut self, engine: TimerEngine) {
        if self.engine.as_ref().is_some_and(TimerEngine::is_active) {
            tracing::debug!("Replacing active run");
            self.metronome.stop();
            self.wake_lock.release();
        }
        self.engine = Some(engine);
        self.flush();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Driving
    // ─────────────────────────────────────────────────────────────────────────

    pub fn tick(&mut self, now: Instant) {
        self.with_engine(|engine| engine.tick(now));
    }

    /// Coarse metronome scheduling pass
    pub fn metronome_tick(&mut self) {
        self.metronome.schedule();
    }

    pub fn toggle_pause(&mut self, now: Instant) {
        self.with_engine(|engine| engine.toggle_pause(now));
    }

    pub fn skip(&mut self, now: Instant) {
        self.with_engine(|engine| engine.skip_phase(now));
    }

    pub fn lap(&mut self, now: Instant) {
        self.with_engine(|engine| engine.add_lap(now));
    }

    pub fn round(&mut self) {
        self.with_engine(TimerEngine::add_round);
    }

    pub fn advance(&mut self, now: Instant) {
        self.with_engine(|engine| engine.advance_from_wait(now));
    }

    pub fn finish(&mut self, now: Instant) {
        self.with_engine(|engine| engine.finish_for_time(now));
    }

    /// Returns whether the run is over. Without a run there is nothing to stop.
    pub fn stop(&mut self, gate: &mut dyn ConfirmationGate) -> bool {
        self.with_engine(|engine| engine.stop(gate)).unwrap_or(true)
    }

    /// Stop the run and hand back its configuration for editing. `None` when
    /// the prompt was declined or nothing has been run.
    pub fn back_to_config(&mut self, gate: &mut dyn ConfirmationGate) -> Option<TimerConfig> {
        let confirmed = self
            .with_engine(|engine| engine.back_to_config(gate))
            .unwrap_or(true);
        if confirmed {
            self.last_config.clone()
        } else {
            None
        }
    }

    fn with_engine<R>(&mut self, f: impl FnOnce(&mut TimerEngine) -> R) -> Option<R> {
        let result = f(self.engine.as_mut()?);
        self.flush();
        Some(result)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Effects
    // ─────────────────────────────────────────────────────────────────────────

    fn flush(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let effects = engine.take_effects();
        let paused = engine.is_paused();
        for effect in effects {
            self.apply(effect, paused);
        }
    }

    fn apply(&mut self, effect: EngineEffect, paused: bool) {
        match effect {
            EngineEffect::Cue(cue) => {
                let allowed = match cue {
                    CueKind::Countdown(_) => self.settings.sounds && self.settings.countdown3,
                    _ => self.settings.sounds,
                };
                if allowed {
                    self.cues.play_cue(cue);
                }
            }
            EngineEffect::Speak(text) => {
                if self.settings.voice {
                    self.cues.speak(&text);
                }
            }
            EngineEffect::StartMetronome {
                phase_type,
                settings,
            } => {
                self.metronome.start(phase_type, settings.as_ref(), paused);
            }
            EngineEffect::PauseMetronome(paused) => self.metronome.set_paused(paused),
            EngineEffect::StopMetronome => self.metronome.stop(),
            EngineEffect::AcquireWakeLock => {
                if self.settings.wakelock
                    && let Err(e) = self.wake_lock.acquire()
                {
                    tracing::warn!(error = %e, "Wake lock unavailable");
                }
            }
            EngineEffect::ReleaseWakeLock => self.wake_lock.release(),
            EngineEffect::RecordHistory(record) => {
                if let Err(e) = self.history.record(record) {
                    tracing::warn!(error = %e, "Failed to record workout history");
                }
            }
            EngineEffect::Redraw | EngineEffect::Completed => self.redraw = true,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn engine(&self) -> Option<&TimerEngine> {
        self.engine.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.engine.as_ref().is_some_and(TimerEngine::is_active)
    }

    pub fn last_config(&self) -> Option<&TimerConfig> {
        self.last_config.as_ref()
    }

    pub fn snapshot(&self) -> Option<DisplaySnapshot> {
        DisplaySnapshot::from_engine(self.engine.as_ref()?, self.settings.millis)
    }

    /// Whether anything visible changed since the last call
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn metronome(&self) -> &Metronome<BoxedMetronomeSink> {
        &self.metronome
    }
}
