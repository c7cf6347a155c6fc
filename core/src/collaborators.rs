//! Capabilities the engine drives but does not implement
//!
//! Front ends provide these: something that plays tones and speaks, a clock
//! that can schedule metronome clicks, a wake lock, a place to append history
//! and a yes/no prompt. Failures are never fatal to a run.

use std::time::Duration;

use wodtimer_types::HistoryRecord;

use crate::store::StoreError;

/// Audio cue requested by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueKind {
    WorkStart,
    RestStart,
    RoundComplete,
    WorkoutFinish,
    /// Seconds remaining (3, 2, 1)
    Countdown(u8),
    Alert,
}

pub trait CuePlayer {
    fn play_cue(&mut self, cue: CueKind);
    fn speak(&mut self, text: &str);
}

/// Precise clock used to place metronome clicks, independent of the tick.
pub trait MetronomeSink {
    /// Schedule a click at `at` seconds on this sink's clock
    fn schedule_click(&mut self, at: f64);

    /// Current time on this sink's clock, in seconds
    fn current_time(&self) -> f64;

    /// Wake the underlying audio device if it was suspended
    fn resume(&mut self) {}

    /// Visual beat pulse to fire after `delay`, in sync with a click
    fn beat_pulse(&mut self, _delay: Duration) {}
}

/// Best-effort screen wake lock
pub trait WakeLock {
    fn acquire(&mut self) -> std::io::Result<()>;
    fn release(&mut self);
}

/// Append-only sink for completed runs
pub trait HistorySink {
    fn record(&mut self, record: HistoryRecord) -> Result<(), StoreError>;
}

/// Yes/no prompt shown before a run is torn down
pub trait ConfirmationGate {
    fn confirm(&mut self, message: &str) -> bool;
}

impl<F> ConfirmationGate for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, message: &str) -> bool {
        self(message)
    }
}

/// Gate that answers every prompt the same way
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl ConfirmationGate for AutoConfirm {
    fn confirm(&mut self, _message: &str) -> bool {
        self.0
    }
}

impl<T: CuePlayer + ?Sized> CuePlayer for Box<T> {
    fn play_cue(&mut self, cue: CueKind) {
        (**self).play_cue(cue);
    }

    fn speak(&mut self, text: &str) {
        (**self).speak(text);
    }
}

impl<T: MetronomeSink + ?Sized> MetronomeSink for Box<T> {
    fn schedule_click(&mut self, at: f64) {
        (**self).schedule_click(at);
    }

    fn current_time(&self) -> f64 {
        (**self).current_time()
    }

    fn resume(&mut self) {
        (**self).resume();
    }

    fn beat_pulse(&mut self, delay: Duration) {
        (**self).beat_pulse(delay);
    }
}

/// Wake lock for hosts without one
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWakeLock;

impl WakeLock for NoWakeLock {
    fn acquire(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    fn release(&mut self) {}
}
