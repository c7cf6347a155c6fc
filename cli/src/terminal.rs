//! Terminal implementations of the engine's collaborators

use std::io::Write;
use std::time::{Duration, Instant};

use wodtimer_core::{ConfirmationGate, CueKind, CuePlayer, MetronomeSink};

const BELL: &str = "\x07";

/// Short text for a cue, printed with a terminal bell
pub fn cue_text(cue: CueKind) -> String {
    match cue {
        CueKind::WorkStart => "GO".to_string(),
        CueKind::RestStart => "rest".to_string(),
        CueKind::RoundComplete => "round complete".to_string(),
        CueKind::WorkoutFinish => "finish".to_string(),
        CueKind::Countdown(n) => n.to_string(),
        CueKind::Alert => "!".to_string(),
    }
}

/// Prints cues and speech lines on stdout
#[derive(Debug, Default)]
pub struct TerminalCues {
    /// Ring the terminal bell with each cue
    pub bell: bool,
}

impl CuePlayer for TerminalCues {
    fn play_cue(&mut self, cue: CueKind) {
        let bell = if self.bell { BELL } else { "" };
        println!("  ♪ {}{bell}", cue_text(cue));
    }

    fn speak(&mut self, text: &str) {
        println!("  » {text}");
    }
}

/// Metronome clock backed by a monotonic `Instant`.
///
/// A terminal cannot play a click at a precise time, so scheduled clicks are
/// counted and traced instead of sounded.
#[derive(Debug)]
pub struct TerminalClock {
    origin: Instant,
    clicks: u64,
}

impl TerminalClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            clicks: 0,
        }
    }

    pub fn clicks(&self) -> u64 {
        self.clicks
    }
}

impl Default for TerminalClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MetronomeSink for TerminalClock {
    fn schedule_click(&mut self, at: f64) {
        self.clicks += 1;
        tracing::trace!(at, clicks = self.clicks, "Metronome click");
    }

    fn current_time(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn beat_pulse(&mut self, delay: Duration) {
        tracing::trace!(delay_ms = delay.as_millis() as u64, "Beat pulse");
    }
}

/// Asks on stdin. The session runs it on the blocking pool while the REPL is
/// waiting on the reply, so the two never read stdin at the same time.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinGate;

impl ConfirmationGate for StdinGate {
    fn confirm(&mut self, message: &str) -> bool {
        print!("{message} [y/N] ");
        if std::io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match std::io::stdin().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read confirmation");
                false
            }
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
