//! Side effects requested by the engine
//!
//! The engine never touches audio, screens or disk itself. Every transition
//! appends effects to a queue that the owner drains with
//! [`TimerEngine::take_effects`](super::TimerEngine::take_effects) and routes to
//! its collaborators.

use wodtimer_types::{HistoryRecord, MetronomeSettings, PhaseType};

use crate::collaborators::CueKind;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEffect {
    Cue(CueKind),
    Speak(String),
    /// (Re)start the metronome for a newly entered phase
    StartMetronome {
        phase_type: PhaseType,
        settings: Option<MetronomeSettings>,
    },
    PauseMetronome(bool),
    StopMetronome,
    AcquireWakeLock,
    ReleaseWakeLock,
    RecordHistory(HistoryRecord),
    /// Visible state changed
    Redraw,
    /// The run reached its natural end
    Completed,
}
