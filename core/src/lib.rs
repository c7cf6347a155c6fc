pub mod builder;
pub mod collaborators;
pub mod config;
pub mod display;
pub mod engine;
pub mod history;
pub mod library;
pub mod metronome;
pub mod parser;
pub mod runtime;
pub mod session;
pub mod store;
pub mod time;

// Shared data model
pub use wodtimer_types as types;

// Re-exports for convenience
pub use builder::{EMOM_ROUND_SECS, build_phases};
pub use collaborators::{
    AutoConfirm, ConfirmationGate, CueKind, CuePlayer, HistorySink, MetronomeSink, NoWakeLock,
    WakeLock,
};
pub use config::{ConfigError, SETTING_KEYS, SettingsExt};
pub use display::{DisplaySnapshot, block_label, exercise_display, phase_label};
pub use engine::{EngineEffect, EngineError, RunStatus, TimerEngine, TimerState};
pub use history::{HistoryStore, MAX_HISTORY};
pub use library::{LibraryStore, default_workouts, workout_config};
pub use metronome::{Metronome, effective_settings, should_play};
pub use parser::{CUSTOM_PRESETS, INTERVAL_PRESETS, IntervalPreset, parse, parse_exercise};
pub use runtime::{SessionCommand, SessionError, SessionHandle, spawn_session};
pub use session::{Collaborators, WorkoutSession};
pub use store::StoreError;
pub use time::{format_time, format_time_millis, parse_time_duration};
