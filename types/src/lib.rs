//! Shared workout and timer types for wodtimer
//!
//! This crate contains the serializable data model shared between the core
//! engine (wodtimer-core) and any front end that renders or stores workouts.
//! It carries no behavior beyond small accessors and defaults.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Phases
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of an atomic timed segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseType {
    #[default]
    Work,
    Rest,
    Warmup,
    Cooldown,
    Prepare,
    Countdown,
    Stopwatch,
    Wait,
}

impl PhaseType {
    /// Human label shown next to the clock
    pub fn label(&self) -> &'static str {
        match self {
            PhaseType::Work => "Work!",
            PhaseType::Rest => "Rest",
            PhaseType::Warmup => "Warm up",
            PhaseType::Cooldown => "Cool down",
            PhaseType::Prepare => "Get ready",
            PhaseType::Countdown => "Countdown",
            PhaseType::Stopwatch => "Stopwatch",
            PhaseType::Wait => "Done?",
        }
    }

    /// Phrase spoken when a phase of this type begins
    pub fn phrase(&self) -> &'static str {
        match self {
            PhaseType::Stopwatch => "Go",
            PhaseType::Wait => "Wait",
            other => other.label(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseType::Work => "work",
            PhaseType::Rest => "rest",
            PhaseType::Warmup => "warmup",
            PhaseType::Cooldown => "cooldown",
            PhaseType::Prepare => "prepare",
            PhaseType::Countdown => "countdown",
            PhaseType::Stopwatch => "stopwatch",
            PhaseType::Wait => "wait",
        }
    }
}

/// Nominal length of a phase.
///
/// `Open` phases never auto-advance on elapsed time; they count up until the
/// user advances or the run is stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseDuration {
    /// Whole seconds
    Fixed(u32),
    Open,
}

impl PhaseDuration {
    pub fn is_open(&self) -> bool {
        matches!(self, PhaseDuration::Open)
    }

    /// Seconds for fixed phases, `None` when open-ended
    pub fn secs(&self) -> Option<u32> {
        match self {
            PhaseDuration::Fixed(secs) => Some(*secs),
            PhaseDuration::Open => None,
        }
    }

    /// Seconds as a float, `f64::INFINITY` when open-ended
    pub fn as_f64(&self) -> f64 {
        match self {
            PhaseDuration::Fixed(secs) => f64::from(*secs),
            PhaseDuration::Open => f64::INFINITY,
        }
    }

    /// Seconds counted toward totals (open phases count as zero)
    pub fn finite_secs(&self) -> u32 {
        self.secs().unwrap_or(0)
    }
}

impl Default for PhaseDuration {
    fn default() -> Self {
        PhaseDuration::Open
    }
}

/// Structural tag on AMRAP / For Time segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentLabel {
    #[serde(rename = "fortime")]
    ForTime,
    Amrap,
}

impl SegmentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentLabel::ForTime => "fortime",
            SegmentLabel::Amrap => "amrap",
        }
    }
}

/// When a phase-local metronome annotation should click
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetronomeMode {
    #[default]
    Work,
    Rest,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lbs,
}

impl WeightUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::Lbs => "lbs",
        }
    }
}

/// One movement within a phase.
///
/// No unit conversion is performed; `weight_unit` is kept as written.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_unit: Option<WeightUnit>,
    /// Free-form "NN%" string, stored verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<String>,
    /// Perceived effort
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pse: Option<u32>,
}

impl Exercise {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Position of a phase inside an exercise-stepping expansion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExerciseStep {
    /// 1-based index (e.g. 2 of 6)
    pub index: u32,
    pub count: u32,
    /// First exercise of an AMRAP loop
    #[serde(default)]
    pub loop_start: bool,
    /// Last exercise of an AMRAP loop
    #[serde(default)]
    pub loop_end: bool,
    /// Overall budget for the whole segment, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_cap: Option<u32>,
}

/// Position of a phase inside an expanded repeat block (for display only)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockPosition {
    pub block_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub round: u32,
    pub total_rounds: u32,
    pub sub_phase: u32,
    pub sub_phase_total: u32,
}

/// One atomic timed (or untimed) segment of a workout
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Phase {
    #[serde(rename = "type")]
    pub phase_type: PhaseType,
    pub duration: PhaseDuration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<SegmentLabel>,
    /// User-supplied label from `# heading` lines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_label: Option<String>,
    /// 1-based round, set by the builder for intervals / EMOM
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exercises: Vec<Exercise>,
    /// Phase-local BPM override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metronome: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metronome_mode: Option<MetronomeMode>,
    /// Counts up, user must confirm before advancing
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_wait: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<ExerciseStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockPosition>,
    /// Seconds actually spent, recorded when the engine leaves the phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_duration: Option<f64>,
    /// Display-precision override (hundredths on/off)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub millis: Option<bool>,
}

/// How the engine treats a phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhaseKind<'a> {
    /// Auto-advances after the given seconds
    Timed(u32),
    /// Counts up forever, advanced only by skip / stop
    OpenEnded,
    /// Counts up until the user confirms it is done
    Confirm,
    /// One movement of an AMRAP / For Time checklist
    ExerciseStep(&'a ExerciseStep),
}

impl Phase {
    pub fn new(phase_type: PhaseType, duration: PhaseDuration) -> Self {
        Self {
            phase_type,
            duration,
            ..Default::default()
        }
    }

    pub fn timed(phase_type: PhaseType, secs: u32) -> Self {
        Self::new(phase_type, PhaseDuration::Fixed(secs))
    }

    pub fn open(phase_type: PhaseType) -> Self {
        Self::new(phase_type, PhaseDuration::Open)
    }

    pub fn with_round(mut self, round: u32) -> Self {
        self.round = Some(round);
        self
    }

    pub fn kind(&self) -> PhaseKind<'_> {
        if let Some(step) = &self.step {
            return PhaseKind::ExerciseStep(step);
        }
        if self.is_wait || self.phase_type == PhaseType::Wait {
            return PhaseKind::Confirm;
        }
        match self.duration {
            PhaseDuration::Fixed(secs) => PhaseKind::Timed(secs),
            PhaseDuration::Open => PhaseKind::OpenEnded,
        }
    }

    /// True when the phase waits for an explicit user action
    pub fn awaits_user(&self) -> bool {
        matches!(self.kind(), PhaseKind::Confirm | PhaseKind::ExerciseStep(_))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Blocks and parse results
// ─────────────────────────────────────────────────────────────────────────────

pub const NO_VALID_PHASES: &str = "No valid phases found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Warmup,
    Cooldown,
    #[serde(rename = "fortime")]
    ForTime,
    Amrap,
    Emom,
    Tabata,
    Rest,
    Wait,
    Work,
}

impl BlockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Warmup => "warmup",
            BlockType::Cooldown => "cooldown",
            BlockType::ForTime => "fortime",
            BlockType::Amrap => "amrap",
            BlockType::Emom => "emom",
            BlockType::Tabata => "tabata",
            BlockType::Rest => "rest",
            BlockType::Wait => "wait",
            BlockType::Work => "work",
        }
    }
}

/// Display grouping over one or more phases. Never drives execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutBlock {
    #[serde(rename = "type")]
    pub block_type: BlockType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub phases: Vec<Phase>,
    /// Sum of the finite member durations
    pub total_duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetitions: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exercises: Vec<Exercise>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metronome: Option<u32>,
    /// One round's template, kept when a repeat block is complex enough to
    /// deserve a structured preview
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_phases: Vec<Phase>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedWorkout {
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub blocks: Vec<WorkoutBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ParsedWorkout {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            phases: Vec::new(),
            blocks: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none() && !self.phases.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Timer configuration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerType {
    Stopwatch,
    Countdown,
    Intervals,
    Emom,
    Amrap,
    #[serde(rename = "fortime")]
    ForTime,
    Custom,
}

impl TimerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerType::Stopwatch => "stopwatch",
            TimerType::Countdown => "countdown",
            TimerType::Intervals => "intervals",
            TimerType::Emom => "emom",
            TimerType::Amrap => "amrap",
            TimerType::ForTime => "fortime",
            TimerType::Custom => "custom",
        }
    }

    /// Title used by configuration screens
    pub fn title(&self) -> &'static str {
        match self {
            TimerType::Stopwatch => "Stopwatch",
            TimerType::Countdown => "Countdown Timer",
            TimerType::Intervals => "Intervals",
            TimerType::Emom => "EMOM",
            TimerType::Amrap => "AMRAP",
            TimerType::ForTime => "For Time",
            TimerType::Custom => "Custom Workout",
        }
    }
}

pub const MIN_BPM: u32 = 5;
pub const MAX_BPM: u32 = 200;

/// Run-level metronome configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetronomeSettings {
    pub enabled: bool,
    pub bpm: u32,
    pub during_work: bool,
    pub during_rest: bool,
    pub always: bool,
}

impl Default for MetronomeSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            bpm: 120,
            during_work: true,
            during_rest: false,
            always: false,
        }
    }
}

impl MetronomeSettings {
    /// Set the tempo, clamped to the supported range
    pub fn with_bpm(mut self, bpm: u32) -> Self {
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StopwatchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metronome: Option<MetronomeSettings>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CountdownConfig {
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metronome: Option<MetronomeSettings>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IntervalsConfig {
    pub work: u32,
    #[serde(default)]
    pub rest: u32,
    pub rounds: u32,
    #[serde(default)]
    pub warmup: u32,
    #[serde(default)]
    pub cooldown: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metronome: Option<MetronomeSettings>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmomConfig {
    pub rounds: u32,
    #[serde(default)]
    pub warmup: u32,
    #[serde(default)]
    pub cooldown: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metronome: Option<MetronomeSettings>,
}

/// Shared by AMRAP and For Time
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CappedConfig {
    /// Seconds; 0 means uncapped (For Time only)
    #[serde(default)]
    pub time_cap: u32,
    #[serde(default)]
    pub warmup: u32,
    #[serde(default)]
    pub cooldown: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metronome: Option<MetronomeSettings>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomConfig {
    pub text: String,
    pub parsed: ParsedWorkout,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metronome: Option<MetronomeSettings>,
}

/// Everything needed to build a phase list, keyed by timer type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TimerConfig {
    Stopwatch(StopwatchConfig),
    Countdown(CountdownConfig),
    Intervals(IntervalsConfig),
    Emom(EmomConfig),
    Amrap(CappedConfig),
    #[serde(rename = "fortime")]
    ForTime(CappedConfig),
    Custom(CustomConfig),
}

impl TimerConfig {
    pub fn timer_type(&self) -> TimerType {
        match self {
            TimerConfig::Stopwatch(_) => TimerType::Stopwatch,
            TimerConfig::Countdown(_) => TimerType::Countdown,
            TimerConfig::Intervals(_) => TimerType::Intervals,
            TimerConfig::Emom(_) => TimerType::Emom,
            TimerConfig::Amrap(_) => TimerType::Amrap,
            TimerConfig::ForTime(_) => TimerType::ForTime,
            TimerConfig::Custom(_) => TimerType::Custom,
        }
    }

    pub fn metronome(&self) -> Option<&MetronomeSettings> {
        match self {
            TimerConfig::Stopwatch(c) => c.metronome.as_ref(),
            TimerConfig::Countdown(c) => c.metronome.as_ref(),
            TimerConfig::Intervals(c) => c.metronome.as_ref(),
            TimerConfig::Emom(c) => c.metronome.as_ref(),
            TimerConfig::Amrap(c) | TimerConfig::ForTime(c) => c.metronome.as_ref(),
            TimerConfig::Custom(c) => c.metronome.as_ref(),
        }
    }

    pub fn set_metronome(&mut self, settings: Option<MetronomeSettings>) {
        match self {
            TimerConfig::Stopwatch(c) => c.metronome = settings,
            TimerConfig::Countdown(c) => c.metronome = settings,
            TimerConfig::Intervals(c) => c.metronome = settings,
            TimerConfig::Emom(c) => c.metronome = settings,
            TimerConfig::Amrap(c) | TimerConfig::ForTime(c) => c.metronome = settings,
            TimerConfig::Custom(c) => c.metronome = settings,
        }
    }

    /// Validity predicate checked before a run is started
    pub fn is_valid(&self) -> bool {
        match self {
            TimerConfig::Stopwatch(_) | TimerConfig::ForTime(_) => true,
            TimerConfig::Countdown(c) => c.duration > 0,
            TimerConfig::Intervals(c) => c.work > 0 && c.rounds > 0,
            TimerConfig::Emom(c) => c.rounds > 0,
            TimerConfig::Amrap(c) => c.time_cap > 0,
            TimerConfig::Custom(c) => !c.parsed.phases.is_empty(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User settings
// ─────────────────────────────────────────────────────────────────────────────

/// Audio, display and metronome defaults (persisted by the core crate)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Speak phase names and countdown numbers
    pub voice: bool,
    /// Play tones
    pub sounds: bool,
    /// Beep on the last three seconds of a timed phase
    pub countdown3: bool,
    /// 0-100
    pub alert_volume: u8,
    /// 0-100
    pub metronome_volume: u8,
    pub metronome_default: bool,
    pub bpm: u32,
    pub wakelock: bool,
    /// Show hundredths on the stopwatch
    pub millis: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            voice: false,
            sounds: true,
            countdown3: true,
            alert_volume: 80,
            metronome_volume: 60,
            metronome_default: false,
            bpm: 120,
            wakelock: true,
            millis: true,
        }
    }
}

impl Settings {
    /// Metronome settings a freshly opened configuration starts with
    pub fn metronome_defaults(&self) -> MetronomeSettings {
        MetronomeSettings {
            enabled: self.metronome_default,
            ..MetronomeSettings::default()
        }
        .with_bpm(self.bpm)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Run results
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lap {
    pub lap: u32,
    /// Seconds since the previous lap
    pub split: f64,
    /// Cumulative seconds
    pub total: f64,
}

/// Summary handed to the history sink when a run completes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(rename = "type")]
    pub timer_type: TimerType,
    /// Whole seconds elapsed
    pub duration: u64,
    pub work_time: f64,
    pub rounds: u32,
    pub config: TimerConfig,
}

/// A stored history record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    /// RFC 3339 timestamp
    pub date: String,
    #[serde(flatten)]
    pub record: HistoryRecord,
}

// ─────────────────────────────────────────────────────────────────────────────
// Workout library
// ─────────────────────────────────────────────────────────────────────────────

/// User-editable part of a saved workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWorkout {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub timer_type: TimerType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Workout text for custom workouts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<TimerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metronome: Option<MetronomeSettings>,
}

/// A workout stored in the library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedWorkout {
    pub id: i64,
    #[serde(flatten)]
    pub workout: NewWorkout,
    /// RFC 3339 timestamps
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub last_used_at: Option<String>,
    #[serde(default)]
    pub use_count: u32,
    #[serde(default)]
    pub is_favorite: bool,
}

impl SavedWorkout {
    /// Case-insensitive match on name, description or any tag
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        let w = &self.workout;
        w.name.to_lowercase().contains(&query)
            || w
                .description
                .as_ref()
                .is_some_and(|d| d.to_lowercase().contains(&query))
            || w.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }

    /// `# heading` labels of the workout text, joined for a one-line preview
    pub fn preview(&self) -> Option<String> {
        let text = self.workout.text_definition.as_deref()?;
        let labels: Vec<&str> = text
            .lines()
            .filter_map(|l| l.trim().strip_prefix('#'))
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        (!labels.is_empty()).then(|| labels.join(" · "))
    }
}
