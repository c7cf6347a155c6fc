//! Built-in workout presets

use phf::phf_ordered_map;
use wodtimer_types::{IntervalsConfig, MetronomeSettings};

/// Work / rest / rounds for the quick interval presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalPreset {
    pub work: u32,
    pub rest: u32,
    pub rounds: u32,
}

impl IntervalPreset {
    const fn new(work: u32, rest: u32, rounds: u32) -> Self {
        Self { work, rest, rounds }
    }

    pub fn to_config(self, metronome: Option<MetronomeSettings>) -> IntervalsConfig {
        IntervalsConfig {
            work: self.work,
            rest: self.rest,
            rounds: self.rounds,
            warmup: 0,
            cooldown: 0,
            metronome,
        }
    }
}

/// Custom-workout texts, in display order
pub static CUSTOM_PRESETS: phf::OrderedMap<&'static str, &'static str> = phf_ordered_map! {
    "tabata" => "# Tabata (4 min)\n8x\n20s work\n10s rest",
    "emom" => "# EMOM - 10 rounds\nemom\n10x\n60s work",
    "fortime" => "# For Time (cap 10min)\nfortime 10min",
    "amrap" => "# AMRAP 12 min\namrap 12min",
    "complex" => "# Complex Workout\nwarmup\n2min\n\nemom 1\n10x\n60s work\n\n1min rest\n\nemom 2\n5x\n40s work\n20s rest\n\ncooldown\n2min",
};

pub static INTERVAL_PRESETS: phf::OrderedMap<&'static str, IntervalPreset> = phf_ordered_map! {
    "tabata" => IntervalPreset::new(20, 10, 8),
    "3030" => IntervalPreset::new(30, 30, 10),
    "4020" => IntervalPreset::new(40, 20, 10),
    "4515" => IntervalPreset::new(45, 15, 10),
};

pub fn custom_preset(name: &str) -> Option<&'static str> {
    CUSTOM_PRESETS.get(name).copied()
}

pub fn interval_preset(name: &str) -> Option<IntervalPreset> {
    INTERVAL_PRESETS.get(name).copied()
}
