use clap::{Args, Parser, Subcommand};
use wodtimer_cli::commands;
use wodtimer_core::SettingsExt;
use wodtimer_core::parse_time_duration;
use wodtimer_core::types::{
    CappedConfig, CountdownConfig, EmomConfig, IntervalsConfig, MetronomeSettings, Settings,
    StopwatchConfig, TimerConfig,
};

#[tokio::main]
async fn main() -> Result<(), String> {
    let _log_guard = wodtimer_cli::logging::init();
    let cli = Cli::parse();
    let mut settings = Settings::load();

    match cli.command {
        Commands::Parse { path, json } => commands::parse_file(&path, json),
        Commands::Run { source, metronome } => {
            let metronome = metronome.resolve(settings.metronome_defaults());
            let config = source.into_config(metronome)?;
            commands::run_workout(config, settings).await
        }
        Commands::Presets => {
            commands::list_presets();
            Ok(())
        }
        Commands::History { limit, clear } => {
            if clear {
                commands::clear_history()
            } else {
                commands::show_history(limit)
            }
        }
        Commands::Library { command } => match command {
            LibraryCommand::Add {
                name,
                description,
                tags,
                source,
                metronome,
            } => {
                let metronome = metronome.resolve(settings.metronome_defaults());
                let config = source.into_config(metronome)?;
                commands::library_add(commands::new_workout(name, description, tags, config))
            }
            LibraryCommand::List => commands::library_list(),
            LibraryCommand::Search { query } => commands::library_search(&query),
            LibraryCommand::Show { id } => commands::library_show(id),
            LibraryCommand::Run { id } => commands::library_run(id, settings).await,
            LibraryCommand::Fav { id } => commands::library_favorite(id),
            LibraryCommand::Rm { id } => commands::library_remove(id),
        },
        Commands::Settings { set } => {
            if !set.is_empty() {
                commands::update_settings(&mut settings, &set)?;
            }
            commands::show_settings(&settings);
            Ok(())
        }
    }
}

#[derive(Parser)]
#[command(version, about = "Interval workout timer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a workout file (`-` for stdin) and list its phases
    Parse {
        path: String,
        #[arg(long)]
        json: bool,
    },
    /// Run a workout interactively
    Run {
        #[command(subcommand)]
        source: RunSource,
        #[command(flatten)]
        metronome: MetronomeArgs,
    },
    Presets,
    History {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        clear: bool,
    },
    /// Saved workouts
    Library {
        #[command(subcommand)]
        command: LibraryCommand,
    },
    /// Show settings, or change them with `--set key=value`
    Settings {
        #[arg(long, value_name = "KEY=VALUE")]
        set: Vec<String>,
    },
}

#[derive(Subcommand)]
enum LibraryCommand {
    /// Save a workout under a name
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Comma separated
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[command(subcommand)]
        source: RunSource,
        #[command(flatten)]
        metronome: MetronomeArgs,
    },
    /// Favorites first, then newest
    List,
    /// Match name, description or tags
    Search { query: String },
    Show { id: i64 },
    Run { id: i64 },
    /// Toggle favorite
    Fav { id: i64 },
    Rm { id: i64 },
}

/// Durations accept `45s`, `2min`, `1:30` or bare seconds
#[derive(Subcommand)]
enum RunSource {
    /// Workout text from a file, `-` for stdin
    File { path: String },
    Preset { name: String },
    Intervals {
        #[arg(long, default_value = "20s")]
        work: String,
        #[arg(long, default_value = "10s")]
        rest: String,
        #[arg(long, default_value_t = 8)]
        rounds: u32,
        #[command(flatten)]
        bookends: Bookends,
    },
    Emom {
        #[arg(long, default_value_t = 10)]
        rounds: u32,
        #[command(flatten)]
        bookends: Bookends,
    },
    Amrap {
        #[arg(long)]
        cap: String,
        #[command(flatten)]
        bookends: Bookends,
    },
    Fortime {
        /// `0` for no cap
        #[arg(long, default_value = "0")]
        cap: String,
        #[command(flatten)]
        bookends: Bookends,
    },
    Countdown { duration: String },
    Stopwatch,
}

#[derive(Args)]
struct Bookends {
    #[arg(long, default_value = "0")]
    warmup: String,
    #[arg(long, default_value = "0")]
    cooldown: String,
}

#[derive(Args)]
struct MetronomeArgs {
    /// Enable the metronome at this tempo
    #[arg(long, global = true)]
    bpm: Option<u32>,
    /// Also click during rest
    #[arg(long, global = true)]
    metronome_rest: bool,
    /// Click in every phase
    #[arg(long, global = true)]
    metronome_always: bool,
}

impl MetronomeArgs {
    /// `None` when the metronome stays off
    fn resolve(&self, defaults: MetronomeSettings) -> Option<MetronomeSettings> {
        let mut settings = defaults;
        if let Some(bpm) = self.bpm {
            settings = settings.with_bpm(bpm);
            settings.enabled = true;
        }
        settings.during_rest |= self.metronome_rest;
        settings.always |= self.metronome_always;
        settings.enabled.then_some(settings)
    }
}

impl RunSource {
    fn into_config(self, metronome: Option<MetronomeSettings>) -> Result<TimerConfig, String> {
        let config = match self {
            RunSource::File { path } => {
                let text = commands::read_source(&path)?;
                commands::custom_config(&text, metronome)
            }
            RunSource::Preset { name } => commands::preset_config(&name, metronome)?,
            RunSource::Intervals {
                work,
                rest,
                rounds,
                bookends,
            } => TimerConfig::Intervals(IntervalsConfig {
                work: parse_time_duration(&work),
                rest: parse_time_duration(&rest),
                rounds,
                warmup: parse_time_duration(&bookends.warmup),
                cooldown: parse_time_duration(&bookends.cooldown),
                metronome,
            }),
            RunSource::Emom { rounds, bookends } => TimerConfig::Emom(EmomConfig {
                rounds,
                warmup: parse_time_duration(&bookends.warmup),
                cooldown: parse_time_duration(&bookends.cooldown),
                metronome,
            }),
            RunSource::Amrap { cap, bookends } => {
                TimerConfig::Amrap(capped(&cap, &bookends, metronome))
            }
            RunSource::Fortime { cap, bookends } => {
                TimerConfig::ForTime(capped(&cap, &bookends, metronome))
            }
            RunSource::Countdown { duration } => TimerConfig::Countdown(CountdownConfig {
                duration: parse_time_duration(&duration),
                metronome,
            }),
            RunSource::Stopwatch => TimerConfig::Stopwatch(StopwatchConfig { metronome }),
        };
        Ok(config)
    }
}

fn capped(cap: &str, bookends: &Bookends, metronome: Option<MetronomeSettings>) -> CappedConfig {
    CappedConfig {
        time_cap: parse_time_duration(cap),
        warmup: parse_time_duration(&bookends.warmup),
        cooldown: parse_time_duration(&bookends.cooldown),
        metronome,
    }
}
