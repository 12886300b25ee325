use clap::{Parser, Subcommand};
use std::path::PathBuf;
use synthmidi::{analysis, presets, validate_inputs, Config, MidiGenerator};
use tracing_subscriber::EnvFilter;

/// Synthwave MIDI Generator
#[derive(Parser)]
#[command(name = "synthmidi")]
#[command(about = "Generate multi-track MIDI files from text note descriptions")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Track files, one per instrument
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output MIDI file name
    #[arg(short, long)]
    output: Option<String>,

    /// Tempo in BPM
    #[arg(long)]
    tempo: Option<u32>,

    #[command(flatten)]
    common: CommonArgs,

    /// Also write a JSON analysis next to the log
    #[arg(long)]
    analysis_json: bool,
}

#[derive(clap::Args, Clone)]
struct CommonArgs {
    /// Directory for generated files
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Custom configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a built-in melody
    Preset {
        /// Preset name (see `presets`)
        name: String,

        /// Output MIDI file name
        #[arg(short, long)]
        output: Option<String>,

        /// Override the preset's tempo
        #[arg(long)]
        tempo: Option<u32>,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// List built-in melodies
    Presets,
    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config: PathBuf,
    },
    /// Show default configuration
    ShowConfig {
        /// Also save it to this file
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "info"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

/// Load configuration and apply command-line overrides
fn load_config(common: &CommonArgs) -> anyhow::Result<Config> {
    if common.verbose && common.quiet {
        anyhow::bail!("Cannot specify both --verbose and --quiet");
    }
    init_tracing(common.verbose, common.quiet);

    let mut config = if let Some(config_path) = &common.config {
        synthmidi::config::load_config(config_path)?
    } else {
        Config::default()
    };
    if let Some(dir) = &common.output_dir {
        config.export.output_dir = dir.clone();
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            let mut config = load_config(&cli.common)?;
            if cli.analysis_json {
                config.export.analysis_json = true;
            }
            if let Some(tempo) = cli.tempo {
                config.midi.tempo_bpm = tempo;
            }
            synthmidi::config::validate_config(&config)?;

            validate_inputs(&cli.inputs)?;
            let generator = MidiGenerator::new(config);
            let result = generator.generate(&cli.inputs, cli.output.as_deref(), cli.tempo)?;

            if !cli.common.quiet {
                let defaults = &generator.config().track_defaults;
                for (idx, track) in result.tracks.iter().enumerate() {
                    println!(
                        "Track {}: '{}' | {} notes ({} bars) | ch:{} prog:{} vel:{} | rhythm: {:?}",
                        idx + 1,
                        track.name,
                        track.note_count(),
                        track.bar_count(),
                        track.channel,
                        track.program,
                        track.velocity,
                        track.effective_rhythm(defaults)
                    );
                }
                println!("\nTempo: {} BPM | Tracks: {}", result.tempo_bpm, result.tracks.len());
                println!("Done. Saved {}", result.midi_path.display());
                if let Some(log_path) = &result.log_path {
                    println!("Log saved: {}", log_path.display());
                }
                if let Some(analysis_path) = &result.analysis_path {
                    println!("Analysis saved: {}", analysis_path.display());
                }
            }
        }
        Some(Commands::Preset {
            name,
            output,
            tempo,
            common,
        }) => {
            let config = load_config(&common)?;
            synthmidi::config::validate_config(&config)?;
            let generator = MidiGenerator::new(config);
            let path = generator.render_preset(&name, output.as_deref(), tempo)?;
            if !common.quiet {
                println!("Successfully created {}", path.display());
            }
        }
        Some(Commands::Presets) => {
            for preset in presets::all_presets() {
                let key = analysis::detect_scale(&preset.pitches())?;
                println!(
                    "{:<14} {:<20} {}",
                    preset.name,
                    format!("{} {}", key.root_name(), key.scale_name()),
                    preset.description
                );
            }
        }
        Some(Commands::ValidateConfig { config }) => {
            let config = synthmidi::config::load_config(config)?;
            println!("Configuration is valid");
            if let Ok(json) = serde_json::to_string_pretty(&config) {
                println!("{}", json);
            }
        }
        Some(Commands::ShowConfig { save }) => {
            let config = Config::default();
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
            if let Some(path) = save {
                synthmidi::config::save_config(&config, &path)?;
            }
        }
    }

    Ok(())
}
