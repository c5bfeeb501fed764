// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use smfplay::config::{LoggingConfig, PlayerConfig};
use smfplay::control::{Console, ControlAction, Flow, KeyboardController};
use smfplay::sequencer::{PlaybackReport, Player, Sequence, Timeline};
use smfplay::timing::TempoMap;
use tracing::Level;

/// Config file picked up from the working directory when --config is absent
const DEFAULT_CONFIG: &str = "smfplay.yaml";

fn print_usage() {
    println!("SMFPLAY - Standard MIDI File player");
    println!();
    println!("Usage: smfplay [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --list-midi             List available MIDI destinations (outputs)");
    println!("  --play <FILE>           Play a MIDI file");
    println!("  --menu <DIR>            Choose MIDI files to play from a directory");
    println!("  --info <FILE>           Print division, tracks, length and tempo of a file");
    println!("  --help                  Show this help message");
    println!();
    println!("Playback options (with --play and --menu):");
    println!("  --config <FILE>         Player configuration (default: ./{})", DEFAULT_CONFIG);
    println!("  --device <NAME>         Output port name, overrides the config");
    println!("  --dry-run               Log messages instead of opening a device");
    println!("  --verbose               Debug logging");
}

/// Options shared by --play and --menu
#[derive(Debug, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    device: Option<String>,
    dry_run: bool,
    verbose: bool,
}

impl CliOptions {
    fn parse(args: &[String]) -> Result<Self> {
        let mut options = Self::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--config" => {
                    let path = iter.next().context("--config requires a file")?;
                    options.config = Some(PathBuf::from(path));
                }
                "--device" => {
                    let name = iter.next().context("--device requires a port name")?;
                    options.device = Some(name.clone());
                }
                "--dry-run" => options.dry_run = true,
                "--verbose" | "-v" => options.verbose = true,
                other => bail!("Unknown option: {}", other),
            }
        }
        Ok(options)
    }

    /// Load the config file and apply command-line overrides
    fn load_config(&self) -> Result<PlayerConfig> {
        let mut config = match &self.config {
            Some(path) => PlayerConfig::load(path)?,
            None if Path::new(DEFAULT_CONFIG).exists() => PlayerConfig::load(DEFAULT_CONFIG)?,
            None => PlayerConfig::default(),
        };
        if let Some(device) = &self.device {
            config.midi.device = device.clone();
        }
        if self.dry_run {
            config.midi.dry_run = true;
        }
        Ok(config)
    }
}

/// Install the tracing subscriber.
///
/// While the console owns the terminal, logs go to the configured file so
/// they do not break the raw-mode status line.
fn init_logging(config: &LoggingConfig, verbose: bool, interactive: bool) -> Result<()> {
    let level = if verbose {
        Level::DEBUG
    } else {
        Level::from_str(&config.level).unwrap_or(Level::INFO)
    };

    if interactive {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.file)
            .with_context(|| format!("Failed to open log file: {:?}", config.file))?;
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(io::stderr)
            .init();
    }
    Ok(())
}

fn setup(options: &CliOptions, interactive: bool) -> Result<(Player, KeyboardController)> {
    let config = options.load_config()?;
    init_logging(&config.logging, options.verbose, interactive)?;

    let mut keyboard = KeyboardController::with_defaults();
    keyboard.apply_overrides(&config.keyboard)?;

    let player = Player::new(config.output_target(), config.playback_options());
    Ok((player, keyboard))
}

fn print_report(report: &PlaybackReport) {
    let outcome = if report.completed { "finished" } else { "stopped" };
    println!(
        "Song {} after {:.1}s ({} messages sent, {} notes released)",
        outcome,
        report.elapsed.as_secs_f64(),
        report.messages_sent,
        report.notes_released
    );
    if report.invalid_controls > 0 || report.send_errors > 0 {
        println!(
            "  {} invalid control changes skipped, {} send errors",
            report.invalid_controls, report.send_errors
        );
    }
}

fn play(path: &Path, options: &CliOptions) -> Result<()> {
    let interactive = io::stdin().is_terminal();
    let (mut player, keyboard) = setup(options, interactive)?;

    player
        .play_file(path)
        .with_context(|| format!("Failed to play {:?}", path))?;
    println!("Playing {}", path.display());

    if interactive {
        Console::new(keyboard).run(&mut player)?;
    }
    if let Some(report) = player.wait() {
        print_report(&report);
    }
    Ok(())
}

/// `*.mid` files in `dir`, sorted by name
fn midi_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {:?}", dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("mid") || ext.eq_ignore_ascii_case("midi"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

fn menu(dir: &Path, options: &CliOptions) -> Result<()> {
    let (mut player, keyboard) = setup(options, true)?;
    let console = Console::new(keyboard);
    let stdin = io::stdin();

    loop {
        let files = midi_files(dir)?;
        if files.is_empty() {
            println!("No MIDI files found in {}", dir.display());
            return Ok(());
        }

        println!();
        for (i, file) in files.iter().enumerate() {
            let name = file.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            println!("  {:>3}. {}", i + 1, name);
        }
        print!("Select a file (q to quit): ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let choice = line.trim();
        if choice.eq_ignore_ascii_case("q") {
            break;
        }

        let Some(path) = choice
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| files.get(i))
        else {
            println!("Invalid selection: {}", choice);
            continue;
        };

        if let Err(e) = ControlAction::PlayFile(path.clone()).apply(&mut player) {
            println!("Could not play {}: {}", path.display(), e);
            continue;
        }
        println!("Playing {}", path.display());

        let flow = console.run(&mut player)?;
        if let Some(report) = player.wait() {
            print_report(&report);
        }
        if flow == Flow::Quit {
            break;
        }
    }

    player.stop();
    Ok(())
}

fn info(path: &Path) -> Result<()> {
    let sequence = Sequence::load(path).with_context(|| format!("Failed to load {:?}", path))?;
    let timeline = Timeline::build(&sequence)?;

    let mut tempo = TempoMap::new(timeline.division());
    if let Some(initial) = timeline.initial_tempo() {
        // Zero coerces to the default tempo
        let _ = tempo.set_tempo(initial);
    }

    println!("File:          {}", path.display());
    println!("Division:      {} ticks per quarter note", timeline.division());
    println!("Tracks:        {}", timeline.track_count());
    println!("Events:        {}", timeline.len());
    println!("Length:        {} ticks", timeline.last_tick());
    println!("Initial tempo: {:.1} BPM", tempo.bpm());
    println!(
        "Duration:      {} (at initial tempo)",
        tempo.format_position(timeline.last_tick())
    );
    Ok(())
}

#[cfg(feature = "device")]
fn list_midi() -> Result<()> {
    smfplay::midi::print_destinations()
}

#[cfg(not(feature = "device"))]
fn list_midi() -> Result<()> {
    println!("Built without MIDI device support (enable the `device` feature)");
    Ok(())
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("SMFPLAY - Standard MIDI File player");
        println!("Run with --help for usage information");
        return Ok(());
    }

    match args[1].as_str() {
        "--list-midi" => {
            list_midi()?;
        }
        "--play" => {
            if args.len() < 3 {
                eprintln!("Error: --play requires a MIDI file");
                std::process::exit(1);
            }
            let options = CliOptions::parse(&args[3..])?;
            play(Path::new(&args[2]), &options)?;
        }
        "--menu" => {
            if args.len() < 3 {
                eprintln!("Error: --menu requires a directory");
                std::process::exit(1);
            }
            let options = CliOptions::parse(&args[3..])?;
            menu(Path::new(&args[2]), &options)?;
        }
        "--info" => {
            if args.len() < 3 {
                eprintln!("Error: --info requires a MIDI file");
                std::process::exit(1);
            }
            info(Path::new(&args[2]))?;
        }
        "--help" | "-h" => {
            print_usage();
        }
        _ => {
            eprintln!("Unknown option: {}", args[1]);
            print_usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
