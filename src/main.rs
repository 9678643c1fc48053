//! clicktrack - command-line metronome
//!
//! `clicktrack play` clicks on the default output device and takes text
//! commands on stdin; `clicktrack render` writes the same click track to WAV.

use clap::{Args, Parser, Subcommand};
use clicktrack::audio::voices::DEFAULT_VOICE_COUNT;
use clicktrack::audio::{ExportSettings, OutputEngine, OutputSink, render_metronome};
use clicktrack::dispatch::ChannelGains;
use clicktrack::messaging::{
    Command, CommandConsumer, CommandProducer, TimedCommand, create_command_channel,
    create_playback_channel, push_until_accepted,
};
use clicktrack::{
    ClockSource, EngineSettings, IntervalDriver, Metronome, MetronomeResult, PlaybackSink,
    SoundBank, StartConfig, TickDriver,
};
use ringbuf::traits::{Consumer, Producer};
use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

// Ringbuffer capacity constants
// Playback: a pass emits at most a handful of clicks (look-ahead / shortest
// event interval), 256 leaves room for many passes if the callback stalls.
const PLAYBACK_RINGBUFFER_CAPACITY: usize = 256;
const COMMAND_RINGBUFFER_CAPACITY: usize = 64;
const QUIT_RETRY_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Parser)]
#[command(name = "clicktrack")]
#[command(about = "Look-ahead scheduled metronome", long_about = None)]
struct Cli {
    /// RON settings file (scheduling, tap tempo, volumes, start values)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Click on the default output device; read commands from stdin
    Play {
        #[command(flatten)]
        start: StartArgs,
    },

    /// Render a click track to a WAV file
    Render {
        /// Output WAV file path
        output: PathBuf,

        /// Duration in seconds
        #[arg(short, long, default_value = "10.0")]
        duration: f64,

        /// Sample rate in Hz
        #[arg(short, long, default_value = "48000")]
        sample_rate: u32,

        /// Output channels
        #[arg(long, default_value = "2")]
        channels: u16,

        #[command(flatten)]
        start: StartArgs,
    },
}

/// Overrides for the settings file's start values
#[derive(Args)]
struct StartArgs {
    /// Tempo in beats per minute
    #[arg(short, long)]
    bpm: Option<f64>,

    /// Beats per measure
    #[arg(long)]
    beats: Option<u32>,

    /// Clicks per beat
    #[arg(long)]
    sub: Option<u32>,

    /// Disable the accent on beat 1
    #[arg(long)]
    no_accent: bool,
}

impl StartArgs {
    fn apply(&self, mut config: StartConfig) -> StartConfig {
        if let Some(bpm) = self.bpm {
            config.bpm = bpm;
        }
        if let Some(beats) = self.beats {
            config.beats_per_measure = beats;
        }
        if let Some(sub) = self.sub {
            config.subdivision = sub;
        }
        if self.no_accent {
            config.accent_enabled = false;
        }
        config
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> MetronomeResult<()> {
    let settings = match &cli.config {
        Some(path) => EngineSettings::load(path)?,
        None => EngineSettings::default(),
    };

    match cli.command {
        Commands::Play { start } => play(&settings, start.apply(settings.start)),
        Commands::Render {
            output,
            duration,
            sample_rate,
            channels,
            start,
        } => {
            let export = ExportSettings {
                sample_rate,
                channels,
                master_volume: settings.volumes.master_gain(),
            };
            let summary = render_metronome(
                &settings,
                start.apply(settings.start),
                SoundBank::synthesized(sample_rate),
                export,
                duration,
                &output,
            )?;
            log::info!(
                "{} clicks, {} frames written to {}",
                summary.clicks,
                summary.frames,
                output.display()
            );
            Ok(())
        }
    }
}

fn play(settings: &EngineSettings, start: StartConfig) -> MetronomeResult<()> {
    let (playback_tx, playback_rx) = create_playback_channel(PLAYBACK_RINGBUFFER_CAPACITY);
    let gains = ChannelGains::default();
    let engine = OutputEngine::start(playback_rx, DEFAULT_VOICE_COUNT, gains.reader())?;
    engine.set_master_volume(settings.volumes.master_gain());

    let mut metronome = Metronome::with_gains(
        engine.clock(),
        OutputSink::new(playback_tx, engine.sample_rate()),
        IntervalDriver::new(),
        SoundBank::synthesized(engine.sample_rate()),
        gains,
        settings,
    )?;

    let beat_clock = engine.clock();
    metronome.on_beat(move |beat, target_time| {
        let delay_ms = (target_time - beat_clock.now()) * 1000.0;
        log::info!("Beat {} in {:.0} ms", beat, delay_ms);
    });

    let (command_tx, mut command_rx) = create_command_channel(COMMAND_RINGBUFFER_CAPACITY);
    spawn_stdin_reader(command_tx, Instant::now());

    metronome.start(start)?;
    log::info!(
        "Playing {}; commands: start, stop, bpm N, sub N, beats N, accent on|off, vol accent|normal|sub N, tap, quit",
        metronome.transport().tempo()
    );

    let outcome = loop {
        if let Err(e) = engine.ensure_healthy() {
            break Err(e);
        }
        if !drain_commands(&mut metronome, &mut command_rx) {
            break Ok(());
        }
        if !metronome.wait_and_tick() {
            thread::sleep(settings.scheduling.poll_period());
        }
    };

    metronome.stop();
    log::info!("Scheduler stats: {:?}", metronome.stats());
    outcome
}

/// Apply pending host commands; false once `quit` arrives
fn drain_commands<C, P, D>(
    metronome: &mut Metronome<C, P, D>,
    command_rx: &mut CommandConsumer,
) -> bool
where
    C: ClockSource,
    P: PlaybackSink,
    D: TickDriver,
{
    while let Some(TimedCommand {
        command,
        received_ms,
    }) = command_rx.try_pop()
    {
        let result = match command {
            Command::Start => metronome.resume(),
            Command::Stop => {
                metronome.stop();
                Ok(())
            }
            Command::SetBpm(bpm) => metronome.update_bpm(bpm),
            Command::SetSubdivision(subdivision) => metronome.update_subdivision(subdivision),
            Command::SetBeatsPerMeasure(beats) => metronome.update_beats_per_measure(beats),
            Command::SetAccent(enabled) => {
                metronome.set_accent_enabled(enabled);
                Ok(())
            }
            Command::SetVolume { channel, level } => {
                metronome.set_volume(channel, level);
                Ok(())
            }
            Command::Tap => {
                match metronome.tap(received_ms) {
                    Some(bpm) => {
                        log::info!("Tap tempo: {} BPM", bpm);
                        metronome.update_bpm(bpm as f64)
                    }
                    None => Ok(()),
                }
            }
            Command::Quit => return false,
        };

        if let Err(e) = result {
            log::warn!("{:?} rejected: {}", command, e);
        }
    }
    true
}

/// Read stdin lines on a separate thread, stamped with their arrival time
fn spawn_stdin_reader(mut command_tx: CommandProducer, epoch: Instant) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            let received_ms = epoch.elapsed().as_secs_f64() * 1000.0;
            match line.parse::<Command>() {
                Ok(command) => {
                    let timed = TimedCommand {
                        command,
                        received_ms,
                    };
                    if command_tx.try_push(timed).is_err() {
                        log::warn!("Command queue full, ignoring: {}", line.trim());
                    }
                }
                Err(e) => log::warn!("{}", e),
            }
        }

        // End of input quits
        let quit = TimedCommand {
            command: Command::Quit,
            received_ms: epoch.elapsed().as_secs_f64() * 1000.0,
        };
        push_until_accepted(&mut command_tx, quit, QUIT_RETRY_INTERVAL);
    });
}
