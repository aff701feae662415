use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

use chanchito::action::{FinanceClient, Narrator};
use chanchito::button::{ButtonDebouncer, ButtonInput};
use chanchito::face::{LogFace, SerialFace};
use chanchito::sensor::NoSensor;
use chanchito::voice::{AudioPlayback, Speaker, SpeechOutput, TextToSpeech};
use chanchito::{
    Action, BalanceAnnouncer, Config, FaceStatus, GestureDetector, GyroSource, LogAction, Sampler,
    StatusSink, TriggerMode, replay,
};

/// Chanchito - a piggy bank that tells you your last movement when shaken
#[derive(Parser)]
#[command(name = "chanchito", version, about)]
struct Cli {
    /// Config file (defaults to ~/.config/chanchito/config.toml)
    #[arg(short, long, env = "CHANCHITO_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Which inputs trigger the announcement (gesture, button, both)
    #[arg(long)]
    trigger: Option<TriggerMode>,

    /// Log triggers instead of querying the backend and speaking
    #[arg(long)]
    dry_run: bool,

    /// Don't drive the serial face display
    #[arg(long)]
    no_face: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print gyro magnitudes
    TestSensor {
        /// Duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,
        /// Also write the readings to a JSON-lines recording
        #[arg(short, long)]
        record: Option<PathBuf>,
    },
    /// Send a status code to the face display
    TestFace {
        /// 0 = off, 1 = normal, 3 = processing
        code: u8,
    },
    /// Report button presses
    TestButton {
        /// Duration in seconds
        #[arg(short, long, default_value = "30")]
        duration: u64,
    },
    /// Speak a phrase through TTS and the speaker
    Say {
        /// Text to speak
        #[arg(default_value = "¡Oink! Hola, soy tu chanchito.")]
        text: String,
    },
    /// Run a recording through the gesture detector
    Replay {
        /// JSON-lines recording
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity; RUST_LOG wins when set
    let filter = match cli.verbose {
        0 => "info",
        1 => "info,chanchito=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(trigger) = cli.trigger {
        config.trigger = trigger;
    }
    if cli.no_face {
        config.face.enabled = false;
    }

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestSensor { duration, record } => {
                test_sensor(&config, duration, record.as_deref()).await
            }
            Command::TestFace { code } => test_face(&config, code),
            Command::TestButton { duration } => test_button(&config, duration).await,
            Command::Say { text } => say(&config, &text).await,
            Command::Replay { file } => replay_file(&config, &file),
        };
    }

    tracing::info!(
        trigger = %config.trigger,
        dry_run = cli.dry_run,
        face = config.face.enabled,
        "starting chanchito"
    );
    tracing::debug!(
        interval_ms = config.sampler.interval.as_millis(),
        high = config.gesture.high_threshold(),
        low = config.gesture.low_threshold(),
        "loaded configuration"
    );

    let source: Box<dyn GyroSource> = if config.trigger.uses_gesture() {
        open_sensor(&config)?
    } else {
        Box::new(NoSensor)
    };

    let action: Box<dyn Action> = if cli.dry_run {
        Box::new(LogAction)
    } else {
        Box::new(build_announcer(&config)?)
    };

    let mut sampler = Sampler::new(
        GestureDetector::new(config.gesture),
        source,
        open_face(&config),
        action,
    )
    .with_interval(config.sampler.interval)
    .with_trigger_mode(config.trigger);

    if config.trigger.uses_button() {
        sampler = sampler.with_button(
            open_button(&config)?,
            ButtonDebouncer::new(config.button.debounce),
        );
    }

    let report = sampler.run(shutdown_signal()).await;
    tracing::debug!(?report, "final report");

    Ok(())
}

/// Resolves on Ctrl-C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
}

fn open_face(config: &Config) -> Box<dyn StatusSink> {
    if config.face.enabled {
        Box::new(
            SerialFace::new(config.face.port.clone(), config.face.baud)
                .with_boot_delay(config.face.boot_delay),
        )
    } else {
        Box::new(LogFace)
    }
}

#[cfg(feature = "rpi")]
fn open_sensor(config: &Config) -> anyhow::Result<Box<dyn GyroSource>> {
    let sensor =
        chanchito::sensor::Mpu6050::new(config.sampler.i2c_bus, config.sampler.i2c_address)?;
    Ok(Box::new(sensor))
}

#[cfg(not(feature = "rpi"))]
fn open_sensor(_config: &Config) -> anyhow::Result<Box<dyn GyroSource>> {
    anyhow::bail!("built without the `rpi` feature, gyro sensor unavailable")
}

#[cfg(feature = "rpi")]
fn open_button(config: &Config) -> anyhow::Result<Box<dyn ButtonInput>> {
    let button = chanchito::button::GpioButton::new(config.button.pin)?;
    Ok(Box::new(button))
}

#[cfg(not(feature = "rpi"))]
fn open_button(_config: &Config) -> anyhow::Result<Box<dyn ButtonInput>> {
    anyhow::bail!("built without the `rpi` feature, push button unavailable")
}

fn build_tts(config: &Config) -> anyhow::Result<TextToSpeech> {
    let api_key = config
        .openai
        .api_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY is not set"))?;

    Ok(TextToSpeech::new(
        api_key,
        config.openai.tts_model.clone(),
        config.openai.tts_voice.clone(),
        config.openai.tts_speed,
        config.openai.tts_timeout,
    )?)
}

fn open_playback() -> anyhow::Result<AudioPlayback> {
    AudioPlayback::new().map_err(|e| {
        anyhow::anyhow!("speaker unavailable ({e}); build with `--features audio` or use --dry-run")
    })
}

fn build_announcer(config: &Config) -> anyhow::Result<BalanceAnnouncer> {
    let function_url = config
        .backend
        .function_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("SUPABASE_FUNCTION_URL is not set"))?;
    let user_id = config
        .backend
        .user_id
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("USUARIO_ID is not set"))?;

    let finance = FinanceClient::new(function_url, user_id, config.backend.timeout)?;
    let speaker = SpeechOutput::new(build_tts(config)?, open_playback()?);
    let narrator = Narrator::new(
        config.openai.api_key.clone().unwrap_or_default(),
        config.openai.chat_model.clone(),
        config.openai.max_tokens,
        config.openai.chat_timeout,
    )?;

    Ok(BalanceAnnouncer::new(finance, narrator, Box::new(speaker)))
}

/// Print gyro magnitudes, optionally recording them
#[allow(clippy::future_not_send)]
async fn test_sensor(config: &Config, duration: u64, record: Option<&Path>) -> anyhow::Result<()> {
    println!("Reading gyro for {duration} seconds...");
    println!("Shake the piggy bank!\n");

    let mut sensor = open_sensor(config)?;
    let mut recorder = record
        .map(|path| File::create(path).map(BufWriter::new))
        .transpose()?;

    let high = config.gesture.high_threshold();
    let low = config.gesture.low_threshold();
    println!("Thresholds: high > {high:.0} °/s, low < {low:.0} °/s");
    println!("---");

    let origin = Instant::now();
    let end = Duration::from_secs(duration);
    let mut ticker = tokio::time::interval(config.sampler.interval);

    while origin.elapsed() < end {
        ticker.tick().await;
        let at = origin.elapsed();

        let reading = match sensor.read_gyro() {
            Ok(reading) => reading,
            Err(e) => {
                println!("[{:6.2}s] read failed: {e}", at.as_secs_f64());
                continue;
            }
        };

        if let Some(writer) = recorder.as_mut() {
            replay::write_sample(writer, at, &reading)?;
        }

        let magnitude = reading.magnitude();
        let marker = if magnitude > high {
            "PEAK"
        } else if magnitude < low {
            "calm"
        } else {
            ""
        };

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (magnitude / 10.0).clamp(0.0, 50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:6.2}s] |m| = {:7.1} [{}] {}",
            at.as_secs_f64(),
            magnitude,
            meter,
            marker
        );
    }

    if let Some(mut writer) = recorder {
        writer.flush()?;
    }
    if let Some(path) = record {
        println!("\nRecording written to {}", path.display());
    }

    Ok(())
}

/// Send one status code to the face
fn test_face(config: &Config, code: u8) -> anyhow::Result<()> {
    let status = FaceStatus::from_code(code)
        .ok_or_else(|| anyhow::anyhow!("unknown face code {code} (expected 0, 1 or 3)"))?;

    let mut face = SerialFace::new(config.face.port.clone(), config.face.baud)
        .with_boot_delay(config.face.boot_delay);
    println!("Sending {status} ({code}) to {}...", face.path());
    face.send(status)?;
    println!("Done. The face should now show: {status}");

    Ok(())
}

/// Report debounced button presses
#[allow(clippy::future_not_send)]
async fn test_button(config: &Config, duration: u64) -> anyhow::Result<()> {
    println!(
        "Watching GPIO {} for {duration} seconds. Press the button!\n",
        config.button.pin
    );

    let mut button = open_button(config)?;
    let mut debouncer = ButtonDebouncer::new(config.button.debounce);

    let origin = Instant::now();
    let end = Duration::from_secs(duration);
    let mut ticker = tokio::time::interval(Duration::from_millis(10));
    let mut presses = 0u32;

    while origin.elapsed() < end {
        ticker.tick().await;
        let at = origin.elapsed();
        if debouncer.update(button.is_pressed()?, at) {
            presses += 1;
            println!("[{:6.2}s] press #{presses}", at.as_secs_f64());
        }
    }

    println!("\n---");
    println!("{presses} press(es) detected");
    Ok(())
}

/// Speak a phrase
#[allow(clippy::future_not_send)]
async fn say(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Synthesizing: \"{text}\"");

    let speaker = SpeechOutput::new(build_tts(config)?, open_playback()?);
    speaker.speak(text).await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");
    Ok(())
}

/// Replay a recording and print what the detector saw
fn replay_file(config: &Config, path: &Path) -> anyhow::Result<()> {
    let reader = BufReader::new(File::open(path)?);
    let samples = replay::read_samples(reader)?;
    let report = replay::replay(config.gesture, &samples);

    println!(
        "{} samples, high > {}, low < {}, window {} ms",
        samples.len(),
        config.gesture.high_threshold(),
        config.gesture.low_threshold(),
        config.gesture.max_window().as_millis()
    );
    println!("---");

    for (i, event) in report.matches.iter().enumerate() {
        println!(
            "#{:<3} {:8.3}s -> {:8.3}s ({} ms)",
            i + 1,
            event.started_at.as_secs_f64(),
            event.completed_at.as_secs_f64(),
            event.duration().as_millis()
        );
    }

    let stats = report.stats;
    println!("---");
    println!(
        "matches: {}  armed: {}  timeouts: {}  ignored: {}",
        stats.matches, stats.armed, stats.timeouts, stats.ignored
    );
    Ok(())
}
