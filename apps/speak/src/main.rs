//! Command line front end: reads text line by line, synthesizes each line
//! as a phrase and either plays it back with live word-boundary reporting
//! or renders the whole session to a WAV file.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cadence_player::{CpalOutput, Player};
use cadence_spurt::SpurtRegistry;
use cadence_sync::{
    BoundaryEvent, BoundarySink, BoundarySinkRef, LogSink, SyncPoller, SyncPollerConfig,
};
use cadence_synth::{Phrase, PhraseAdapter, ScriptedEngine, SynthesisEngine};
use cadence_timeline::{SessionClock, Timeline};

#[derive(Parser, Debug)]
#[command(name = "cadence-speak", version, about)]
struct Args {
    /// Text file to speak; reads stdin when omitted.
    input: Option<PathBuf>,

    /// Render to a WAV file instead of playing back.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Synthesis sample rate in Hz.
    #[arg(long, default_value_t = 16000)]
    sample_rate: u32,

    /// Nominal duration of each synthesized word in seconds.
    #[arg(long, default_value_t = 0.25)]
    word_duration: f64,

    /// Emit word boundaries as JSON lines on stdout.
    #[arg(short, long)]
    json: bool,
}

/// Prints each boundary as one JSON object per line.
struct JsonSink;

impl BoundarySink for JsonSink {
    fn emit(&self, event: BoundaryEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(err) => tracing::error!(%err, "could not serialize boundary event"),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let engine = ScriptedEngine::new(args.sample_rate, args.word_duration);

    match args.output.clone() {
        Some(path) => render_to_file(&args, engine, &path),
        None => play_live(&args, engine),
    }
}

fn play_live(args: &Args, mut engine: ScriptedEngine) -> anyhow::Result<()> {
    let timeline = Arc::new(Timeline::new());
    let registry = Arc::new(SpurtRegistry::new());
    let clock = Arc::new(SessionClock::new());

    let output = CpalOutput::start(engine.sample_rate(), registry.clone())?;
    let player = Arc::new(output.player());
    let adapter = PhraseAdapter::new(
        timeline.clone(),
        registry.clone(),
        clock.clone(),
        Some(player.clone() as Arc<dyn Player>),
    );

    let sink: BoundarySinkRef = if args.json {
        Arc::new(JsonSink)
    } else {
        Arc::new(LogSink)
    };
    let mut poller = SyncPoller::start(
        timeline.clone(),
        registry,
        player.clone(),
        sink,
        SyncPollerConfig::default(),
    );

    let mut deliver = |phrase: Phrase| {
        if let Err(err) = adapter.on_phrase(&phrase) {
            tracing::error!(%err, "dropping phrase");
        }
    };
    for line in input_lines(args.input.as_deref())? {
        engine.speak(&line?, false, &mut deliver)?;
    }
    engine.speak("", true, &mut deliver)?;

    while player.is_busy() {
        std::thread::sleep(Duration::from_millis(50));
    }
    poller.stop();
    tracing::info!(
        words = timeline.len(),
        seconds = clock.seconds(),
        "playback finished"
    );
    Ok(())
}

fn render_to_file(args: &Args, mut engine: ScriptedEngine, path: &Path) -> anyhow::Result<()> {
    let timeline = Arc::new(Timeline::new());
    let registry = Arc::new(SpurtRegistry::new());
    let clock = Arc::new(SessionClock::new());
    let adapter = PhraseAdapter::new(timeline.clone(), registry, clock.clone(), None);

    let mut samples: Vec<f32> = Vec::new();
    let mut deliver = |phrase: Phrase| {
        if let Err(err) = adapter.on_phrase(&phrase) {
            tracing::error!(%err, "dropping phrase");
        }
        samples.extend_from_slice(&phrase.samples);
    };
    for line in input_lines(args.input.as_deref())? {
        engine.speak(&line?, false, &mut deliver)?;
    }
    engine.speak("", true, &mut deliver)?;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: engine.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("creating {}", path.display()))?;
    for sample in &samples {
        writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;

    if args.json {
        for word in timeline.snapshot() {
            println!("{}", serde_json::to_string(&word)?);
        }
    }
    tracing::info!(
        words = timeline.len(),
        seconds = clock.seconds(),
        path = %path.display(),
        "rendered"
    );
    Ok(())
}

fn input_lines(path: Option<&Path>) -> anyhow::Result<io::Lines<Box<dyn BufRead>>> {
    let reader: Box<dyn BufRead> = match path {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };
    Ok(reader.lines())
}
