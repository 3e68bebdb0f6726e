use clap::{Parser, Subcommand, ValueEnum};
use ease_core::audio::{DEFAULT_BINAURAL_BASE_HZ, DEFAULT_BINAURAL_BEAT_HZ, PAIN_RELIEF_SEQUENCE};
use ease_core::config::{journal_path_in, AudioConfig};
use ease_core::journal::{load_recent_records, JsonlJournal, RecordSink, RunOutcome, SessionRecord};
use ease_core::*;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "painease")]
#[command(about = "Guided pain-relief exercise sessions and therapeutic audio", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in programs
    Programs,

    /// Run a guided program, printing each lifecycle event
    Run {
        /// Program id (see `painease programs`)
        program_id: String,

        /// Skip the waiting - fire every step immediately
        #[arg(long)]
        instant: bool,

        /// Clock multiplier when running in real time
        #[arg(long, default_value_t = 1.0)]
        speed: f64,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,

        /// Don't record the outcome in the journal
        #[arg(long)]
        no_journal: bool,

        /// Stop the run after this many seconds of session time
        #[arg(long)]
        stop_after: Option<u64>,
    },

    /// List healing tones and nature sounds
    Tones,

    /// Render an audio session to a WAV file
    Render {
        /// What to render
        #[arg(value_enum)]
        source: RenderSource,

        /// Tone label (e.g. 528Hz) for `tone`, or rain/ocean/forest for `nature`
        name: Option<String>,

        /// Binaural base frequency (Hz)
        #[arg(long, default_value_t = DEFAULT_BINAURAL_BASE_HZ)]
        base: f32,

        /// Binaural beat frequency (Hz)
        #[arg(long, default_value_t = DEFAULT_BINAURAL_BEAT_HZ)]
        beat: f32,

        /// Seconds of audio to render
        #[arg(long, default_value_t = 10.0)]
        seconds: f64,

        /// Output WAV path
        #[arg(long)]
        out: PathBuf,

        /// Override the configured sample rate
        #[arg(long)]
        sample_rate: Option<u32>,

        /// Fixed noise seed for reproducible nature sounds
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Play an audio session on the default output device
    #[cfg(feature = "cpal-output")]
    Play {
        #[arg(value_enum)]
        source: RenderSource,

        name: Option<String>,

        #[arg(long, default_value_t = DEFAULT_BINAURAL_BASE_HZ)]
        base: f32,

        #[arg(long, default_value_t = DEFAULT_BINAURAL_BEAT_HZ)]
        beat: f32,

        #[arg(long, default_value_t = audio::DEFAULT_SESSION_SECONDS)]
        seconds: f64,
    },

    /// Show journaled runs
    History {
        /// Window in days
        #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(i64).range(0..))]
        days: i64,

        /// Print records as JSON lines
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RenderSource {
    Tone,
    Binaural,
    Nature,
    Relief,
}

fn main() -> Result<()> {
    // Initialize logging
    ease_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());

    match cli.command {
        Commands::Programs => cmd_programs(),
        Commands::Run {
            program_id,
            instant,
            speed,
            json,
            no_journal,
            stop_after,
        } => cmd_run(
            &data_dir,
            &config,
            &program_id,
            RunOptions {
                instant,
                speed,
                json,
                journal: !no_journal,
                stop_after: stop_after.map(Duration::from_secs),
            },
        ),
        Commands::Tones => cmd_tones(),
        Commands::Render {
            source,
            name,
            base,
            beat,
            seconds,
            out,
            sample_rate,
            seed,
        } => {
            let mut audio = config.audio.clone();
            if let Some(rate) = sample_rate {
                audio.sample_rate = rate;
            }
            if seed.is_some() {
                audio.noise_seed = seed;
            }
            let request = PlayRequest {
                source,
                name,
                base,
                beat,
                seconds,
            };
            cmd_render(audio, &request, &out)
        }
        #[cfg(feature = "cpal-output")]
        Commands::Play {
            source,
            name,
            base,
            beat,
            seconds,
        } => cmd_play(
            config.audio.clone(),
            &PlayRequest {
                source,
                name,
                base,
                beat,
                seconds,
            },
        ),
        Commands::History { days, json } => cmd_history(&data_dir, days, json),
    }
}

fn load_catalog() -> Result<&'static SessionCatalog> {
    let catalog = get_default_catalog();
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }
    Ok(catalog)
}

fn cmd_programs() -> Result<()> {
    let catalog = load_catalog()?;
    for program in catalog.list() {
        println!(
            "{:<22} {:<22} {:<13} {:>3} min  {} exercises",
            program.id,
            program.name,
            program.difficulty.to_string(),
            program.duration_minutes,
            program.exercises.len()
        );
    }
    Ok(())
}

const MIN_SPEED: f64 = 0.01;
const MAX_SPEED: f64 = 1000.0;

struct RunOptions {
    instant: bool,
    speed: f64,
    json: bool,
    journal: bool,
    stop_after: Option<Duration>,
}

fn cmd_run(data_dir: &Path, config: &Config, program_id: &str, options: RunOptions) -> Result<()> {
    if !options.instant && !(MIN_SPEED..=MAX_SPEED).contains(&options.speed) {
        return Err(Error::Config(format!(
            "--speed must be between {} and {}, got {}",
            MIN_SPEED, MAX_SPEED, options.speed
        )));
    }

    let catalog = load_catalog()?;
    let mut runtime = SessionRuntime::with_config(config.runtime.clone());

    let json = options.json;
    runtime.subscribe(move |event| print_event(event, json));

    let outcome: Rc<RefCell<Option<SessionEvent>>> = Rc::new(RefCell::new(None));
    let terminal = Rc::clone(&outcome);
    runtime.subscribe(move |event| {
        if event.is_terminal() {
            *terminal.borrow_mut() = Some(event.clone());
        }
    });

    let Some(run_id) = runtime.start_program(catalog, program_id) else {
        eprintln!("Unknown program: {}", program_id);
        eprintln!("Run `painease programs` to see what's available.");
        return Err(Error::Other(format!("Unknown program: {}", program_id)));
    };

    while let Some(deadline) = runtime.next_deadline() {
        if let Some(limit) = options.stop_after {
            if deadline > limit {
                wait(&options, limit.saturating_sub(runtime.now()))?;
                runtime.advance(limit.saturating_sub(runtime.now()));
                runtime.stop_session();
                break;
            }
        }
        let elapsed = deadline.saturating_sub(runtime.now());
        wait(&options, elapsed)?;
        runtime.advance(elapsed);
    }

    runtime.remove_all_listeners();

    let Some(program) = catalog.program(program_id) else {
        return Ok(());
    };
    let record = match outcome.borrow_mut().take() {
        Some(SessionEvent::SessionCompleted {
            metrics,
            achievement,
            ..
        }) => SessionRecord::completed(run_id, program, metrics, achievement),
        Some(SessionEvent::SessionStopped { metrics }) => {
            SessionRecord::stopped(run_id, program, metrics)
        }
        _ => return Ok(()),
    };

    if options.journal {
        let path = journal_path_in(data_dir);
        let mut journal = JsonlJournal::new(&path);
        journal.append(&record)?;
        if !options.json {
            println!("\n✓ Session journaled");
        }
    }

    Ok(())
}

fn wait(options: &RunOptions, elapsed: Duration) -> Result<()> {
    if options.instant || elapsed.is_zero() {
        return Ok(());
    }
    let scaled = Duration::try_from_secs_f64(elapsed.as_secs_f64() / options.speed)
        .map_err(|e| Error::Config(format!("Cannot wait at speed {}: {}", options.speed, e)))?;
    std::thread::sleep(scaled);
    Ok(())
}

fn print_event(event: &SessionEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!("Failed to serialize event: {}", e),
        }
        return;
    }

    match event {
        SessionEvent::SessionStarted { program, .. } => {
            println!("\n╭─────────────────────────────────────────╮");
            println!("│  {}", program.name.to_uppercase());
            println!("╰─────────────────────────────────────────╯");
            println!("  {}", program.description);
            println!(
                "  {} exercises, about {} min",
                program.exercises.len(),
                program.duration_minutes
            );
        }
        SessionEvent::ExerciseStarted {
            exercise,
            index,
            total,
        } => {
            println!();
            println!("[{}/{}] {}", index + 1, total, exercise.name);
            println!("  {}", exercise.instructions);
        }
        SessionEvent::ExerciseStep { step, .. } => {
            let breathing = step
                .breathing
                .map(|b| format!("  (breathing: {})", format!("{:?}", b).to_lowercase()))
                .unwrap_or_default();
            println!(
                "  → {:<11} {:>3}s  {}{}",
                format!("{:?}", step.kind).to_lowercase(),
                step.duration_seconds,
                step.instruction,
                breathing
            );
        }
        SessionEvent::ExerciseCompleted {
            exercise, metrics, ..
        } => {
            println!(
                "  ✓ {} done ({:.2} kcal so far)",
                exercise.name, metrics.calories_estimate
            );
        }
        SessionEvent::SessionPaused => println!("  ‖ Paused"),
        SessionEvent::SessionResumed => println!("  ▶ Resumed"),
        SessionEvent::SessionStopped { metrics } => {
            println!();
            println!(
                "■ Session stopped after {} exercises ({:.1} min)",
                metrics.exercises_completed,
                metrics.total_minutes()
            );
        }
        SessionEvent::SessionCompleted {
            metrics,
            achievement,
            ..
        } => {
            println!();
            println!("✓ Session complete!");
            println!("  Exercises:      {}", metrics.exercises_completed);
            println!("  Duration:       {:.1} min", metrics.total_minutes());
            println!("  Calories:       {:.2} kcal", metrics.calories_estimate);
            println!("  Pain reduction: ~{}%", metrics.pain_reduction_estimate);
            println!(
                "  🏆 {}: {} (+{} points)",
                achievement.title, achievement.description, achievement.points
            );
        }
    }
}

fn cmd_tones() -> Result<()> {
    println!("Healing tones:");
    for tone in HealingTone::ALL {
        println!("  {:<6} {:>5.0} Hz  {}", tone.label(), tone.frequency(), tone.purpose());
    }

    println!();
    println!("Nature sounds:");
    for sound in NatureSound::ALL {
        println!("  {}", sound);
    }

    println!();
    println!("Pain relief sequence:");
    for (tone, seconds) in PAIN_RELIEF_SEQUENCE {
        println!("  {:<6} {:>4}s", tone.label(), seconds);
    }
    Ok(())
}

struct PlayRequest {
    source: RenderSource,
    name: Option<String>,
    base: f32,
    beat: f32,
    seconds: f64,
}

impl PlayRequest {
    fn start(&self, engine: &mut AudioEngine) -> Result<SessionHandle> {
        let handle = match self.source {
            RenderSource::Tone => {
                engine.play_healing_frequency(self.name.as_deref().unwrap_or("528Hz"), self.seconds)
            }
            RenderSource::Binaural => {
                engine.play_binaural_beats(self.base, self.beat, self.seconds)
            }
            RenderSource::Nature => {
                engine.play_nature_sounds(self.name.as_deref().unwrap_or("rain"), self.seconds)
            }
            RenderSource::Relief => engine.play_pain_relief_sequence(),
        };
        handle.ok_or_else(|| {
            Error::Other(format!(
                "Nothing to play for {:?} {}",
                self.source,
                self.name.as_deref().unwrap_or("")
            ))
        })
    }

    fn validate(&self) -> Result<()> {
        if !(self.seconds > 0.0 && self.seconds.is_finite()) {
            return Err(Error::Config(format!(
                "--seconds must be positive, got {}",
                self.seconds
            )));
        }
        Ok(())
    }
}

fn cmd_render(audio: AudioConfig, request: &PlayRequest, out: &Path) -> Result<()> {
    request.validate()?;

    let mut engine = AudioEngine::offline(audio);
    if !engine.initialize() {
        return Err(Error::AudioDevice("Offline device could not be opened".into()));
    }
    let handle = request.start(&mut engine)?;

    let rate = engine.config().sample_rate;
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(out, spec)?;

    let total_frames = (request.seconds * f64::from(rate)).round() as usize;
    let block_frames = (rate as usize / 100).max(1);
    let mut block = vec![0.0_f32; block_frames * 2];
    let mut rendered = 0;

    // Engine time follows the rendered audio, block by block
    while rendered < total_frames {
        let frames = block_frames.min(total_frames - rendered);
        let samples = &mut block[..frames * 2];
        engine.render(samples);
        for sample in samples.iter() {
            writer.write_sample(*sample)?;
        }
        rendered += frames;
        engine.advance(Duration::from_secs_f64(frames as f64 / f64::from(rate)));
    }

    writer.finalize()?;
    engine.shutdown();

    println!(
        "✓ Rendered {:.1}s ({}) to {}",
        request.seconds,
        handle,
        out.display()
    );
    Ok(())
}

#[cfg(feature = "cpal-output")]
fn cmd_play(audio: AudioConfig, request: &PlayRequest) -> Result<()> {
    request.validate()?;

    let mut engine = AudioEngine::with_default_output(audio);
    if !engine.initialize() {
        return Err(Error::AudioDevice("No audio output available".into()));
    }
    engine.resume_context();
    let handle = request.start(&mut engine)?;
    println!("▶ Playing {} (Ctrl-C to stop)", handle);

    let tick = Duration::from_millis(50);
    while engine.is_live(handle) {
        std::thread::sleep(tick);
        engine.advance(tick);
    }
    // Let the fade-out finish before closing the device
    while engine.next_deadline().is_some() {
        std::thread::sleep(tick);
        engine.advance(tick);
    }
    engine.shutdown();
    Ok(())
}

fn cmd_history(data_dir: &Path, days: i64, json: bool) -> Result<()> {
    let path = journal_path_in(data_dir);
    let records = load_recent_records(&path, days)?;

    if records.is_empty() {
        if !json {
            println!("No sessions in the last {} days.", days);
        }
        return Ok(());
    }

    for record in &records {
        if json {
            println!("{}", serde_json::to_string(record)?);
            continue;
        }
        let outcome = match record.outcome {
            RunOutcome::Completed => "completed",
            RunOutcome::Stopped => "stopped",
        };
        println!(
            "{}  {:<22} {:<9} {} exercises  {:.2} kcal  ~{}%",
            record
                .recorded_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M"),
            record.program_name,
            outcome,
            record.metrics.exercises_completed,
            record.metrics.calories_estimate,
            record.metrics.pain_reduction_estimate
        );
    }
    Ok(())
}
