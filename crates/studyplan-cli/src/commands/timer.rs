use std::error::Error;

use clap::{Args, Subcommand};
use studyplan_core::sessions::{ApiSessionRecorder, EventDispatcher, SessionRecorder, StudySessionRecord};
use studyplan_core::storage::{Config, Database};
use studyplan_core::timer::{format_clock, StudySubject, SystemClock, TimerDriver, TimerEngine};
use studyplan_core::Event;
use tracing::warn;

use crate::notifier::ConsoleNotifier;

const ENGINE_KEY: &str = "timer_engine";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start the countdown, or resume it after a pause
    Start {
        #[command(flatten)]
        subject: SubjectArgs,
    },
    /// Pause the countdown
    Pause,
    /// Return to the full duration of the current phase
    Reset,
    /// Catch up on elapsed time and print current timer state as JSON
    Status,
    /// Count down in the foreground until the current phase completes
    Run {
        #[command(flatten)]
        subject: SubjectArgs,
    },
}

#[derive(Args)]
pub struct SubjectArgs {
    /// Discipline the session counts toward (defaults to the last one studied)
    #[arg(long)]
    discipline: Option<String>,
    /// Free-text topic
    #[arg(long)]
    topic: Option<String>,
}

/// Where completed sessions go: the backend when enabled, else the local log.
enum Recorder<'a> {
    Local(&'a Database),
    Api(ApiSessionRecorder),
}

impl SessionRecorder for Recorder<'_> {
    fn name(&self) -> &str {
        match self {
            Recorder::Local(db) => SessionRecorder::name(*db),
            Recorder::Api(api) => api.name(),
        }
    }

    async fn record(&self, session: &StudySessionRecord) -> studyplan_core::error::Result<i64> {
        match self {
            Recorder::Local(db) => SessionRecorder::record(*db, session).await,
            Recorder::Api(api) => api.record(session).await,
        }
    }

    async fn last_discipline(&self) -> studyplan_core::error::Result<Option<String>> {
        match self {
            Recorder::Local(db) => SessionRecorder::last_discipline(*db).await,
            Recorder::Api(api) => api.last_discipline().await,
        }
    }
}

fn recorder<'a>(config: &Config, db: &'a Database) -> Result<Recorder<'a>, Box<dyn Error>> {
    if config.api.enabled {
        Ok(Recorder::Api(ApiSessionRecorder::from_config(&config.api)?))
    } else {
        Ok(Recorder::Local(db))
    }
}

fn load_engine(db: &Database, config: &Config) -> TimerEngine {
    if let Ok(Some(json)) = db.kv_get(ENGINE_KEY) {
        match serde_json::from_str::<TimerEngine>(&json) {
            Ok(engine) => return engine,
            Err(e) => warn!(error = %e, "discarding unreadable timer state"),
        }
    }
    TimerEngine::with_durations(config.phase_durations())
}

fn save_engine(db: &Database, engine: &TimerEngine) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string(engine)?;
    db.kv_set(ENGINE_KEY, &json)?;
    Ok(())
}

fn print_event(event: &Event) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(event)?);
    Ok(())
}

/// Fill in the session subject from the arguments, keeping what the engine
/// already has and falling back to the most recently studied discipline.
async fn apply_subject(engine: &mut TimerEngine, args: SubjectArgs, recorder: &Recorder<'_>) {
    let current = engine.subject().clone();
    let discipline_id = match args.discipline.or(current.discipline_id) {
        Some(id) => Some(id),
        None => match recorder.last_discipline().await {
            Ok(last) => last,
            Err(e) => {
                warn!(error = %e, "could not look up last studied discipline");
                None
            }
        },
    };
    let topic = args.topic.or(current.topic);
    engine.set_subject(StudySubject {
        discipline_id,
        topic,
    });
}

async fn dispatch(config: &Config, recorder: &Recorder<'_>, event: &Event) {
    let notifier = ConsoleNotifier::new(config.notifications.sound);
    let dispatcher =
        EventDispatcher::new(recorder, notifier).with_notifications(config.notifications.enabled);
    // Failures are logged by the dispatcher; the timer has already moved on.
    let _ = dispatcher.dispatch(event).await;
}

async fn run_foreground(
    engine: TimerEngine,
    config: &Config,
    recorder: &Recorder<'_>,
) -> Result<TimerEngine, Box<dyn Error>> {
    // The handle only keeps the driver alive; the engine is already running.
    let (handle, mut events, join) =
        TimerDriver::spawn(engine, SystemClock, config.tick_interval());

    let mut completion = None;
    let mut last_shown = None;
    while let Some(event) = events.recv().await {
        match &event {
            Event::TimerTicked {
                phase,
                remaining_secs,
                ..
            } => {
                if last_shown != Some(*remaining_secs) {
                    eprint!("\r{} {}  ", phase.label(), format_clock(*remaining_secs));
                    last_shown = Some(*remaining_secs);
                }
            }
            e if e.is_phase_completion() => {
                eprintln!();
                completion = Some(event.clone());
                break;
            }
            _ => {}
        }
    }

    drop(handle);
    let engine = join.await?;
    if let Some(event) = completion {
        print_event(&event)?;
        dispatch(config, recorder, &event).await;
    }
    Ok(engine)
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let recorder = recorder(&config, &db)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let mut engine = load_engine(&db, &config);

    // Each invocation is the host coming back: catch up before acting, so a
    // phase that ran out meanwhile completes (and is recorded) exactly once.
    let mut caught_up = engine
        .recompute_on_resume()
        .filter(Event::is_phase_completion);

    match action {
        TimerAction::Start { subject } => {
            if !engine.is_running() {
                runtime.block_on(apply_subject(&mut engine, subject, &recorder));
            }
            // Already running: report where it is instead.
            let event = engine.start().unwrap_or_else(|| engine.snapshot());
            print_event(&event)?;
        }
        TimerAction::Pause => {
            let event = engine.pause().unwrap_or_else(|| engine.snapshot());
            print_event(&event)?;
        }
        TimerAction::Reset => {
            if let Some(event) = engine.reset() {
                print_event(&event)?;
            }
        }
        TimerAction::Status => {
            print_event(&engine.snapshot())?;
        }
        TimerAction::Run { subject } => {
            if let Some(event) = caught_up.take() {
                print_event(&event)?;
                runtime.block_on(dispatch(&config, &recorder, &event));
            }
            if !engine.is_running() {
                runtime.block_on(apply_subject(&mut engine, subject, &recorder));
            }
            if let Some(event) = engine.start() {
                print_event(&event)?;
            }
            // Persist the running state first so an interrupted countdown
            // can still be picked up by the next invocation.
            save_engine(&db, &engine)?;
            engine = runtime.block_on(run_foreground(engine, &config, &recorder))?;
        }
    }

    save_engine(&db, &engine)?;

    // The command's own output comes first, then any completion it caught up on.
    if let Some(event) = caught_up {
        print_event(&event)?;
        runtime.block_on(dispatch(&config, &recorder, &event));
    }
    Ok(())
}
