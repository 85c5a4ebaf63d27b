//! # studyplan Core Library
//!
//! Core business logic for the study planner's Pomodoro timer. The CLI binary
//! is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine alternating between
//!   study and break phases. Remaining time is recomputed from timestamps, so
//!   it stays correct across suspended or backgrounded hosts.
//! - **Driver**: A single tokio task that owns the engine and runs the
//!   recurring tick while the countdown is running
//! - **Sessions**: Collaborators fed by completion events -- the local session
//!   log, the REST backend and notifiers
//! - **Storage**: SQLite-based session storage and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`TimerDriver`]: Async owner of the engine
//! - [`EventDispatcher`]: Routes completion events to collaborators
//! - [`Database`]: Session and statistics persistence
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod sessions;
pub mod storage;
pub mod timer;

pub use error::{ApiError, ConfigError, CoreError, DatabaseError};
pub use events::Event;
pub use sessions::{
    ApiSessionRecorder, DispatchOutcome, EventDispatcher, Notifier, SessionRecorder,
    StudySessionRecord,
};
pub use storage::{Config, Database, Stats};
pub use timer::{
    Clock, ManualClock, Phase, PhaseDurations, StudySubject, SystemClock, TimerDriver,
    TimerEngine, TimerHandle, TimerState,
};
