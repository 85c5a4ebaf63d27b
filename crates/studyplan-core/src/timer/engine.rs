//! Timer engine implementation.
//!
//! The timer engine is a wall-clock-based state machine alternating between a
//! study phase and a break phase. Remaining time is derived from the moment the
//! countdown began, never from the number of ticks observed, so a host that
//! stopped ticking for a while (a suspended process, a background tab) is
//! correct again on its next call.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!           |
//!           +-- remaining hits 0 --> Idle (next phase)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new();
//! engine.start();
//! // Periodically, and whenever the host becomes visible again:
//! if let Some(event) = engine.tick() { /* display or completion */ }
//! ```
//!
//! Every command has an `_at` variant taking the current Unix time in
//! milliseconds; the plain variant reads the system clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::clock::now_ms;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Study,
    Break,
}

impl Phase {
    /// The phase that follows this one on completion.
    pub fn next(self) -> Phase {
        match self {
            Phase::Study => Phase::Break,
            Phase::Break => Phase::Study,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Study => "Study Session",
            Phase::Break => "Break",
        }
    }
}

/// Preset lengths of the two phases, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDurations {
    pub study_secs: u64,
    pub break_secs: u64,
}

impl PhaseDurations {
    pub const DEFAULT_STUDY_SECS: u64 = 25 * 60;
    pub const DEFAULT_BREAK_SECS: u64 = 5 * 60;

    pub fn for_phase(&self, phase: Phase) -> u64 {
        match phase {
            Phase::Study => self.study_secs,
            Phase::Break => self.break_secs,
        }
    }
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            study_secs: Self::DEFAULT_STUDY_SECS,
            break_secs: Self::DEFAULT_BREAK_SECS,
        }
    }
}

/// What the current study session is about. Carried into `SessionCompleted`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySubject {
    pub discipline_id: Option<String>,
    pub topic: Option<String>,
}

/// Core timer engine.
///
/// Operates on wall-clock deltas -- no internal thread.
/// The caller (usually [`TimerDriver`](super::TimerDriver)) is responsible for
/// calling `tick()` periodically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerEngine {
    durations: PhaseDurations,
    phase: Phase,
    state: TimerState,
    phase_duration_secs: u64,
    /// Authoritative only while idle or paused.
    remaining_secs: u64,
    /// Wall-clock ms at which the running countdown began. After a resume
    /// this is back-dated by the time already consumed.
    #[serde(default)]
    start_epoch_ms: Option<u64>,
    #[serde(default)]
    paused_remaining_secs: Option<u64>,
    #[serde(default)]
    subject: StudySubject,
}

impl TimerEngine {
    /// Create an idle engine in the study phase with the default presets.
    pub fn new() -> Self {
        Self::with_durations(PhaseDurations::default())
    }

    pub fn with_durations(durations: PhaseDurations) -> Self {
        Self {
            durations,
            phase: Phase::Study,
            state: TimerState::Idle,
            phase_duration_secs: durations.study_secs,
            remaining_secs: durations.study_secs,
            start_epoch_ms: None,
            paused_remaining_secs: None,
            subject: StudySubject::default(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state == TimerState::Paused
    }

    pub fn durations(&self) -> PhaseDurations {
        self.durations
    }

    pub fn phase_duration_secs(&self) -> u64 {
        self.phase_duration_secs
    }

    /// Last reconciled remaining time. Use [`remaining_at`](Self::remaining_at)
    /// for the live value while running.
    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn start_epoch_ms(&self) -> Option<u64> {
        self.start_epoch_ms
    }

    pub fn paused_remaining_secs(&self) -> Option<u64> {
        self.paused_remaining_secs
    }

    pub fn subject(&self) -> &StudySubject {
        &self.subject
    }

    /// Remaining seconds as of `now_ms`, without mutating anything.
    ///
    /// Elapsed time is floored to whole seconds. A clock that moved backwards
    /// counts as zero elapsed time.
    pub fn remaining_at(&self, now_ms: u64) -> u64 {
        match (self.state, self.start_epoch_ms) {
            (TimerState::Running, Some(start)) => {
                let elapsed_secs = now_ms.saturating_sub(start) / 1000;
                self.phase_duration_secs.saturating_sub(elapsed_secs)
            }
            _ => self.remaining_secs,
        }
    }

    /// 0.0 .. 100.0 progress within the current phase.
    pub fn progress_pct_at(&self, now_ms: u64) -> f64 {
        if self.phase_duration_secs == 0 {
            return 0.0;
        }
        let remaining = self.remaining_at(now_ms) as f64;
        (1.0 - remaining / self.phase_duration_secs as f64) * 100.0
    }

    pub fn snapshot(&self) -> Event {
        self.snapshot_at(now_ms())
    }

    /// Build a full state snapshot event.
    pub fn snapshot_at(&self, now_ms: u64) -> Event {
        let remaining = self.remaining_at(now_ms);
        Event::StateSnapshot {
            state: self.state,
            phase: self.phase,
            phase_label: self.phase.label().to_string(),
            remaining_secs: remaining,
            phase_duration_secs: self.phase_duration_secs,
            display: format_clock(remaining),
            progress_pct: self.progress_pct_at(now_ms),
            ends_at: self.ends_at(),
            discipline_id: self.subject.discipline_id.clone(),
            topic: self.subject.topic.clone(),
            at: datetime_from_ms(now_ms),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn set_subject(&mut self, subject: StudySubject) {
        self.subject = subject;
    }

    pub fn start(&mut self) -> Option<Event> {
        self.start_at(now_ms())
    }

    /// Begin the countdown, or resume it after a pause. No-op while running.
    pub fn start_at(&mut self, now_ms: u64) -> Option<Event> {
        if self.is_running() {
            return None;
        }

        let resumed = self.paused_remaining_secs.is_some();
        let start = match self.paused_remaining_secs.take() {
            Some(paused_remaining) => {
                let consumed_ms = self
                    .phase_duration_secs
                    .saturating_sub(paused_remaining)
                    .saturating_mul(1000);
                now_ms.saturating_sub(consumed_ms)
            }
            None => now_ms,
        };

        self.start_epoch_ms = Some(start);
        self.state = TimerState::Running;
        self.remaining_secs = self.remaining_at(now_ms);
        debug!(
            phase = ?self.phase,
            remaining_secs = self.remaining_secs,
            resumed,
            "timer started"
        );

        Some(Event::TimerStarted {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            resumed,
            ends_at: self.ends_at().unwrap_or_else(|| datetime_from_ms(now_ms)),
            at: datetime_from_ms(now_ms),
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        self.pause_at(now_ms())
    }

    /// Freeze the countdown. No-op unless running.
    pub fn pause_at(&mut self, now_ms: u64) -> Option<Event> {
        if !self.is_running() {
            return None;
        }

        let remaining = self.remaining_at(now_ms);
        self.remaining_secs = remaining;
        self.paused_remaining_secs = Some(remaining);
        self.state = TimerState::Paused;
        self.start_epoch_ms = None;
        debug!(phase = ?self.phase, remaining_secs = remaining, "timer paused");

        Some(Event::TimerPaused {
            phase: self.phase,
            remaining_secs: remaining,
            at: datetime_from_ms(now_ms),
        })
    }

    pub fn reset(&mut self) -> Option<Event> {
        self.reset_at(now_ms())
    }

    /// Return to idle with the full duration of the current phase.
    /// The phase itself is kept.
    pub fn reset_at(&mut self, now_ms: u64) -> Option<Event> {
        let _ = self.pause_at(now_ms);
        self.remaining_secs = self.phase_duration_secs;
        self.state = TimerState::Idle;
        self.paused_remaining_secs = None;
        self.start_epoch_ms = None;
        debug!(phase = ?self.phase, "timer reset");

        Some(Event::TimerReset {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            at: datetime_from_ms(now_ms),
        })
    }

    pub fn recompute_on_resume(&mut self) -> Option<Event> {
        self.recompute_on_resume_at(now_ms())
    }

    /// Reconcile after the host was suspended or hidden. If the phase ran out
    /// meanwhile, the completion transition runs exactly once here.
    pub fn recompute_on_resume_at(&mut self, now_ms: u64) -> Option<Event> {
        let event = self.reconcile(now_ms);
        if event.is_some() {
            debug!(remaining_secs = self.remaining_secs, "reconciled after resume");
        }
        event
    }

    pub fn tick(&mut self) -> Option<Event> {
        self.tick_at(now_ms())
    }

    /// Periodic recomputation. Returns `TimerTicked` for the display, or the
    /// completion event when the phase ends. `None` unless running.
    pub fn tick_at(&mut self, now_ms: u64) -> Option<Event> {
        self.reconcile(now_ms)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn reconcile(&mut self, now_ms: u64) -> Option<Event> {
        if !self.is_running() {
            return None;
        }

        let remaining = self.remaining_at(now_ms);
        if remaining == 0 {
            self.remaining_secs = 0;
            return Some(self.complete_phase(now_ms));
        }

        self.remaining_secs = remaining;
        Some(Event::TimerTicked {
            phase: self.phase,
            remaining_secs: remaining,
            at: datetime_from_ms(now_ms),
        })
    }

    fn complete_phase(&mut self, now_ms: u64) -> Event {
        let finished = self.phase;
        let at = datetime_from_ms(now_ms);
        let event = match finished {
            Phase::Study => Event::SessionCompleted {
                phase: Phase::Study,
                duration_secs: self.phase_duration_secs,
                discipline_id: self.subject.discipline_id.clone(),
                topic: self.subject.topic.clone(),
                at,
            },
            Phase::Break => Event::BreakCompleted { at },
        };

        self.phase = finished.next();
        self.phase_duration_secs = self.durations.for_phase(self.phase);
        self.remaining_secs = self.phase_duration_secs;
        self.state = TimerState::Idle;
        self.start_epoch_ms = None;
        self.paused_remaining_secs = None;
        info!(finished = ?finished, next = ?self.phase, "phase completed");

        event
    }

    fn ends_at(&self) -> Option<DateTime<Utc>> {
        let start = self.start_epoch_ms?;
        let end = start.saturating_add(self.phase_duration_secs.saturating_mul(1000));
        Some(datetime_from_ms(end))
    }
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Format seconds as `MM:SS`. Minutes are not wrapped into hours.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn datetime_from_ms(ms: u64) -> DateTime<Utc> {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_default()
}
