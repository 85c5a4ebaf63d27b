use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{Phase, TimerState};

/// Every state change of the timer produces an Event.
/// The display consumes ticks and snapshots; collaborators subscribe to the
/// two completion events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        phase: Phase,
        remaining_secs: u64,
        /// True when continuing after a pause.
        resumed: bool,
        ends_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    TimerPaused {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerTicked {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// A study phase ran to zero. Consumed by the session recorder.
    SessionCompleted {
        phase: Phase,
        duration_secs: u64,
        discipline_id: Option<String>,
        topic: Option<String>,
        at: DateTime<Utc>,
    },
    /// A break ran to zero. Consumed by the notifier.
    BreakCompleted {
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        phase: Phase,
        phase_label: String,
        remaining_secs: u64,
        phase_duration_secs: u64,
        /// `MM:SS`
        display: String,
        progress_pct: f64,
        ends_at: Option<DateTime<Utc>>,
        discipline_id: Option<String>,
        topic: Option<String>,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// True for `SessionCompleted` and `BreakCompleted`.
    pub fn is_phase_completion(&self) -> bool {
        matches!(
            self,
            Event::SessionCompleted { .. } | Event::BreakCompleted { .. }
        )
    }
}
