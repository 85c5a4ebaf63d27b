mod clock;
mod driver;
mod engine;

pub use clock::{now_ms, Clock, ManualClock, SystemClock};
pub use driver::{TimerCommand, TimerDriver, TimerHandle, DEFAULT_TICK_INTERVAL};
pub use engine::{format_clock, Phase, PhaseDurations, StudySubject, TimerEngine, TimerState};
