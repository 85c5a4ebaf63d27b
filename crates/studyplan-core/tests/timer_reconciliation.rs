//! Integration tests for wall-clock reconciliation of the timer engine.
//!
//! Time is simulated by passing explicit timestamps, so long gaps (a host
//! that was suspended for half an hour) cost nothing to test.

use proptest::prelude::*;
use studyplan_core::{Event, Phase, PhaseDurations, TimerEngine, TimerState};

const T0: u64 = 1_700_000_000_000;

fn at(secs: u64) -> u64 {
    T0 + secs * 1000
}

fn completions(events: &[Event]) -> usize {
    events.iter().filter(|e| e.is_phase_completion()).count()
}

#[test]
fn test_pause_after_running_for_ten_seconds() {
    let mut engine = TimerEngine::new();
    engine.start_at(at(0));
    engine.pause_at(at(10));
    assert_eq!(engine.remaining_secs(), 1490);
}

#[test]
fn test_pause_resume_counts_only_running_time() {
    let mut engine = TimerEngine::new();
    engine.start_at(at(0));
    engine.pause_at(at(10));
    assert_eq!(engine.remaining_secs(), 1490);

    // 50 seconds pass while paused.
    engine.start_at(at(60));
    engine.pause_at(at(70));
    assert_eq!(engine.remaining_secs(), 1480);
}

#[test]
fn test_resume_after_suspend_completes_study_once() {
    let mut engine = TimerEngine::new();
    engine.start_at(at(0));

    let mut events = Vec::new();
    events.extend(engine.recompute_on_resume_at(at(1500)));
    // A second visibility change, and a late tick, must not complete again.
    events.extend(engine.recompute_on_resume_at(at(1501)));
    events.extend(engine.tick_at(at(1502)));

    assert_eq!(completions(&events), 1);
    assert!(matches!(
        events.first(),
        Some(Event::SessionCompleted {
            phase: Phase::Study,
            duration_secs: 1500,
            ..
        })
    ));
    assert_eq!(engine.phase(), Phase::Break);
    assert_eq!(engine.phase_duration_secs(), 300);
    assert_eq!(engine.remaining_secs(), 300);
    assert_eq!(engine.state(), TimerState::Idle);
    assert!(!engine.is_running());
}

#[test]
fn test_resume_long_after_break_ended_emits_break_completed() {
    let mut engine = TimerEngine::new();
    engine.start_at(at(0));
    engine.recompute_on_resume_at(at(1500));
    engine.start_at(at(1600));

    // Hidden for an hour: the break is over, exactly once, and the engine
    // waits idle in the study phase rather than continuing on its own.
    let event = engine.recompute_on_resume_at(at(5200));
    assert!(matches!(event, Some(Event::BreakCompleted { .. })));
    assert_eq!(engine.phase(), Phase::Study);
    assert_eq!(engine.remaining_secs(), 1500);
    assert!(engine.recompute_on_resume_at(at(5300)).is_none());
}

#[test]
fn test_resume_before_end_only_updates_remaining() {
    let mut engine = TimerEngine::new();
    engine.start_at(at(0));
    match engine.recompute_on_resume_at(at(600)) {
        Some(Event::TimerTicked { remaining_secs, .. }) => assert_eq!(remaining_secs, 900),
        other => panic!("expected TimerTicked, got {other:?}"),
    }
    assert!(engine.is_running());
    assert_eq!(engine.phase(), Phase::Study);
}

#[test]
fn test_recompute_is_noop_unless_running() {
    let mut engine = TimerEngine::new();
    assert!(engine.recompute_on_resume_at(at(10_000)).is_none());

    engine.start_at(at(0));
    engine.pause_at(at(100));
    assert!(engine.recompute_on_resume_at(at(10_000)).is_none());
    assert_eq!(engine.remaining_secs(), 1400);
    assert_eq!(engine.state(), TimerState::Paused);
}

#[test]
fn test_double_pause_equals_single_pause() {
    let mut once = TimerEngine::new();
    once.start_at(at(0));
    once.pause_at(at(30));

    let mut twice = TimerEngine::new();
    twice.start_at(at(0));
    twice.pause_at(at(30));
    assert!(twice.pause_at(at(90)).is_none());

    assert_eq!(once.remaining_secs(), twice.remaining_secs());
    assert_eq!(once.paused_remaining_secs(), twice.paused_remaining_secs());
    assert_eq!(once.state(), twice.state());
}

#[test]
fn test_double_start_equals_single_start() {
    let mut once = TimerEngine::new();
    once.start_at(at(0));

    let mut twice = TimerEngine::new();
    twice.start_at(at(0));
    assert!(twice.start_at(at(20)).is_none());

    assert_eq!(once.start_epoch_ms(), twice.start_epoch_ms());
    once.pause_at(at(40));
    twice.pause_at(at(40));
    assert_eq!(once.remaining_secs(), twice.remaining_secs());
}

#[test]
fn test_reset_from_each_state() {
    let durations = PhaseDurations {
        study_secs: 120,
        break_secs: 60,
    };

    let mut idle = TimerEngine::with_durations(durations);
    idle.reset_at(at(0));
    assert_eq!(idle.remaining_secs(), 120);

    let mut running = TimerEngine::with_durations(durations);
    running.start_at(at(0));
    running.reset_at(at(50));
    assert_eq!(running.state(), TimerState::Idle);
    assert_eq!(running.remaining_secs(), 120);

    let mut paused = TimerEngine::with_durations(durations);
    paused.start_at(at(0));
    paused.pause_at(at(50));
    paused.reset_at(at(60));
    assert_eq!(paused.state(), TimerState::Idle);
    assert_eq!(paused.remaining_secs(), 120);
    assert!(paused.paused_remaining_secs().is_none());
}

#[test]
fn test_custom_durations_alternate_indefinitely() {
    let mut engine = TimerEngine::with_durations(PhaseDurations {
        study_secs: 10,
        break_secs: 5,
    });
    let mut now = 0;
    let mut phases = Vec::new();
    for _ in 0..6 {
        engine.start_at(at(now));
        now += engine.phase_duration_secs();
        let event = engine.tick_at(at(now)).expect("phase should complete");
        phases.push(match event {
            Event::SessionCompleted { .. } => Phase::Study,
            Event::BreakCompleted { .. } => Phase::Break,
            other => panic!("unexpected {other:?}"),
        });
    }
    assert_eq!(
        phases,
        [
            Phase::Study,
            Phase::Break,
            Phase::Study,
            Phase::Break,
            Phase::Study,
            Phase::Break
        ]
    );
}

proptest! {
    #[test]
    fn prop_pause_reports_elapsed_running_time(n in 0u64..1500) {
        let mut engine = TimerEngine::new();
        engine.start_at(at(0));
        engine.pause_at(at(n));
        prop_assert_eq!(engine.remaining_secs(), 1500 - n);
    }

    #[test]
    fn prop_resume_then_immediate_pause_preserves_remaining(
        run_ms in 0u64..1_499_000,
        gap_ms in 0u64..10_000_000,
    ) {
        let mut engine = TimerEngine::new();
        engine.start_at(T0);
        engine.pause_at(T0 + run_ms);
        let before = engine.remaining_secs();

        let resume_at = T0 + run_ms + gap_ms;
        engine.start_at(resume_at);
        engine.pause_at(resume_at);
        prop_assert_eq!(engine.remaining_secs(), before);
    }

    #[test]
    fn prop_remaining_stays_within_phase(
        start in 0u64..1_000_000,
        offsets in proptest::collection::vec(0u64..4_000_000, 1..20),
    ) {
        let mut engine = TimerEngine::new();
        engine.start_at(T0 + start);
        for offset in offsets {
            // Offsets may land before the start: a clock that moved backwards.
            let _ = engine.tick_at(T0 + offset);
            prop_assert!(engine.remaining_secs() <= engine.phase_duration_secs());
        }
    }

    #[test]
    fn prop_gap_past_end_completes_exactly_once(extra in 0u64..100_000) {
        let mut engine = TimerEngine::new();
        engine.start_at(at(0));
        let mut events = Vec::new();
        events.extend(engine.recompute_on_resume_at(at(1500 + extra)));
        events.extend(engine.recompute_on_resume_at(at(1500 + extra + 1)));
        prop_assert_eq!(completions(&events), 1);
        prop_assert_eq!(engine.remaining_secs(), 300);
    }
}
