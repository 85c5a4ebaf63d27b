//! Async tick driver.
//!
//! A single task owns the [`TimerEngine`] and is the only place it is
//! mutated. UI handlers talk to it through a cloneable [`TimerHandle`]; every
//! event the engine produces goes out on one channel.
//!
//! The recurring tick is an `Option<Interval>` local to the loop. After each
//! command it is created when the engine is running and dropped when it is
//! not, so there is never more than one live tick per engine.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, trace};

use super::clock::Clock;
use super::engine::{StudySubject, TimerEngine};
use crate::error::{CoreError, Result};
use crate::events::Event;

/// Default period between display recomputations.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub enum TimerCommand {
    Start,
    Pause,
    Reset,
    /// The host became visible/active again.
    VisibilityRestored,
    SetSubject(StudySubject),
    Snapshot(oneshot::Sender<Event>),
}

/// Cloneable sender side of a running [`TimerDriver`].
#[derive(Debug, Clone)]
pub struct TimerHandle {
    tx: mpsc::UnboundedSender<TimerCommand>,
}

impl TimerHandle {
    pub fn send(&self, command: TimerCommand) -> Result<()> {
        self.tx.send(command).map_err(|_| CoreError::DriverStopped)
    }

    pub fn start(&self) -> Result<()> {
        self.send(TimerCommand::Start)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(TimerCommand::Pause)
    }

    pub fn reset(&self) -> Result<()> {
        self.send(TimerCommand::Reset)
    }

    pub fn visibility_restored(&self) -> Result<()> {
        self.send(TimerCommand::VisibilityRestored)
    }

    pub fn set_subject(&self, subject: StudySubject) -> Result<()> {
        self.send(TimerCommand::SetSubject(subject))
    }

    /// Current state, answered after all previously sent commands.
    pub async fn snapshot(&self) -> Result<Event> {
        let (reply, rx) = oneshot::channel();
        self.send(TimerCommand::Snapshot(reply))?;
        rx.await.map_err(|_| CoreError::DriverStopped)
    }
}

pub struct TimerDriver<C: Clock> {
    engine: TimerEngine,
    clock: C,
    tick_interval: Duration,
    commands: mpsc::UnboundedReceiver<TimerCommand>,
    events: mpsc::UnboundedSender<Event>,
}

impl<C: Clock> TimerDriver<C> {
    pub fn new(
        engine: TimerEngine,
        clock: C,
        tick_interval: Duration,
    ) -> (Self, TimerHandle, mpsc::UnboundedReceiver<Event>) {
        let (tx, commands) = mpsc::unbounded_channel();
        let (events, events_rx) = mpsc::unbounded_channel();
        let driver = Self {
            engine,
            clock,
            tick_interval,
            commands,
            events,
        };
        (driver, TimerHandle { tx }, events_rx)
    }

    /// Spawn the loop on the current tokio runtime. The join handle yields the
    /// engine back once every [`TimerHandle`] has been dropped.
    pub fn spawn(
        engine: TimerEngine,
        clock: C,
        tick_interval: Duration,
    ) -> (
        TimerHandle,
        mpsc::UnboundedReceiver<Event>,
        JoinHandle<TimerEngine>,
    ) {
        let (driver, handle, events) = Self::new(engine, clock, tick_interval);
        let join = tokio::spawn(driver.run());
        (handle, events, join)
    }

    pub async fn run(mut self) -> TimerEngine {
        debug!(tick_ms = self.tick_interval.as_millis() as u64, "timer driver started");
        let mut ticker: Option<Interval> = None;
        self.sync_ticker(&mut ticker);

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = next_tick(&mut ticker) => {
                    let now = self.clock.now_ms();
                    if let Some(event) = self.engine.tick_at(now) {
                        self.emit(event);
                    }
                }
            }
            self.sync_ticker(&mut ticker);
        }

        debug!("timer driver stopped");
        self.engine
    }

    fn handle(&mut self, command: TimerCommand) {
        let now = self.clock.now_ms();
        trace!(?command, "timer command");
        let event = match command {
            TimerCommand::Start => self.engine.start_at(now),
            TimerCommand::Pause => self.engine.pause_at(now),
            TimerCommand::Reset => self.engine.reset_at(now),
            TimerCommand::VisibilityRestored => self.engine.recompute_on_resume_at(now),
            TimerCommand::SetSubject(subject) => {
                self.engine.set_subject(subject);
                None
            }
            TimerCommand::Snapshot(reply) => {
                let _ = reply.send(self.engine.snapshot_at(now));
                None
            }
        };
        if let Some(event) = event {
            self.emit(event);
        }
    }

    fn emit(&self, event: Event) {
        // Nobody listening is fine; the engine state is still updated.
        let _ = self.events.send(event);
    }

    fn sync_ticker(&self, ticker: &mut Option<Interval>) {
        match (self.engine.is_running(), ticker.is_some()) {
            (true, false) => {
                let mut interval = time::interval(self.tick_interval);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                *ticker = Some(interval);
                debug!("tick scheduled");
            }
            (false, true) => {
                *ticker = None;
                debug!("tick cancelled");
            }
            _ => {}
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
