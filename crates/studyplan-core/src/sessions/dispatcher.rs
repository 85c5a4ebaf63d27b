//! Routes timer completion events to the external collaborators.

use chrono::Local;
use tracing::{info, warn};

use super::record::StudySessionRecord;
use super::traits::{Notifier, SessionRecorder};
use crate::error::Result;
use crate::events::Event;

/// What [`EventDispatcher::dispatch`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A study session was stored under this id.
    Recorded { id: i64 },
    /// A study session completed without a discipline; nothing was stored.
    Skipped,
    /// A break completed and the user was notified.
    Notified,
    /// Not a completion event.
    Ignored,
}

pub struct EventDispatcher<R, N> {
    recorder: R,
    notifier: N,
    notifications_enabled: bool,
}

impl<R: SessionRecorder, N: Notifier> EventDispatcher<R, N> {
    pub fn new(recorder: R, notifier: N) -> Self {
        Self {
            recorder,
            notifier,
            notifications_enabled: true,
        }
    }

    pub fn with_notifications(mut self, enabled: bool) -> Self {
        self.notifications_enabled = enabled;
        self
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    /// Handle one event. Recorder failures are logged and returned; the timer
    /// has already moved on regardless.
    pub async fn dispatch(&self, event: &Event) -> Result<DispatchOutcome> {
        match event {
            Event::SessionCompleted {
                duration_secs,
                discipline_id,
                topic,
                at,
                ..
            } => {
                self.notify("Pomodoro complete!", "Time for a break!");

                let Some(discipline_id) = discipline_id.as_deref() else {
                    warn!("study session completed without a discipline; not recorded");
                    return Ok(DispatchOutcome::Skipped);
                };

                let record = StudySessionRecord::from_completion(
                    discipline_id,
                    topic.clone(),
                    *duration_secs,
                    at.with_timezone(&Local),
                );
                match self.recorder.record(&record).await {
                    Ok(id) => {
                        info!(
                            recorder = self.recorder.name(),
                            id,
                            discipline_id,
                            "study session recorded"
                        );
                        Ok(DispatchOutcome::Recorded { id })
                    }
                    Err(e) => {
                        warn!(
                            recorder = self.recorder.name(),
                            error = %e,
                            "failed to record study session"
                        );
                        Err(e)
                    }
                }
            }
            Event::BreakCompleted { .. } => {
                self.notify("Break over!", "Back to studying!");
                Ok(DispatchOutcome::Notified)
            }
            _ => Ok(DispatchOutcome::Ignored),
        }
    }

    fn notify(&self, title: &str, body: &str) {
        if self.notifications_enabled {
            self.notifier.notify(title, body);
        }
    }
}
