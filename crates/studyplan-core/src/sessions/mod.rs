//! Collaborators that consume timer completion events: session recorders
//! (local database, REST backend) and notifiers.

mod api;
mod dispatcher;
mod record;
mod traits;

pub use api::ApiSessionRecorder;
pub use dispatcher::{DispatchOutcome, EventDispatcher};
pub use record::StudySessionRecord;
pub use traits::{Notifier, SessionRecorder};
