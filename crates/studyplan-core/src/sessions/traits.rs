use super::record::StudySessionRecord;
use crate::error::Result;

/// Persists completed study sessions. Implemented by the local database and
/// by the REST backend client.
#[allow(async_fn_in_trait)]
pub trait SessionRecorder {
    /// Short identifier for logs (e.g. "local", "api").
    fn name(&self) -> &str;

    /// Store a session, returning the id assigned by the store.
    async fn record(&self, session: &StudySessionRecord) -> Result<i64>;

    /// Discipline of the most recent recorded session, if any.
    async fn last_discipline(&self) -> Result<Option<String>>;
}

impl<T: SessionRecorder> SessionRecorder for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn record(&self, session: &StudySessionRecord) -> Result<i64> {
        (**self).record(session).await
    }

    async fn last_discipline(&self) -> Result<Option<String>> {
        (**self).last_discipline().await
    }
}

/// Surfaces phase completions to the user (desktop toast, terminal bell...).
pub trait Notifier {
    fn notify(&self, title: &str, body: &str);
}

impl<T: Notifier> Notifier for &T {
    fn notify(&self, title: &str, body: &str) {
        (**self).notify(title, body)
    }
}
