use std::io::Write;

use studyplan_core::Notifier;

/// Writes phase-completion notices to stderr, optionally ringing the bell.
pub struct ConsoleNotifier {
    sound: bool,
}

impl ConsoleNotifier {
    pub fn new(sound: bool) -> Self {
        Self { sound }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, title: &str, body: &str) {
        let mut stderr = std::io::stderr().lock();
        let bell = if self.sound { "\x07" } else { "" };
        let _ = writeln!(stderr, "{bell}{title} {body}");
    }
}
