//! Shared activity log rendered by the console.

use std::sync::{Arc, Mutex, MutexGuard};
use time::macros::format_description;
use time::OffsetDateTime;

/// Log lines shown to the console, newest last.
#[derive(Debug, Clone, Default)]
pub struct ActivityLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        // A panicking writer cannot leave a half-pushed line behind.
        self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Emit `message` as a tracing event and append it with a timestamp.
    pub fn display(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{message}");
        let line = format!("{} - {}", timestamp(), message);
        self.lock().push(line);
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Second-precision wall clock time.
///
/// On Unix `now_local` refuses to read the local offset once other threads
/// exist, so under the multi-threaded runtime this is effectively always UTC.
fn timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_else(|_| "now".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_second_precision_timestamp() {
        let log = ActivityLog::new();
        log.display("Preparing the agents.");
        let lines = log.snapshot();
        assert_eq!(lines.len(), 1);

        let (stamp, message) = lines[0].split_once(" - ").unwrap();
        assert_eq!(message, "Preparing the agents.");
        assert_eq!(stamp.len(), "2024-01-01 00:00:00".len());
        assert!(time::PrimitiveDateTime::parse(
            stamp,
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second]")
        )
        .is_ok());
    }

    #[test]
    fn clones_share_lines_and_clear_empties_them() {
        let log = ActivityLog::new();
        let other = log.clone();
        log.display("one");
        other.display("two");
        assert_eq!(log.snapshot().len(), 2);
        other.clear();
        assert!(log.snapshot().is_empty());
    }
}
