//! Download and export progress reporting.
//!
//! Components that talk to the user (the failover downloader, the exporter)
//! receive a [`ProgressReporter`] instead of printing directly, so tests can
//! run them silently or record what they reported. Progress is emitted on
//! **stderr** so stdout stays clean for the quote itself.

use std::io::Write;
use std::sync::Mutex;

use crate::models::Category;
use crate::sources::Mirror;

/// A single progress event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A download pass started with `primary` as every category's first mirror.
    PassStarted { primary: Mirror },
    /// About to request a category file from a mirror.
    Attempt { category: Category, mirror: Mirror },
    /// The primary mirror failed for a category; failover begins.
    Failover { category: Category, from: Mirror },
    /// A category file was stored.
    Downloaded {
        category: Category,
        mirror: Mirror,
        count: usize,
    },
    /// A category could not be obtained.
    Failed { category: Category, reason: String },
    /// Fewer quotes matched than were requested for export.
    ExportClamped { requested: usize, available: usize },
}

/// Receives progress events.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr.
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::PassStarted { primary } => {
                format!("fetching bundle from {} ({})\n", primary.key(), primary.name())
            }
            ProgressEvent::Attempt { category, mirror } => {
                format!("  {}.json  <- {}\n", category, mirror.base_url())
            }
            ProgressEvent::Failover { category, from } => {
                format!("  {}.json  failed on {}, trying other sources\n", category, from)
            }
            ProgressEvent::Downloaded {
                category,
                mirror,
                count,
            } => format!(
                "  {}.json  ok  {} quotes from {}\n",
                category,
                format_number(*count as u64),
                mirror
            ),
            ProgressEvent::Failed { category, reason } => {
                format!("  {}.json  failed: {}\n", category, reason)
            }
            ProgressEvent::ExportClamped {
                requested,
                available,
            } => format!(
                "warning: only {} of {} requested quotes match, exporting all of them\n",
                available, requested
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::PassStarted { primary } => serde_json::json!({
                "event": "pass_started",
                "primary": primary.key(),
            }),
            ProgressEvent::Attempt { category, mirror } => serde_json::json!({
                "event": "attempt",
                "category": category.to_string(),
                "source": mirror.key(),
            }),
            ProgressEvent::Failover { category, from } => serde_json::json!({
                "event": "failover",
                "category": category.to_string(),
                "from": from.key(),
            }),
            ProgressEvent::Downloaded {
                category,
                mirror,
                count,
            } => serde_json::json!({
                "event": "downloaded",
                "category": category.to_string(),
                "source": mirror.key(),
                "count": count,
            }),
            ProgressEvent::Failed { category, reason } => serde_json::json!({
                "event": "failed",
                "category": category.to_string(),
                "reason": reason,
            }),
            ProgressEvent::ExportClamped {
                requested,
                available,
            } => serde_json::json!({
                "event": "export_clamped",
                "requested": requested,
                "available": available,
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Keeps every event in memory. Handy for tests and for callers that want
/// to summarize afterwards.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

impl std::str::FromStr for ProgressMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(ProgressMode::Off),
            "human" => Ok(ProgressMode::Human),
            "json" => Ok(ProgressMode::Json),
            other => Err(format!(
                "unknown progress mode '{}', expected off, human, or json",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn recording_progress_keeps_order() {
        let rec = RecordingProgress::default();
        let a = Category::from_letter('a').unwrap();
        rec.report(ProgressEvent::PassStarted {
            primary: Mirror::GitHub,
        });
        rec.report(ProgressEvent::Attempt {
            category: a,
            mirror: Mirror::GitHub,
        });
        let events = rec.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ProgressEvent::PassStarted { .. }));
    }

    #[test]
    fn progress_mode_parse() {
        assert_eq!("json".parse::<ProgressMode>().unwrap(), ProgressMode::Json);
        assert!("loud".parse::<ProgressMode>().is_err());
    }
}
