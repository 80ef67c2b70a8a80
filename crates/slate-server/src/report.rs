//! State-change reports.
//!
//! When the matching toggle is enabled, the server emits a small structured
//! document on each change of pointer position, hover, focus, pressed-key
//! set, or last-clicked session. Consumers plug in through the `Reporter`
//! trait.

use serde::{Deserialize, Serialize};

use crate::input::Keycode;

/// One state-change document
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "report", rename_all = "snake_case")]
pub enum Report {
    /// Pointer moved
    Pointer { x: i32, y: i32 },
    /// Pointed-at session changed
    Hover { label: Option<String> },
    /// Focused session changed
    Focus { label: Option<String> },
    /// Set of pressed keys changed
    Keys { pressed: Vec<Keycode> },
    /// A pointer button went down over a session
    Clicked { label: String },
}

impl Report {
    /// Render as a JSON document
    pub fn to_document(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Sink for state-change reports
pub trait Reporter {
    fn submit(&mut self, report: Report);
}

/// Discards every report
#[derive(Clone, Copy, Debug, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn submit(&mut self, _report: Report) {}
}

/// Collects reports in memory; used by tests
#[derive(Clone, Debug, Default)]
pub struct MemoryReporter {
    pub reports: Vec<Report>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for MemoryReporter {
    fn submit(&mut self, report: Report) {
        self.reports.push(report);
    }
}
