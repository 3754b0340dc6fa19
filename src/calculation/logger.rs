//! Append-only calculation trace.
//!
//! Every resolved configuration value and every computed rubrica is
//! recorded as a [`CalculationLogEntry`] in a shared, append-only
//! sequence. The trace serves audit and test assertions; clearing it is
//! only valid between runs, never mid-computation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::config::ConfigTier;

/// One immutable record in the calculation trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationLogEntry {
    /// Monotonic sequence number within the trace.
    pub sequence: u64,
    /// The compute attempt this entry belongs to, when inside a batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<Uuid>,
    /// The employee the entry concerns, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    /// What was resolved or computed (a parameter key or rubrica code).
    pub key: String,
    /// The configuration tier that answered, for resolution entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_tier: Option<ConfigTier>,
    /// The inputs that went into the step.
    pub inputs: serde_json::Value,
    /// The step's output.
    pub output: serde_json::Value,
    /// When the entry was appended.
    pub timestamp: DateTime<Utc>,
}

/// The fields a caller supplies for one trace entry; sequence, attempt
/// tag and timestamp are filled in by the logger.
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// The employee the entry concerns, when applicable.
    pub employee_id: Option<String>,
    /// What was resolved or computed.
    pub key: String,
    /// The answering tier, for resolution entries.
    pub resolved_tier: Option<ConfigTier>,
    /// The inputs that went into the step.
    pub inputs: serde_json::Value,
    /// The step's output.
    pub output: serde_json::Value,
}

/// Append-only shared trace of engine decisions.
///
/// Cloning is cheap and shares the underlying sink; [`CalculationLogger::with_attempt`]
/// returns a tagged handle so entries from concurrent compute attempts
/// stay distinguishable in the audit trail.
///
/// # Example
///
/// ```
/// use folha_engine::calculation::{CalculationLogger, LogRecord};
///
/// let logger = CalculationLogger::new();
/// logger.log(LogRecord {
///     employee_id: Some("emp_001".to_string()),
///     key: "daily_hours".to_string(),
///     resolved_tier: None,
///     inputs: serde_json::json!({}),
///     output: serde_json::json!({ "hours": 8 }),
/// });
/// assert_eq!(logger.all().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CalculationLogger {
    entries: Arc<Mutex<Vec<CalculationLogEntry>>>,
    next_sequence: Arc<AtomicU64>,
    attempt_id: Option<Uuid>,
}

impl CalculationLogger {
    /// Creates an empty logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle sharing this logger's sink, tagging every entry
    /// it appends with the given attempt id.
    pub fn with_attempt(&self, attempt_id: Uuid) -> CalculationLogger {
        CalculationLogger {
            entries: Arc::clone(&self.entries),
            next_sequence: Arc::clone(&self.next_sequence),
            attempt_id: Some(attempt_id),
        }
    }

    /// Appends one entry to the trace.
    pub fn log(&self, record: LogRecord) {
        let entry = CalculationLogEntry {
            sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
            attempt_id: self.attempt_id,
            employee_id: record.employee_id,
            key: record.key,
            resolved_tier: record.resolved_tier,
            inputs: record.inputs,
            output: record.output,
            timestamp: Utc::now(),
        };
        // Lock poisoning cannot happen: no panic occurs while held.
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push(entry);
    }

    /// Returns a snapshot of the whole trace (finite, restartable read).
    pub fn all(&self) -> Vec<CalculationLogEntry> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clone()
    }

    /// Number of entries in the trace.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    /// True when the trace is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears the trace. Only valid between runs, never mid-computation.
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
        self.next_sequence.store(0, Ordering::Relaxed);
    }
}
