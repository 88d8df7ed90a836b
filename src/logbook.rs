use rand::Rng;
use serde::Serialize;

use crate::state::{clock_time, ts_epoch_ms};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// One session log entry. Immutable once appended.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: String,
    pub severity: Severity,
    pub message: String,
    pub details: String,
    pub agent: String,
}

/// Append-only, insertion-ordered event sequence for one session.
///
/// No retention cap: sessions are short-lived and cleared on full reset.
#[derive(Debug, Default)]
pub struct LogBook {
    entries: Vec<LogEntry>,
}

impl LogBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids are collision-resistant, not collision-proof: epoch millis plus a
    /// random salt.
    fn next_id() -> u64 {
        ts_epoch_ms().wrapping_shl(10) | rand::thread_rng().gen_range(0..1024u64)
    }

    pub fn append(
        &mut self,
        severity: Severity,
        message: impl Into<String>,
        details: impl Into<String>,
        agent: impl Into<String>,
    ) -> u64 {
        let id = Self::next_id();
        self.entries.push(LogEntry {
            id,
            timestamp: clock_time(),
            severity,
            message: message.into(),
            details: details.into(),
            agent: agent.into(),
        });
        id
    }

    /// Ordered read-only view, optionally restricted to one origin tag.
    /// `"All"` matches every entry. Never mutates storage.
    pub fn filter_by_agent(&self, agent: &str) -> Vec<LogEntry> {
        self.entries
            .iter()
            .filter(|e| agent == "All" || e.agent == agent)
            .cloned()
            .collect()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Full reset: drop everything and reseed the single reset marker.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.append(
            Severity::Info,
            "Simulation Reset",
            "All network states and logs have been cleared.",
            "System",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_insertion_order() {
        let mut log = LogBook::new();
        log.append(Severity::Info, "first", "", "System");
        log.append(Severity::Warning, "second", "", "Rule-Based");
        log.append(Severity::Error, "third", "", "System");

        let msgs: Vec<_> = log.entries().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(msgs, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_filter_by_agent() {
        let mut log = LogBook::new();
        log.append(Severity::Info, "a", "", "System");
        log.append(Severity::Info, "b", "", "Rule-Based");
        log.append(Severity::Info, "c", "", "System");

        let system = log.filter_by_agent("System");
        assert_eq!(system.len(), 2);
        assert!(system.iter().all(|e| e.agent == "System"));

        let all = log.filter_by_agent("All");
        assert_eq!(all.len(), 3);

        // Filtering is a view, never a mutation.
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_filter_unknown_agent_is_empty() {
        let mut log = LogBook::new();
        log.append(Severity::Info, "a", "", "System");
        assert!(log.filter_by_agent("PPO Agent").is_empty());
    }

    #[test]
    fn test_reset_reseeds_single_marker() {
        let mut log = LogBook::new();
        log.append(Severity::Error, "noise", "", "System");
        log.append(Severity::Info, "more", "", "Rule-Based");
        log.reset();

        assert_eq!(log.len(), 1);
        let entry = &log.entries()[0];
        assert_eq!(entry.message, "Simulation Reset");
        assert_eq!(entry.severity, Severity::Info);
        assert_eq!(entry.agent, "System");
    }

    #[test]
    fn test_ids_vary_within_a_burst() {
        let mut log = LogBook::new();
        for i in 0..32 {
            log.append(Severity::Info, format!("e{}", i), "", "System");
        }
        let mut ids: Vec<_> = log.entries().iter().map(|e| e.id).collect();
        ids.sort_unstable();
        ids.dedup();
        // Collision-resistant, not proof: a same-millisecond burst of 32
        // should essentially never collapse to a handful of ids.
        assert!(ids.len() > 16);
    }
}
