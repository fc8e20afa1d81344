//! Structured audit records for training sessions and breakthroughs.

use crate::advancement::BreakthroughAttempt;
use crate::progression::ProgressionResult;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

pub const AUDIT_TARGET: &str = "ascend::audit";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditRecord {
    Progression {
        character_id: Uuid,
        result: ProgressionResult,
    },
    Breakthrough(BreakthroughAttempt),
}

impl AuditRecord {
    pub fn character_id(&self) -> Uuid {
        match self {
            AuditRecord::Progression { character_id, .. } => *character_id,
            AuditRecord::Breakthrough(attempt) => attempt.character_id,
        }
    }
}

/// Receiver for audit records. Must not block the caller for long.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &AuditRecord);
}

/// Emits each record as a JSON payload on the audit tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, record: &AuditRecord) {
        match serde_json::to_string(record) {
            Ok(payload) => info!(
                target: AUDIT_TARGET,
                character_id = %record.character_id(),
                payload = %payload,
                "audit"
            ),
            Err(e) => warn!(target: AUDIT_TARGET, error = %e, "failed to encode audit record"),
        }
    }
}

/// Keeps records in memory, mostly for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn breakthroughs(&self) -> Vec<BreakthroughAttempt> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                AuditRecord::Breakthrough(attempt) => Some(attempt),
                AuditRecord::Progression { .. } => None,
            })
            .collect()
    }
}

impl AuditSink for MemorySink {
    fn record(&self, record: &AuditRecord) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advancement::BonusSource;

    fn attempt() -> BreakthroughAttempt {
        BreakthroughAttempt {
            character_id: Uuid::nil(),
            target_realm: 1,
            base_rate: 0.05,
            bonus_sources: vec![BonusSource::new("affinity", 0.15)],
            final_rate: 0.2,
            succeeded: true,
            rolled_value: 0.1,
            experience_before: 100,
        }
    }

    #[test]
    fn test_memory_sink_collects() {
        let sink = MemorySink::new();
        sink.record(&AuditRecord::Breakthrough(attempt()));
        assert_eq!(sink.records().len(), 1);
        assert_eq!(sink.breakthroughs()[0].target_realm, 1);
    }

    #[test]
    fn test_record_json_is_tagged() {
        let json = serde_json::to_value(AuditRecord::Breakthrough(attempt())).unwrap();
        assert_eq!(json["kind"], "breakthrough");
        assert_eq!(json["bonus_sources"][0]["name"], "affinity");
    }

    #[test]
    fn test_tracing_sink_does_not_panic_without_subscriber() {
        TracingSink.record(&AuditRecord::Breakthrough(attempt()));
    }
}
