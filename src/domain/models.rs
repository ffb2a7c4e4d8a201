use crate::domain::time_format::parse_minutes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Most recent session entries kept per task; the oldest is evicted past this.
pub const TIMELINE_CAP: usize = 20;

pub const ZERO_DURATION: &str = "000:00";

/// One tracked task, shared between the local document and the remote store
/// and reconciled between the two on sync. Field names on the wire stay in
/// the camelCase form both stores already hold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    /// Reserved field, always 0. Nothing mutates it.
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub timeline: Vec<String>,
    #[serde(default = "zero_duration")]
    pub total_time_tracked: String,
    #[serde(default)]
    pub last_time_synced: String,
    #[serde(default)]
    pub time_was_used: bool,
}

fn zero_duration() -> String {
    ZERO_DURATION.to_string()
}

impl Default for TaskRecord {
    fn default() -> Self {
        Self {
            count: 0,
            timeline: Vec::new(),
            total_time_tracked: zero_duration(),
            last_time_synced: String::new(),
            time_was_used: false,
        }
    }
}

impl TaskRecord {
    pub fn validate(&self) -> Result<(), String> {
        if self.timeline.len() > TIMELINE_CAP {
            return Err(format!(
                "record.timeline must hold at most {TIMELINE_CAP} entries"
            ));
        }
        parse_minutes(&self.total_time_tracked)?;
        if !self.last_time_synced.is_empty() && self.last_synced_instant().is_none() {
            return Err(format!(
                "record.lastTimeSynced '{}' is not an ISO-8601 timestamp",
                self.last_time_synced
            ));
        }
        Ok(())
    }

    /// Parsed `lastTimeSynced`; `None` for empty or unparsable values, which
    /// the reconciliation protocol treats as "never synced".
    pub fn last_synced_instant(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.last_time_synced)
            .ok()
            .map(|instant| instant.with_timezone(&Utc))
    }

    pub fn total_minutes(&self) -> Result<u64, String> {
        parse_minutes(&self.total_time_tracked)
    }
}

/// Storage key for a task: lowercase with all whitespace removed, so the same
/// logical task recorded under varying casing or spacing collapses to one
/// record. Applied by both the recorder and the reconciler.
pub fn normalize_task_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|character| !character.is_whitespace())
        .collect()
}
