use crate::domain::models::{TIMELINE_CAP, TaskRecord, normalize_task_name};
use crate::domain::time_format::{format_minutes, parse_minutes, to_iso};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::task_store::TaskStoreRepository;
use chrono::{DateTime, Utc};
use std::sync::Arc;

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Applies one completed timer session to the local task document: appends a
/// timeline entry, accumulates the tracked total in whole minutes, stamps the
/// mutation time and clears the consumption flag. The whole document is
/// persisted in a single write.
pub struct SessionRecorder<L>
where
    L: TaskStoreRepository,
{
    store: Arc<L>,
    now_provider: NowProvider,
}

impl<L> SessionRecorder<L>
where
    L: TaskStoreRepository,
{
    pub fn new(store: Arc<L>) -> Self {
        Self {
            store,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn record_session(
        &self,
        task_name: &str,
        duration_seconds: i64,
        start_display: &str,
        end_display: &str,
    ) -> Result<TaskRecord, InfraError> {
        if duration_seconds < 0 {
            return Err(InfraError::InvalidDuration(duration_seconds));
        }
        let key = normalize_task_name(task_name);
        if key.is_empty() {
            return Err(InfraError::InvalidRecord(
                "task name must not be empty".to_string(),
            ));
        }

        let mut records = self.store.load_all()?;
        let record = records.entry(key).or_default();

        let session_minutes = (duration_seconds as u64) / 60;
        record.timeline.push(format!(
            "{} - de {start_display} até {end_display}",
            format_minutes(session_minutes)
        ));
        if record.timeline.len() > TIMELINE_CAP {
            record.timeline.remove(0);
        }

        let total_minutes = parse_minutes(&record.total_time_tracked)
            .map_err(InfraError::InvalidRecord)?
            + session_minutes;
        record.total_time_tracked = format_minutes(total_minutes);
        record.last_time_synced = to_iso((self.now_provider)());
        record.time_was_used = false;

        let updated = record.clone();
        self.store.save_all(&records)?;
        Ok(updated)
    }
}
