use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Start instant of the running timer, persisted so an interrupted app can
/// resume the live display. At most one timer runs at a time.
pub trait TimerStateRepository: Send + Sync {
    fn load(&self) -> Result<Option<DateTime<Utc>>, InfraError>;
    fn save(&self, started_at: DateTime<Utc>) -> Result<(), InfraError>;
    fn clear(&self) -> Result<(), InfraError>;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimerStateFile {
    started_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct JsonFileTimerState {
    path: PathBuf,
}

impl JsonFileTimerState {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl TimerStateRepository for JsonFileTimerState {
    fn load(&self) -> Result<Option<DateTime<Utc>>, InfraError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        let parsed: TimerStateFile = serde_json::from_str(&raw)?;
        Ok(Some(parsed.started_at))
    }

    fn save(&self, started_at: DateTime<Utc>) -> Result<(), InfraError> {
        let formatted = serde_json::to_string_pretty(&TimerStateFile { started_at })?;
        fs::write(&self.path, format!("{formatted}\n"))?;
        Ok(())
    }

    fn clear(&self) -> Result<(), InfraError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(InfraError::Io(error)),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTimerState {
    started_at: Mutex<Option<DateTime<Utc>>>,
}

impl TimerStateRepository for InMemoryTimerState {
    fn load(&self) -> Result<Option<DateTime<Utc>>, InfraError> {
        let guard = self
            .started_at
            .lock()
            .map_err(|error| InfraError::InvalidRecord(format!("timer lock poisoned: {error}")))?;
        Ok(*guard)
    }

    fn save(&self, started_at: DateTime<Utc>) -> Result<(), InfraError> {
        let mut guard = self
            .started_at
            .lock()
            .map_err(|error| InfraError::InvalidRecord(format!("timer lock poisoned: {error}")))?;
        *guard = Some(started_at);
        Ok(())
    }

    fn clear(&self) -> Result<(), InfraError> {
        let mut guard = self
            .started_at
            .lock()
            .map_err(|error| InfraError::InvalidRecord(format!("timer lock poisoned: {error}")))?;
        *guard = None;
        Ok(())
    }
}

/// A stopped timer session, ready to hand to the session recorder. Displays
/// are wall-clock times in the configured timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedSession {
    pub duration_seconds: i64,
    pub start_display: String,
    pub end_display: String,
}

pub struct TimerService<T>
where
    T: TimerStateRepository,
{
    repository: Arc<T>,
    timezone: Tz,
    now_provider: NowProvider,
}

impl<T> TimerService<T>
where
    T: TimerStateRepository,
{
    pub fn new(repository: Arc<T>, timezone: Tz) -> Self {
        Self {
            repository,
            timezone,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    /// Starts (or restarts) the timer at the current instant.
    pub fn start(&self) -> Result<DateTime<Utc>, InfraError> {
        let now = (self.now_provider)();
        self.repository.save(now)?;
        Ok(now)
    }

    pub fn started_at(&self) -> Result<Option<DateTime<Utc>>, InfraError> {
        self.repository.load()
    }

    /// Whole seconds since the timer started, clamped at zero; `None` when no
    /// timer is running.
    pub fn elapsed_seconds(&self) -> Result<Option<u64>, InfraError> {
        let Some(started_at) = self.repository.load()? else {
            return Ok(None);
        };
        let now = (self.now_provider)();
        Ok(Some((now - started_at).num_seconds().max(0) as u64))
    }

    /// Stops the running timer and clears its persisted state. The duration
    /// is left signed so a clock that moved backwards surfaces as an invalid
    /// session at the recorder instead of silently corrupting totals.
    pub fn stop(&self) -> Result<CompletedSession, InfraError> {
        let Some(started_at) = self.repository.load()? else {
            return Err(InfraError::TimerNotRunning);
        };
        let now = (self.now_provider)();
        self.repository.clear()?;

        Ok(CompletedSession {
            duration_seconds: (now - started_at).num_seconds(),
            start_display: self.display(started_at),
            end_display: self.display(now),
        })
    }

    fn display(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.timezone)
            .format("%H:%M:%S")
            .to_string()
    }
}
